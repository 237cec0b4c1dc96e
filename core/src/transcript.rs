//! Display-side capability the reconciler writes into.
//!
//! The core never renders anything itself. Hosts implement
//! [`TranscriptSink`] (a terminal, a test buffer, a channel to a UI task)
//! and receive finished [`DisplayLine`]s in display order.

use std::sync::Mutex;
use std::sync::PoisonError;

use burp_protocol::ASSISTANT_NAME;
use burp_protocol::HELP_NAME;
use burp_protocol::Nickname;
use burp_utils_string::Span;
use burp_utils_string::split_links;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;

use crate::segmenter::AssembledMessage;

/// Who a transcript line is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    User(Nickname),
    Assistant,
    /// Local status and error lines.
    Help,
}

impl Sender {
    pub fn name(&self) -> &str {
        match self {
            Sender::User(nick) => nick.as_str(),
            Sender::Assistant => ASSISTANT_NAME,
            Sender::Help => HELP_NAME,
        }
    }
}

/// One finished transcript line. Written once, never reordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl DisplayLine {
    pub fn new(sender: Sender, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp,
        }
    }

    /// A local status line stamped with the current time.
    pub fn help(text: impl Into<String>) -> Self {
        Self::new(Sender::Help, text, Utc::now())
    }

    /// The text split into plain and link spans for rendering.
    pub fn spans(&self) -> Vec<Span<'_>> {
        split_links(&self.text)
    }
}

/// Receiver of reconciled output.
pub trait TranscriptSink: Send + Sync {
    /// Append a line at the end of the transcript.
    fn append(&self, line: DisplayLine);

    /// Toggle the "assistant is working" indicator.
    fn set_busy(&self, _busy: bool) {}

    /// Called once per assistant reply with all of its lines.
    fn turn_complete(&self, _message: &AssembledMessage) {}
}

/// Append `line` unless its text is blank.
pub(crate) fn append_line(sink: &dyn TranscriptSink, line: DisplayLine) {
    if line.text.trim().is_empty() {
        return;
    }
    sink.append(line);
}

/// Everything a sink can observe, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    Line(DisplayLine),
    Busy(bool),
    TurnComplete(AssembledMessage),
}

/// In-memory sink for tests and headless hosts.
#[derive(Debug, Default)]
pub struct MemoryTranscript {
    events: Mutex<Vec<TranscriptEvent>>,
}

impl MemoryTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TranscriptEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lines(&self) -> Vec<DisplayLine> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                TranscriptEvent::Line(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    /// `(sender, text)` pairs, the shape most assertions want.
    pub fn texts(&self) -> Vec<(String, String)> {
        self.lines()
            .into_iter()
            .map(|line| (line.sender.name().to_string(), line.text))
            .collect()
    }

    fn push(&self, event: TranscriptEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl TranscriptSink for MemoryTranscript {
    fn append(&self, line: DisplayLine) {
        self.push(TranscriptEvent::Line(line));
    }

    fn set_busy(&self, busy: bool) {
        self.push(TranscriptEvent::Busy(busy));
    }

    fn turn_complete(&self, message: &AssembledMessage) {
        self.push(TranscriptEvent::TurnComplete(message.clone()));
    }
}

/// Forwards transcript events to a UI task over an unbounded channel.
///
/// A dropped receiver is logged and otherwise ignored; the poll loop must
/// keep running even when nobody is watching.
#[derive(Debug, Clone)]
pub struct ChannelTranscript {
    tx: UnboundedSender<TranscriptEvent>,
}

impl ChannelTranscript {
    pub fn new(tx: UnboundedSender<TranscriptEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: TranscriptEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::error!("failed to send transcript event: {e}");
        }
    }
}

impl TranscriptSink for ChannelTranscript {
    fn append(&self, line: DisplayLine) {
        self.send(TranscriptEvent::Line(line));
    }

    fn set_busy(&self, busy: bool) {
        self.send(TranscriptEvent::Busy(busy));
    }

    fn turn_complete(&self, message: &AssembledMessage) {
        self.send(TranscriptEvent::TurnComplete(message.clone()));
    }
}
