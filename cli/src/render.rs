use std::fmt::Display;
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use burp_core::DisplayLine;
use burp_core::Sender;
use burp_core::TranscriptSink;
use burp_utils_string::Span;
use chrono::Local;
use chrono::TimeZone;
use owo_colors::OwoColorize;
use tracing::debug;

/// Formats transcript lines as `[HH:MM:SS] <sender> text`.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn format(&self, line: &DisplayLine) -> String {
        self.format_in(line, &Local)
    }

    pub fn format_in<Tz>(&self, line: &DisplayLine, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let clock = line.timestamp.with_timezone(tz).format("%H:%M:%S");
        let sender = format!("<{}>", line.sender.name());
        let sender = if !self.color {
            sender
        } else {
            match line.sender {
                Sender::Assistant => sender.cyan().bold().to_string(),
                Sender::Help => sender.yellow().to_string(),
                Sender::User(_) => sender.green().to_string(),
            }
        };

        let mut text = String::with_capacity(line.text.len());
        for span in line.spans() {
            match span {
                Span::Link(link) if self.color => text.push_str(&link.underline().to_string()),
                other => text.push_str(other.as_str()),
            }
        }
        format!("[{clock}] {sender} {text}")
    }
}

/// Writes the transcript to stdout and the busy marker to stderr.
#[derive(Debug)]
pub struct TerminalTranscript {
    renderer: Renderer,
    busy: AtomicBool,
}

impl TerminalTranscript {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            busy: AtomicBool::new(false),
        }
    }
}

impl TranscriptSink for TerminalTranscript {
    fn append(&self, line: DisplayLine) {
        let rendered = self.renderer.format(&line);
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{rendered}").and_then(|()| out.flush()) {
            debug!("failed to write transcript line: {e}");
        }
    }

    fn set_busy(&self, busy: bool) {
        let was_busy = self.busy.swap(busy, Ordering::Relaxed);
        if busy && !was_busy {
            let marker = if self.renderer.color {
                "...".dimmed().to_string()
            } else {
                "...".to_string()
            };
            eprintln!("{marker}");
        }
    }
}
