//! Event classification and the reconciler state machine.

use burp_protocol::Event;
use burp_protocol::Nickname;
use burp_protocol::Role;
use burp_protocol::parse_event_time;
use chrono::DateTime;
use chrono::Utc;
use tracing::debug;
use tracing::error;

use crate::cursor::Cursor;
use crate::segmenter::LineSegmenter;
use crate::transcript::DisplayLine;
use crate::transcript::Sender;
use crate::transcript::TranscriptSink;
use crate::transcript::append_line;

/// Why an event produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    /// Long-poll expiry; exists only to move the cursor.
    TimeoutSentinel,
    /// A non-assistant event with nothing to show.
    EmptyBody,
}

/// Routing decision for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    Discard(Discard),
    /// Show as-is under the local nickname.
    User(&'a str),
    /// Feed to the line segmenter.
    AssistantFragment(&'a str),
    /// Flush the segmenter and close the turn.
    AssistantEnd,
    /// Log and drop.
    Unsupported(Role),
}

/// Decide what an event means. The order of the checks matters: timeout
/// sentinels first, then the empty-body guard (which never applies to the
/// assistant, whose empty body marks end of stream), then role routing.
pub fn classify(event: &Event) -> Action<'_> {
    if event.long_poll_timeout {
        return Action::Discard(Discard::TimeoutSentinel);
    }
    if event.role != Role::Assistant && event.body.trim().is_empty() {
        return Action::Discard(Discard::EmptyBody);
    }
    match event.role {
        Role::User => Action::User(&event.body),
        Role::Assistant if event.body.is_empty() => Action::AssistantEnd,
        Role::Assistant => Action::AssistantFragment(&event.body),
        other => Action::Unsupported(other),
    }
}

/// Cursor, segmenter and identity for one channel subscription.
///
/// Every event goes through [`Reconciler::reconcile`] in receipt order.
#[derive(Debug, Clone)]
pub struct Reconciler {
    cursor: Cursor,
    segmenter: LineSegmenter,
    nickname: Nickname,
}

impl Reconciler {
    pub fn new(nickname: Nickname, segmenter: LineSegmenter) -> Self {
        Self {
            cursor: Cursor::new(),
            segmenter,
            nickname,
        }
    }

    pub fn with_cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn nickname(&self) -> &Nickname {
        &self.nickname
    }

    pub fn set_nickname(&mut self, nickname: Nickname) {
        self.nickname = nickname;
    }

    /// Assistant text still waiting for a line break.
    pub fn pending(&self) -> &str {
        self.segmenter.pending()
    }

    /// Apply one event. The cursor advances before anything else so that
    /// discarded events still keep the poll resumable.
    pub fn reconcile(&mut self, event: &Event, sink: &dyn TranscriptSink) {
        self.cursor.advance(event.time());

        match classify(event) {
            Action::Discard(reason) => {
                debug!(?reason, "discarding event");
            }
            Action::User(body) => {
                let stamp = self.stamp(event.time());
                append_line(
                    sink,
                    DisplayLine::new(Sender::User(self.nickname.clone()), body, stamp),
                );
            }
            Action::AssistantFragment(fragment) => {
                let stamp = self.stamp(None);
                for line in self.segmenter.push(fragment) {
                    append_line(sink, DisplayLine::new(Sender::Assistant, line, stamp));
                }
            }
            Action::AssistantEnd => {
                let flushed = self.segmenter.finish();
                if let Some(line) = flushed.last_line {
                    append_line(
                        sink,
                        DisplayLine::new(Sender::Assistant, line, self.stamp(None)),
                    );
                }
                sink.set_busy(false);
                if !flushed.message.is_empty() {
                    sink.turn_complete(&flushed.message);
                }
            }
            Action::Unsupported(role) => {
                error!(
                    role = role.code(),
                    body = %event.body,
                    "unknown role; skipping message"
                );
            }
        }
    }

    /// Replay a `/recent` batch, which arrives newest first.
    pub fn replay_recent(&mut self, newest_first: &[Event], sink: &dyn TranscriptSink) {
        for event in newest_first.iter().rev() {
            self.reconcile(event, sink);
        }
    }

    /// Display time for a line: the event's own time, else the cursor,
    /// else now.
    fn stamp(&self, time: Option<&str>) -> DateTime<Utc> {
        time.or(self.cursor.after())
            .and_then(parse_event_time)
            .unwrap_or_else(Utc::now)
    }
}
