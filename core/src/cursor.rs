//! Read position over the server's event log.

use burp_protocol::parse_event_time;
use tracing::debug;

/// Last event time consumed from the channel.
///
/// The value is opaque and is echoed back verbatim as `after`. It only moves
/// forward: when both the stored and the offered value parse as timestamps
/// and the offered one is older, it is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    last: Option<String>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known position, e.g. one persisted by the host.
    pub fn starting_at(time: impl Into<String>) -> Self {
        let mut cursor = Self::new();
        cursor.advance(Some(&time.into()));
        cursor
    }

    /// Move to `time` unless it is empty or would rewind the cursor.
    pub fn advance(&mut self, time: Option<&str>) {
        let Some(time) = time.filter(|t| !t.is_empty()) else {
            return;
        };
        if let Some(current) = self.last.as_deref()
            && let (Some(cur), Some(new)) = (parse_event_time(current), parse_event_time(time))
            && new < cur
        {
            debug!(current, offered = time, "ignoring cursor rewind");
            return;
        }
        self.last = Some(time.to_string());
    }

    /// Value for the `after` parameter; `None` until the first event.
    pub fn after(&self) -> Option<&str> {
        self.last.as_deref()
    }
}
