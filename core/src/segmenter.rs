//! Turns streamed assistant fragments into whole display lines.

use std::sync::OnceLock;

use burp_utils_string::take_bytes_at_char_boundary;
use regex_lite::Regex;
use tracing::warn;

/// Default cap on the unterminated tail of an assistant reply.
pub const DEFAULT_MAX_PENDING_BYTES: usize = 64 * 1024;

/// The assembled turn may hold this many times the pending cap before
/// further lines are left out of it. Displayed lines are unaffected.
pub const TURN_BYTES_FACTOR: usize = 16;

/// Horizontal whitespace around one or more line breaks.
#[allow(clippy::expect_used)]
fn break_run_regex() -> &'static Regex {
    static BREAK_RUN_RE: OnceLock<Regex> = OnceLock::new();
    BREAK_RUN_RE
        .get_or_init(|| Regex::new(r"[ \t]*(?:\r?\n[ \t]*)+").expect("valid break-run regex"))
}

#[allow(clippy::expect_used)]
fn line_break_regex() -> &'static Regex {
    static LINE_BREAK_RE: OnceLock<Regex> = OnceLock::new();
    LINE_BREAK_RE.get_or_init(|| Regex::new(r"\r?\n").expect("valid line-break regex"))
}

/// The full assistant reply, handed to the post-processing hook when the
/// stream ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledMessage {
    pub lines: Vec<String>,
    /// Lines were left out because the turn outgrew its cap.
    pub truncated: bool,
}

impl AssembledMessage {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// What end-of-stream produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flushed {
    /// The buffered tail, if anything but whitespace was left.
    pub last_line: Option<String>,
    pub message: AssembledMessage,
}

#[derive(Debug, Clone)]
pub struct LineSegmenter {
    pending: String,
    turn: AssembledMessage,
    turn_bytes: usize,
    max_pending_bytes: Option<usize>,
}

impl Default for LineSegmenter {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_PENDING_BYTES))
    }
}

impl LineSegmenter {
    /// `None` leaves the pending tail unbounded.
    pub fn new(max_pending_bytes: Option<usize>) -> Self {
        Self {
            pending: String::new(),
            turn: AssembledMessage::default(),
            turn_bytes: 0,
            max_pending_bytes: max_pending_bytes.filter(|cap| *cap > 0),
        }
    }

    /// Text held back because no line break has closed it yet.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Feed one fragment and return the lines it completed, trimmed and
    /// with blank lines dropped.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        if fragment.is_empty() {
            return Vec::new();
        }
        let normalized = break_run_regex().replace_all(fragment, "\n");
        self.pending.push_str(&normalized);

        let mut segments: Vec<&str> = line_break_regex().split(&self.pending).collect();
        let tail = segments.pop().unwrap_or_default().to_string();
        let mut lines: Vec<String> = segments
            .into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect();
        self.pending = tail;

        if let Some(cap) = self.max_pending_bytes {
            while self.pending.len() > cap {
                let head = take_bytes_at_char_boundary(&self.pending, cap);
                // A cap smaller than the first character would never make progress.
                let cut = if head.is_empty() {
                    self.pending.chars().next().map_or(0, char::len_utf8)
                } else {
                    head.len()
                };
                warn!(cap, pending = self.pending.len(), "assistant line exceeds cap; wrapping");
                let forced = self.pending[..cut].trim().to_string();
                self.pending.drain(..cut);
                if !forced.is_empty() {
                    lines.push(forced);
                }
            }
        }

        for line in &lines {
            self.record(line);
        }
        lines
    }

    /// End of the assistant reply: release the tail and the assembled turn,
    /// leaving the segmenter empty.
    pub fn finish(&mut self) -> Flushed {
        let tail = std::mem::take(&mut self.pending);
        let tail = tail.trim();
        let last_line = (!tail.is_empty()).then(|| tail.to_string());
        if let Some(line) = &last_line {
            self.record(line);
        }
        self.turn_bytes = 0;
        Flushed {
            last_line,
            message: std::mem::take(&mut self.turn),
        }
    }

    /// Add a line to the assembled turn unless that would exceed
    /// `TURN_BYTES_FACTOR` times the pending cap.
    fn record(&mut self, line: &str) {
        if self.turn.truncated {
            return;
        }
        let limit = self
            .max_pending_bytes
            .map(|cap| cap.saturating_mul(TURN_BYTES_FACTOR));
        if let Some(limit) = limit
            && self.turn_bytes + line.len() > limit
        {
            warn!(limit, "assistant turn exceeds cap; truncating assembled message");
            self.turn.truncated = true;
            return;
        }
        self.turn_bytes += line.len();
        self.turn.lines.push(line.to_string());
    }
}
