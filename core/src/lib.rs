//! Client-side reconciliation of a long-polled chat channel.
//!
//! Server events flow `PollDriver -> Reconciler -> TranscriptSink`. The
//! reconciler keeps the read cursor, splits streamed assistant output into
//! display lines and routes everything else by role. [`ChatSession`] ties
//! one channel, one identity and one backend together and owns the send
//! path.

mod cancel;
pub mod config;
mod cursor;
mod dispatcher;
mod error;
mod poll;
mod segmenter;
mod session;
mod transcript;

pub use cancel::Cancelled;
pub use cancel::OrCancelExt;
pub use cursor::Cursor;
pub use dispatcher::Action;
pub use dispatcher::Discard;
pub use dispatcher::Reconciler;
pub use dispatcher::classify;
pub use error::CoreError;
pub use error::Result;
pub use poll::DEFAULT_RETRY_DELAY;
pub use poll::PollDriver;
pub use segmenter::AssembledMessage;
pub use segmenter::DEFAULT_MAX_PENDING_BYTES;
pub use segmenter::Flushed;
pub use segmenter::LineSegmenter;
pub use session::ChatSession;
pub use transcript::ChannelTranscript;
pub use transcript::DisplayLine;
pub use transcript::MemoryTranscript;
pub use transcript::Sender;
pub use transcript::TranscriptEvent;
pub use transcript::TranscriptSink;
