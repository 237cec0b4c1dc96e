//! Wire contract between the chat client and the long-poll server.
//!
//! The server speaks three endpoints:
//!
//! - `GET /recent?id=<channel>` returns a JSON array of [`Event`]s, newest first.
//! - `GET /wait?id=<channel>[&after=<cursor>]` blocks until the next event
//!   after the cursor exists, or returns a timeout sentinel.
//! - `POST /ask?id=<channel>&model=<id>[&temp=..][&max_tokens=..][&top_p=..][&top_k=..]`
//!   with the raw message text as a `text/plain` body.

mod event;
mod ids;
mod params;
mod time;

pub use event::Event;
pub use event::Role;
pub use ids::ChannelId;
pub use ids::MAX_ID_CHARS;
pub use ids::MAX_MODEL_ID_BYTES;
pub use ids::ModelId;
pub use ids::Nickname;
pub use params::GenerationParams;
pub use time::parse_event_time;

use thiserror::Error;

/// Display name of the assistant in the transcript.
pub const ASSISTANT_NAME: &str = "burp";

/// Display name used for local status and error lines.
pub const HELP_NAME: &str = "help";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-5-nano";

/// Largest request body `/ask` accepts.
pub const MAX_MESSAGE_BYTES: usize = 32 << 10;

/// Query parameter names on the wire.
pub mod query {
    pub const ID: &str = "id";
    pub const AFTER: &str = "after";
    pub const MODEL: &str = "model";
    pub const TEMPERATURE: &str = "temp";
    pub const MAX_TOKENS: &str = "max_tokens";
    pub const TOP_P: &str = "top_p";
    pub const TOP_K: &str = "top_k";
}

/// Endpoint paths, joined onto the subscribe/publish base URLs.
pub mod paths {
    pub const RECENT: &str = "/recent";
    pub const WAIT: &str = "/wait";
    pub const ASK: &str = "/ask";
}

/// Errors from validating values before they go on the wire.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("model cannot be blank")]
    EmptyModel,

    #[error("model must be <= {MAX_MODEL_ID_BYTES} characters")]
    ModelTooLong,

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("{field} out of range ({range})")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
