//! Client side of the long-poll chat wire contract.
//!
//! [`ChatBackend`] is the seam the reconciler talks to; [`HttpChatClient`]
//! is the production implementation over reqwest.

mod error;
mod http;

pub use error::ClientError;
pub use error::Result;
pub use http::HttpChatClient;

use async_trait::async_trait;
use burp_protocol::ChannelId;
use burp_protocol::Event;
use burp_protocol::GenerationParams;
use burp_protocol::ModelId;

/// Everything `/ask` needs to publish one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct AskRequest {
    pub channel: ChannelId,
    pub model: ModelId,
    pub params: GenerationParams,
    /// Raw message text, sent as the `text/plain` body.
    pub body: String,
}

/// Outcome of `/ask`. The body is not consumed; callers decide what a
/// given status means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AskReceipt {
    pub status: u16,
}

impl AskReceipt {
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport capability used by the poll driver and the send path.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Recent events for `channel`, newest first.
    async fn recent(&self, channel: &ChannelId) -> Result<Vec<Event>>;

    /// Block until the next event after `after` exists, or until the server
    /// gives up and returns a timeout sentinel. `None` asks for anything
    /// newer than "now" on the server.
    async fn wait(&self, channel: &ChannelId, after: Option<&str>) -> Result<Event>;

    /// Publish a user message. Only transport failures are errors; HTTP
    /// rejections come back in the receipt.
    async fn ask(&self, request: &AskRequest) -> Result<AskReceipt>;
}
