use burp_backend_client::ClientError;
use burp_protocol::ProtocolError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("server rejected the message (status {status})")]
    Rejected { status: u16 },

    #[error("message too long ({len} bytes, max {max})")]
    MessageTooLong { len: usize, max: usize },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
