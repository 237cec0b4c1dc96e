use thiserror::Error;

/// Errors from talking to the chat server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, TLS or body transfer failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("status {status}")]
    Status { status: u16, body: String },

    /// The body was not the JSON shape we expected.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
