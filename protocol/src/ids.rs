use std::fmt;

use burp_utils_string::sanitize_alphanumeric;

use crate::DEFAULT_MODEL;
use crate::ProtocolError;

/// Channel ids and nicknames are capped at this many characters.
pub const MAX_ID_CHARS: usize = 32;

/// Longest model id the server accepts.
pub const MAX_MODEL_ID_BYTES: usize = 140;

const STATUS_CHANNEL: &str = "status";
const ANONYMOUS: &str = "anon";

/// Alphanumeric channel id, at most [`MAX_ID_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    /// Strip everything that is not `[0-9A-Za-z]`. Returns `None` when
    /// nothing is left.
    pub fn sanitize(raw: &str) -> Option<Self> {
        let s = sanitize_alphanumeric(raw, MAX_ID_CHARS);
        (!s.is_empty()).then_some(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `!status` for the status channel, `#name` for everything else.
    pub fn label(&self) -> String {
        if self.0 == STATUS_CHANNEL {
            format!("!{}", self.0)
        } else {
            format!("#{}", self.0)
        }
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self(STATUS_CHANNEL.to_string())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local display name for the user's own messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nickname(String);

impl Nickname {
    pub fn sanitize(raw: &str) -> Option<Self> {
        let s = sanitize_alphanumeric(raw, MAX_ID_CHARS);
        (!s.is_empty()).then_some(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Nickname {
    fn default() -> Self {
        Self(ANONYMOUS.to_string())
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Model identifier forwarded to `/ask`. The server owns the registry of
/// valid models; the client only enforces the shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId(String);

impl ModelId {
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ProtocolError::EmptyModel);
        }
        if raw.len() > MAX_MODEL_ID_BYTES {
            return Err(ProtocolError::ModelTooLong);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self(DEFAULT_MODEL.to_string())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
