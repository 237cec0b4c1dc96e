use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

/// Author of an [`Event`].
///
/// The integer codes are fixed by the server. `System` is the zero value and
/// is therefore omitted from serialized events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Role {
    #[default]
    System,
    Assistant,
    User,
    /// A code this client does not know. Kept so the event can be logged
    /// and skipped instead of failing to decode.
    Unknown(u8),
}

impl Role {
    pub fn code(self) -> u8 {
        match self {
            Role::System => 0,
            Role::Assistant => 1,
            Role::User => 2,
            Role::Unknown(code) => code,
        }
    }
}

impl From<u8> for Role {
    fn from(code: u8) -> Self {
        match code {
            0 => Role::System,
            1 => Role::Assistant,
            2 => Role::User,
            other => Role::Unknown(other),
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role.code()
    }
}

/// One entry of the server's per-channel event log.
///
/// `time` is the position of the event in the log. Clients echo it back
/// verbatim as `after` on the next `/wait` request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    /// Channel the event was published on.
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,

    #[serde(
        default,
        deserialize_with = "time_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<String>,

    /// Set on the sentinel the server returns when a long poll expires with
    /// nothing to deliver.
    #[serde(default, skip_serializing_if = "is_false")]
    pub long_poll_timeout: bool,

    #[serde(default, skip_serializing_if = "is_system_role")]
    pub role: Role,
}

impl Event {
    pub fn user(body: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            time: Some(time.into()),
            role: Role::User,
            ..Self::default()
        }
    }

    pub fn assistant(body: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            time: Some(time.into()),
            role: Role::Assistant,
            ..Self::default()
        }
    }

    pub fn timeout_sentinel(time: impl Into<String>) -> Self {
        Self {
            time: Some(time.into()),
            long_poll_timeout: true,
            ..Self::default()
        }
    }

    /// The event time, if the server sent a non-empty one.
    pub fn time(&self) -> Option<&str> {
        self.time.as_deref().filter(|t| !t.is_empty())
    }

    /// An assistant event with an empty body closes the current reply.
    pub fn is_end_of_stream(&self) -> bool {
        self.role == Role::Assistant && self.body.is_empty()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_system_role(role: &Role) -> bool {
    matches!(role, Role::System)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept RFC 3339 strings as well as epoch numbers; the cursor is opaque so
/// numbers are kept in their decimal form.
fn time_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTime {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(
        Option::<RawTime>::deserialize(deserializer)?.map(|raw| match raw {
            RawTime::Text(text) => text,
            RawTime::Integer(n) => n.to_string(),
            RawTime::Float(f) => f.to_string(),
        }),
    )
}
