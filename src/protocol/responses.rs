//! Server-to-client envelopes
//!
//! Every frame the server writes is a `ServerEnvelope`: either the reply to the
//! connection's own request or a message relayed from another user.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Reply text for every successful command without a payload
pub const REPLY_OK: &str = "ok";

/// Prefix of a non-empty online user listing
pub const ONLINE_USERS_PREFIX: &str = "online users: ";

/// Reply when nobody is online
pub const NO_ONLINE_USERS: &str = "no online users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeKind {
    Reply,
    #[serde(rename = "MessageFrom")]
    IncomingMessage,
}

/// For `Reply`, `field1` is the result text. For `IncomingMessage`, `field1`
/// is the sender nickname and `field2` the message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    #[serde(rename = "Type")]
    pub kind: EnvelopeKind,
    #[serde(rename = "Data1", default)]
    pub field1: String,
    #[serde(rename = "Data2", default)]
    pub field2: String,
    #[serde(rename = "ErrorKind", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl ServerEnvelope {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::Reply,
            field1: text.into(),
            field2: String::new(),
            error: None,
        }
    }

    pub fn ok() -> Self {
        Self::reply(REPLY_OK)
    }

    pub fn failure(kind: ErrorKind, text: impl Into<String>) -> Self {
        Self {
            error: Some(kind),
            ..Self::reply(text)
        }
    }

    pub fn incoming(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::IncomingMessage,
            field1: sender.into(),
            field2: body.into(),
            error: None,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.kind == EnvelopeKind::Reply
    }
}

/// Formats the reply for `GetOnlineUserList`
pub fn format_online_users(nicknames: &[String]) -> String {
    if nicknames.is_empty() {
        NO_ONLINE_USERS.to_string()
    } else {
        format!("{}{}", ONLINE_USERS_PREFIX, nicknames.join(","))
    }
}

/// Inverse of `format_online_users`; unrecognised text yields no names
pub fn parse_online_users(text: &str) -> Vec<String> {
    match text.strip_prefix(ONLINE_USERS_PREFIX) {
        Some(list) => list
            .split(',')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}
