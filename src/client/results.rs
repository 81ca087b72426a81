//! Client result types
//!
//! What a session hands back to its caller: command replies and relayed messages.

use crate::error::ErrorKind;
use crate::protocol::{REPLY_OK, ServerEnvelope};

/// Server reply to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub error: Option<ErrorKind>,
}

impl Reply {
    /// True for the plain `ok` acknowledgement
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.text == REPLY_OK
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl From<ServerEnvelope> for Reply {
    fn from(envelope: ServerEnvelope) -> Self {
        Self {
            text: envelope.field1,
            error: envelope.error,
        }
    }
}

/// A message another user relayed to this session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub sender: String,
    pub body: String,
}

impl From<ServerEnvelope> for IncomingMessage {
    fn from(envelope: ServerEnvelope) -> Self {
        Self {
            sender: envelope.field1,
            body: envelope.field2,
        }
    }
}
