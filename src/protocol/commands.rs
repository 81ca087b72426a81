//! Module `commands`
//!
//! Defines the client-to-server request record and the command vocabulary,
//! plus the result type produced when a command is executed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ErrorKind;
use crate::protocol::responses::ServerEnvelope;

/// Commands a client may send. Tags are case-exact on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    #[serde(alias = "CheckUniqueNickName")]
    CheckUniqueNickname,
    RegisterUser,
    Login,
    Logout,
    ChangePassword,
    GetOnlineUserList,
    MessageTo,
    Clear,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::CheckUniqueNickname => "CheckUniqueNickname",
            Command::RegisterUser => "RegisterUser",
            Command::Login => "Login",
            Command::Logout => "Logout",
            Command::ChangePassword => "ChangePassword",
            Command::GetOnlineUserList => "GetOnlineUserList",
            Command::MessageTo => "MessageTo",
            Command::Clear => "Clear",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client request. The meaning of `data1`/`data2` depends on the command:
/// nickname and credential for auth commands, recipient and text for `MessageTo`,
/// the new credential in `data1` for `ChangePassword`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "Command")]
    pub command: Command,
    #[serde(rename = "Data1", default)]
    pub data1: String,
    #[serde(rename = "Data2", default)]
    pub data2: String,
}

impl Request {
    pub fn new(command: Command, data1: impl Into<String>, data2: impl Into<String>) -> Self {
        Self {
            command,
            data1: data1.into(),
            data2: data2.into(),
        }
    }

    /// Request with both data fields empty
    pub fn bare(command: Command) -> Self {
        Self::new(command, "", "")
    }
}

/// Represents the outcome status of executing a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure(ErrorKind),
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub reply: ServerEnvelope,
}

impl CommandResult {
    pub fn ok() -> Self {
        Self::success(ServerEnvelope::ok())
    }

    pub fn success(reply: ServerEnvelope) -> Self {
        Self {
            status: CommandStatus::Success,
            reply,
        }
    }

    pub fn failure(kind: ErrorKind, text: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failure(kind),
            reply: ServerEnvelope::failure(kind, text),
        }
    }
}
