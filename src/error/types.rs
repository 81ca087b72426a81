//! Error types
//!
//! Defines domain-specific error types for each module of the chat service.
//! Display text is what the peer sees in a failing reply.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::time::Duration;

/// Machine-readable failure class carried next to the reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    AlreadyOnline,
    BadCredential,
    NotAuthenticated,
    RecipientOffline,
    InvalidNickname,
    DecodeFailure,
    TransportFailure,
    PersistenceFailure,
}

/// User registry errors
#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    AlreadyExists(String),
    NotFound(String),
    AlreadyOnline(String),
    BadCredential,
    Offline(String),
    InvalidNickname(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            RegistryError::NotFound(_) => ErrorKind::NotFound,
            RegistryError::AlreadyOnline(_) => ErrorKind::AlreadyOnline,
            RegistryError::BadCredential => ErrorKind::BadCredential,
            RegistryError::Offline(_) => ErrorKind::RecipientOffline,
            RegistryError::InvalidNickname(_) => ErrorKind::InvalidNickname,
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::AlreadyExists(n) => write!(f, "User '{}' already exists", n),
            RegistryError::NotFound(n) => write!(f, "User '{}' does not exist", n),
            RegistryError::AlreadyOnline(n) => write!(f, "User '{}' is already online", n),
            RegistryError::BadCredential => write!(f, "Invalid password"),
            RegistryError::Offline(n) => write!(f, "User '{}' is offline", n),
            RegistryError::InvalidNickname(reason) => write!(f, "Invalid nickname: {}", reason),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Per-connection session errors
#[derive(Debug, PartialEq, Eq)]
pub enum SessionError {
    NotAuthenticated,
    AlreadyAuthenticated(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NotAuthenticated => ErrorKind::NotAuthenticated,
            SessionError::AlreadyAuthenticated(_) => ErrorKind::AlreadyOnline,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotAuthenticated => write!(f, "You are not logged in"),
            SessionError::AlreadyAuthenticated(n) => {
                write!(f, "You are already logged in as '{}'", n)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Wire codec errors
#[derive(Debug)]
pub enum CodecError {
    Decode(serde_json::Error),
    Encode(serde_json::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Decode(e) => write!(f, "Malformed frame: {}", e),
            CodecError::Encode(e) => write!(f, "Failed to encode frame: {}", e),
        }
    }
}

impl std::error::Error for CodecError {}

/// Account store errors
#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serialization(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "Store I/O error: {}", e),
            StoreError::Serialization(e) => write!(f, "Store serialization error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(error: io::Error) -> Self {
        StoreError::Io(error)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error)
    }
}

/// Client session errors
#[derive(Debug)]
pub enum ClientError {
    NotConnected,
    ReplyTimeout(Duration),
    Transport(io::Error),
    Codec(CodecError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::NotConnected => write!(f, "Not connected to server"),
            ClientError::ReplyTimeout(d) => write!(f, "No reply from server within {:?}", d),
            ClientError::Transport(e) => write!(f, "Transport error: {}", e),
            ClientError::Codec(e) => write!(f, "Codec error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<io::Error> for ClientError {
    fn from(error: io::Error) -> Self {
        ClientError::Transport(error)
    }
}

impl From<CodecError> for ClientError {
    fn from(error: CodecError) -> Self {
        ClientError::Codec(error)
    }
}

/// General server error that encompasses all error types
#[derive(Debug)]
pub enum ChatServerError {
    Registry(RegistryError),
    Session(SessionError),
    Codec(CodecError),
    Store(StoreError),
    Transport(io::Error),
}

impl fmt::Display for ChatServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatServerError::Registry(e) => write!(f, "Registry error: {}", e),
            ChatServerError::Session(e) => write!(f, "Session error: {}", e),
            ChatServerError::Codec(e) => write!(f, "Codec error: {}", e),
            ChatServerError::Store(e) => write!(f, "Store error: {}", e),
            ChatServerError::Transport(e) => write!(f, "Transport error: {}", e),
        }
    }
}

impl std::error::Error for ChatServerError {}

impl From<RegistryError> for ChatServerError {
    fn from(error: RegistryError) -> Self {
        ChatServerError::Registry(error)
    }
}

impl From<SessionError> for ChatServerError {
    fn from(error: SessionError) -> Self {
        ChatServerError::Session(error)
    }
}

impl From<CodecError> for ChatServerError {
    fn from(error: CodecError) -> Self {
        ChatServerError::Codec(error)
    }
}

impl From<StoreError> for ChatServerError {
    fn from(error: StoreError) -> Self {
        ChatServerError::Store(error)
    }
}

impl From<io::Error> for ChatServerError {
    fn from(error: io::Error) -> Self {
        ChatServerError::Transport(error)
    }
}
