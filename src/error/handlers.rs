//! Error handlers
//!
//! Logging and wire classification of server errors.

use crate::error::types::{ChatServerError, ErrorKind};
use log::{error, warn};

/// Log a server error at a level matching its severity
pub fn handle_error(err: &ChatServerError) {
    match err {
        ChatServerError::Registry(_) | ChatServerError::Session(_) | ChatServerError::Codec(_) => {
            warn!("Chat server error: {}", err)
        }
        _ => error!("Chat server error: {}", err),
    }
}

/// Convert error to the kind reported in a reply envelope
pub fn error_kind(err: &ChatServerError) -> ErrorKind {
    match err {
        ChatServerError::Registry(e) => e.kind(),
        ChatServerError::Session(e) => e.kind(),
        ChatServerError::Codec(_) => ErrorKind::DecodeFailure,
        ChatServerError::Store(_) => ErrorKind::PersistenceFailure,
        ChatServerError::Transport(_) => ErrorKind::TransportFailure,
    }
}
