//! Chat protocol implementation
//!
//! Request and envelope records, the line codec, and command dispatch.

pub mod codec;
pub mod commands;
pub mod handlers;
pub mod responses;

pub use codec::{Frame, decode, encode, read_frame, write_frame};
pub use commands::{Command, CommandResult, CommandStatus, Request};
pub use handlers::handle_command;
pub use responses::{EnvelopeKind, REPLY_OK, ServerEnvelope};
