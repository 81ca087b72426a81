//! Client side of the chat protocol
//!
//! A session issues one request at a time and waits for its reply while a
//! background receive loop hands relayed messages to the caller.

pub mod results;
pub mod session;

pub use results::{IncomingMessage, Reply};
pub use session::ClientSession;
