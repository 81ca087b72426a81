//! Server-side connection management
//!
//! Per-connection protocol state, the live-connection table used for message
//! delivery, and the read/dispatch loop run for every accepted socket.

pub mod handler;
pub mod peers;
pub mod state;

pub use handler::{ConnectionContext, handle_connection};
pub use peers::PeerTable;
pub use state::{ConnectionState, SessionPhase};
