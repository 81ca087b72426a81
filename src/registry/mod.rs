//! User registry
//!
//! The authoritative map of accounts and who is online, shared by every
//! connection of one server instance.

pub mod account;
pub mod users;

pub use account::{Account, ConnectionId};
pub use users::UserRegistry;
