//! Server core functionality
//!
//! The TCP listener that accepts chat connections and runs one worker per socket.

pub mod core;

pub use self::core::Server;
