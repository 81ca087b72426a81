pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod storage;
pub mod utils;

pub use client::ClientSession;
pub use registry::UserRegistry;
pub use server::Server;
