//! relay-chat server - Entry Point
//!
//! A line-oriented TCP chat server with accounts, presence and direct messages.

use log::{error, info};
use std::process;
use std::sync::Arc;

use relay_chat::config::ServerConfig;
use relay_chat::storage::{AccountStore, JsonFileStore, MemoryStore};
use relay_chat::utils::logging::setup_logging;
use relay_chat::{Server, UserRegistry};

#[tokio::main]
async fn main() {
    setup_logging();

    info!("Launching chat server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let store: Arc<dyn AccountStore> = match config.store_path() {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => {
            info!("No store_path configured, accounts are kept in memory");
            Arc::new(MemoryStore::default())
        }
    };

    let registry = match UserRegistry::load(store) {
        Ok(registry) => registry.with_save_retries(config.save_retries),
        Err(e) => {
            error!("Failed to load accounts: {}", e);
            process::exit(1);
        }
    };

    let server = match Server::bind(config, Arc::new(registry)).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            process::exit(1);
        }
    };

    server.start().await;
}
