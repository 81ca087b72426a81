//! Logging utilities
//!
//! Provides logging setup and configuration.

use env_logger::Env;

/// Setup logging for the server; `RUST_LOG` overrides the `info` default
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Logger for tests; safe to call more than once
#[cfg(test)]
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
