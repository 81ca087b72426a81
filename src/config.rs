//! Configuration management for the relay-chat server and client
//!
//! Values are layered: built-in defaults, then an optional `config.toml`,
//! then `RELAY_CHAT_*` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "config";
const ENV_PREFIX: &str = "RELAY_CHAT";

/// Server-side settings, loaded once at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address the listener binds to
    pub bind_address: String,

    /// Port for the chat listener (0 picks an ephemeral port)
    pub port: u16,

    /// Path of the JSON account store; empty keeps accounts in memory
    pub store_path: String,

    /// Longest accepted request line in bytes
    pub max_frame_length: usize,

    /// Consecutive undecodable frames tolerated before the connection is dropped
    pub max_decode_failures: u32,

    /// Outbound frames buffered per connection
    pub mailbox_capacity: usize,

    /// Idle read deadline; 0 disables
    pub idle_timeout_secs: u64,

    /// Deadline for a single socket write
    pub write_timeout_secs: u64,

    /// Extra attempts after a failed store write
    pub save_retries: u32,
}

/// Client-side settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Address of the chat server, `host:port`
    pub server_address: String,

    /// How long a command waits for its reply
    pub reply_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 1111,
            store_path: String::new(),
            max_frame_length: 4096,
            max_decode_failures: 3,
            mailbox_capacity: 64,
            idle_timeout_secs: 0,
            write_timeout_secs: 10,
            save_retries: 2,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:1111".to_string(),
            reply_timeout_secs: 10,
        }
    }
}

/// Builds the layered settings source shared by server and client.
fn build_settings(config_file: &str) -> Result<Config, ConfigError> {
    let server = ServerConfig::default();
    let client = ClientConfig::default();

    Config::builder()
        .set_default("bind_address", server.bind_address)?
        .set_default("port", i64::from(server.port))?
        .set_default("store_path", server.store_path)?
        .set_default("max_frame_length", server.max_frame_length as i64)?
        .set_default("max_decode_failures", i64::from(server.max_decode_failures))?
        .set_default("mailbox_capacity", server.mailbox_capacity as i64)?
        .set_default("idle_timeout_secs", server.idle_timeout_secs as i64)?
        .set_default("write_timeout_secs", server.write_timeout_secs as i64)?
        .set_default("save_retries", i64::from(server.save_retries))?
        .set_default("server_address", client.server_address)?
        .set_default("reply_timeout_secs", client.reply_timeout_secs as i64)?
        .add_source(File::with_name(config_file).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
}

impl ServerConfig {
    /// Load from `config.toml` in the working directory with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the given config file (extension optional)
    pub fn load_from(config_file: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = build_settings(config_file)?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Message("bind_address cannot be empty".into()));
        }

        if self.max_frame_length == 0 {
            return Err(ConfigError::Message(
                "max_frame_length must be greater than 0".into(),
            ));
        }

        if self.max_decode_failures == 0 {
            return Err(ConfigError::Message(
                "max_decode_failures must be greater than 0".into(),
            ));
        }

        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Message(
                "mailbox_capacity must be greater than 0".into(),
            ));
        }

        if self.write_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "write_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Bind address and port as a socket address string
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Store location, `None` for in-memory operation
    pub fn store_path(&self) -> Option<PathBuf> {
        if self.store_path.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.store_path))
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(config_file: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = build_settings(config_file)?.try_deserialize()?;
        if config.server_address.trim().is_empty() {
            return Err(ConfigError::Message("server_address cannot be empty".into()));
        }
        if config.reply_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "reply_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(config)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_config_file() {
        let config = ServerConfig::load_from("does-not-exist").unwrap();
        assert_eq!(config.port, 1111);
        assert_eq!(config.listen_address(), "127.0.0.1:1111");
        assert!(config.store_path().is_none());
        assert!(config.idle_timeout().is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "port = 2222\nstore_path = \"users.json\"\nidle_timeout_secs = 30").unwrap();

        let config = ServerConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.port, 2222);
        assert_eq!(config.store_path(), Some(PathBuf::from("users.json")));
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_zero_frame_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "max_frame_length = 0\n").unwrap();

        assert!(ServerConfig::load_from(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn client_config_defaults() {
        let config = ClientConfig::load_from("does-not-exist").unwrap();
        assert_eq!(config.server_address, "127.0.0.1:1111");
        assert_eq!(config.reply_timeout(), Duration::from_secs(10));
    }
}
