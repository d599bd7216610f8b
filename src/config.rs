//! Server configuration loaded from TOML.

use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "TWO_DUEL_PORT";

/// Environment variable overriding the store backend.
pub const STORE_ENV: &str = "TWO_DUEL_STORE";

/// Store value selecting the in-memory backend.
pub const MEMORY_STORE: &str = "memory";

/// Rendezvous tuning.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct MatchmakingConfig {
    /// Lease taken on a received token, in seconds.
    #[serde(default = "default_visibility_timeout_secs")]
    visibility_timeout_secs: u64,

    /// Delay before a published token becomes visible, in seconds.
    #[serde(default = "default_publish_delay_secs")]
    publish_delay_secs: u64,

    /// Tokens received per join before giving up and creating a room.
    #[serde(default = "default_max_receive_attempts")]
    max_receive_attempts: u32,
}

fn default_visibility_timeout_secs() -> u64 {
    30
}

fn default_publish_delay_secs() -> u64 {
    1
}

fn default_max_receive_attempts() -> u32 {
    3
}

impl MatchmakingConfig {
    /// Visibility timeout as a duration.
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    /// Publish delay as a duration.
    pub fn publish_delay(&self) -> Duration {
        Duration::from_secs(self.publish_delay_secs)
    }

    /// Rejects values that would stop pairing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `max_receive_attempts` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_receive_attempts == 0 {
            return Err(ConfigError::new(
                "matchmaking.max_receive_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self::new(
            default_visibility_timeout_secs(),
            default_publish_delay_secs(),
            default_max_receive_attempts(),
        )
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// `"memory"` or a path to a SQLite database file.
    #[serde(default = "default_store")]
    store: String,

    /// Rendezvous tuning.
    #[serde(default)]
    matchmaking: MatchmakingConfig,
}

#[instrument]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[instrument]
fn default_port() -> u16 {
    3000
}

#[instrument]
fn default_store() -> String {
    MEMORY_STORE.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            store: default_store(),
            matchmaking: MatchmakingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.matchmaking.validate()?;

        info!(host = %config.host, port = config.port, store = %config.store, "Config loaded");
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise defaults, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file is invalid or an override
    /// cannot be parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            info!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_overrides(
            std::env::var(PORT_ENV).ok().as_deref(),
            std::env::var(STORE_ENV).ok().as_deref(),
        )?;
        Ok(config)
    }

    /// Applies explicit port and store overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `port` is not a valid port number.
    pub fn apply_overrides(
        &mut self,
        port: Option<&str>,
        store: Option<&str>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = port {
            self.port = port
                .parse()
                .map_err(|e| ConfigError::new(format!("Invalid port '{}': {}", port, e)))?;
            warn!(port = self.port, "Port overridden");
        }
        if let Some(store) = store {
            self.store = store.to_string();
            warn!(store = %self.store, "Store overridden");
        }
        Ok(())
    }

    /// Replaces the bind address.
    pub fn with_listen(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Whether the in-memory store is selected.
    pub fn uses_memory_store(&self) -> bool {
        self.store == MEMORY_STORE
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
