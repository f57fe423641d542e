//! Sync configuration
//!
//! Everything the host supplies about which diagram to talk to and how to
//! behave without it. Loadable from RON; every field has a default.

use crate::{Error, Result};
use econsync_cache::CacheStore;
use econsync_netcode::Handshake;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a [`crate::Hub`]
///
/// # Example
///
/// ```
/// use econsync_hub::SyncConfig;
///
/// let config = SyncConfig::from_ron_str(r#"(
///     game_name: "Dungeon",
///     diagram_token: "abc123",
///     cache_directory_name: "dungeon",
/// )"#).unwrap();
///
/// assert!(config.caching_enabled());
/// assert!(!config.strict_offline);
/// assert_eq!(config.rng_seed, 12345);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Key identifying the user to the backend, presented by the host
    /// transport when it connects (see [`SyncConfig::handshake`])
    pub user_key: String,
    /// Game name sent with the authorization request
    pub game_name: String,
    /// Token of the diagram to sync with
    pub diagram_token: String,
    /// Cache directory under `cache_root`; empty disables caching
    pub cache_directory_name: String,
    /// Root directory for cache snapshots
    pub cache_root: PathBuf,
    /// Treat missing values while offline as errors
    pub strict_offline: bool,
    /// Seed for dice rolls in derived values
    pub rng_seed: u64,
    /// Give up on the backend after this long; `None` waits forever
    pub startup_timeout_ms: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_key: String::new(),
            game_name: String::new(),
            diagram_token: String::new(),
            cache_directory_name: String::new(),
            cache_root: PathBuf::from("sync_cache"),
            strict_offline: false,
            rng_seed: 12345,
            startup_timeout_ms: None,
        }
    }
}

impl SyncConfig {
    /// Parse a configuration from RON text
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn caching_enabled(&self) -> bool {
        !self.cache_directory_name.is_empty()
    }

    /// Store for the configured cache directory
    pub fn cache_store(&self) -> CacheStore {
        CacheStore::new(&self.cache_root, &self.cache_directory_name)
    }

    pub fn startup_timeout(&self) -> Option<Duration> {
        self.startup_timeout_ms.map(Duration::from_millis)
    }

    /// Credentials for the host transport to open its connection with
    pub fn handshake(&self) -> Handshake {
        Handshake::new(self.user_key.clone())
    }
}
