//! Application configuration management.
//!
//! This module handles loading and saving the console configuration, which
//! includes the backend URL, how the auth token travels, and queue limits.
//!
//! Configuration is stored at `~/.config/coinblesk-console/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::gateway::{GatewayConfig, TokenMode};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "coinblesk-console";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured backend URL
pub const BASE_URL_ENV: &str = "COINBLESK_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REPLAY_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_PENDING_REQUESTS: usize = 64;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub base_url: Option<String>,
    #[serde(default = "default_true")]
    pub use_auth_token_header: bool,
    pub last_username: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub replay_timeout_secs: Option<u64>,
    pub max_pending_requests: Option<usize>,
    #[serde(default = "default_true")]
    pub fetch_profile_on_login: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            use_auth_token_header: true,
            last_username: None,
            request_timeout_secs: None,
            replay_timeout_secs: None,
            max_pending_requests: None,
            fetch_profile_on_login: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend URL: environment override, then config file, then localhost
    pub fn base_url(&self) -> String {
        std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.base_url(),
            token_mode: TokenMode::from_header_flag(self.use_auth_token_header),
            request_timeout: Duration::from_secs(
                self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            replay_timeout: Duration::from_secs(
                self.replay_timeout_secs.unwrap_or(DEFAULT_REPLAY_TIMEOUT_SECS),
            ),
            max_pending_requests: self
                .max_pending_requests
                .unwrap_or(DEFAULT_MAX_PENDING_REQUESTS)
                .max(1),
            fetch_profile_on_login: self.fetch_profile_on_login,
        }
    }
}
