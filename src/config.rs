//! TOML configuration with serde defaults.
//!
//! Resolution order: explicit `--config` path, then
//! `~/.taskvault/config.toml` if present, then built-in defaults. CLI flags
//! override individual fields after loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

/// `[server]` section: HTTP bind and challenge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Realm string announced in authentication challenges.
    pub realm: String,
    /// Allow binding a non-loopback address. Off by default.
    pub allow_public_bind: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            realm: "task-manager".into(),
            allow_public_bind: false,
        }
    }
}

/// `[auth]` section: credential store and enrollment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// SQLite database path; defaults to `<workspace>/taskvault.db`.
    pub db_path: Option<PathBuf>,
    /// Whether new identity registration is allowed.
    pub allow_registration: bool,
    /// Maximum registered identities (0 = unlimited).
    pub max_users: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            allow_registration: true,
            max_users: 0,
        }
    }
}

impl Config {
    /// Load configuration. An explicit path must exist; the default path is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = workspace_dir().join("config.toml");
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Resolved credential database path.
    pub fn db_path(&self) -> PathBuf {
        self.auth
            .db_path
            .clone()
            .unwrap_or_else(|| workspace_dir().join("taskvault.db"))
    }
}

/// Per-user workspace directory (`~/.taskvault`).
pub fn workspace_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".taskvault"))
        .unwrap_or_else(|| PathBuf::from(".taskvault"))
}
