//! Configuration system for Vigil.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $VIGIL_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/vigil/config.toml
//!   3. ~/.config/vigil/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PING_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_API_PORT: u16 = 9101;

// ── Per-room keepalive parameters ─────────────────────────────────────────────

/// Keepalive timing for one room. Fixed when the room is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
    /// How often every tracked peer is pinged.
    pub interval: Duration,
    /// Silence longer than this marks a peer slow; twice this, offline.
    pub timeout: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_PING_INTERVAL_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl KeepaliveConfig {
    /// Build from raw millisecond values. Non-positive values select the default.
    pub fn from_millis(interval_ms: i64, timeout_ms: i64) -> Self {
        let mut config = Self::default();
        if interval_ms > 0 {
            config.interval = Duration::from_millis(interval_ms as u64);
        }
        if timeout_ms > 0 {
            config.timeout = Duration::from_millis(timeout_ms as u64);
        }
        config
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

// ── File / env configuration ──────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub keepalive: KeepaliveSettings,
    pub api: ApiConfig,
    pub rooms: RoomsConfig,
}

/// Defaults applied to rooms created without explicit timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveSettings {
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Serve the HTTP control API.
    pub enabled: bool,
    /// Loopback port for the control API.
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Rooms created at startup, with keepalive started.
    pub preload: Vec<String>,
}

impl Default for KeepaliveSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_PING_INTERVAL_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_API_PORT,
        }
    }
}

impl KeepaliveSettings {
    pub fn to_config(&self) -> KeepaliveConfig {
        KeepaliveConfig::from_millis(self.interval_ms as i64, self.timeout_ms as i64)
    }

    /// Room timing from optional request values, falling back to these defaults.
    pub fn resolve(&self, interval_ms: Option<i64>, timeout_ms: Option<i64>) -> KeepaliveConfig {
        let base = self.to_config();
        let interval = interval_ms
            .filter(|v| *v > 0)
            .map(|v| Duration::from_millis(v as u64))
            .unwrap_or(base.interval);
        let timeout = timeout_ms
            .filter(|v| *v > 0)
            .map(|v| Duration::from_millis(v as u64))
            .unwrap_or(base.timeout);
        KeepaliveConfig { interval, timeout }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("vigil")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl VigilConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::file_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load a specific file, or defaults if it does not exist. No env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(VigilConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("VIGIL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        Self::write_default_to(&path)?;
        Ok(path)
    }

    fn write_default_to(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let text =
            toml::to_string_pretty(&VigilConfig::default()).map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
    }

    /// Apply VIGIL_* overrides. `lookup` resolves a variable name to its value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("VIGIL_KEEPALIVE__INTERVAL_MS") {
            if let Ok(ms) = v.parse() {
                self.keepalive.interval_ms = ms;
            }
        }
        if let Some(v) = lookup("VIGIL_KEEPALIVE__TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.keepalive.timeout_ms = ms;
            }
        }
        if let Some(v) = lookup("VIGIL_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
        if let Some(v) = lookup("VIGIL_API__ENABLED") {
            self.api.enabled = v == "true" || v == "1";
        }
        if let Some(v) = lookup("VIGIL_ROOMS__PRELOAD") {
            self.rooms.preload = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }
}
