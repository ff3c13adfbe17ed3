//! Configuration schema, defaults, and layered loading.
//!
//! Precedence: defaults < config file < environment < CLI
use anyhow::{ensure, Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::defaults;

const MAX_PORT_RANGE: u16 = 1000;
const MAX_EXPIRE_MINUTES: u64 = 24 * 60;

pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "sharefast")
        .map(|p| p.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("sharefast.toml"))
}

/// Listener settings: where port probing starts and how far it goes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServerSettings {
    /// First port tried when the caller does not request one.
    pub port_start: u16,
    /// Number of consecutive ports probed before giving up.
    pub port_range: u16,
    /// Seconds to let in-flight responses finish on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port_start: defaults::PORT_START,
            port_range: defaults::PORT_RANGE,
            shutdown_grace_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Default auto-stop countdown in minutes. 0 expires on the first tick;
    /// disabling the countdown entirely is a per-run choice (`--no-expire`).
    pub expire_minutes: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            expire_minutes: defaults::EXPIRE_MINUTES,
        }
    }
}

/// Fully resolved application configuration after all layers merge.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub session: SessionSettings,
}

impl AppConfig {
    /// Validates port-range and expiry bounds and rejects unusable values.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.server.port_range >= 1,
            "Invalid config: server.port_range must be >= 1"
        );
        ensure!(
            self.server.port_range <= MAX_PORT_RANGE,
            "Invalid config: server.port_range must be <= {MAX_PORT_RANGE}"
        );
        ensure!(
            self.server.port_start > 0,
            "Invalid config: server.port_start must be > 0"
        );
        ensure!(
            self.session.expire_minutes <= MAX_EXPIRE_MINUTES,
            "Invalid config: session.expire_minutes must be <= {MAX_EXPIRE_MINUTES}"
        );
        Ok(())
    }
}

/// Runtime overrides collected from CLI flags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_minutes: Option<u64>,
}

/// Loads config from defaults/file/env.
pub fn load_config() -> Result<AppConfig> {
    let path = config_path();

    let config: AppConfig = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("SHAREFAST_").split("__"))
        .extract()
        .context("Failed to load configuration")?;

    config.validate()?;

    Ok(config)
}

/// Applies runtime overrides to a loaded config.
pub fn apply_overrides(mut config: AppConfig, overrides: &ConfigOverrides) -> AppConfig {
    if let Some(port) = overrides.port {
        config.server.port_start = port;
    }
    if let Some(minutes) = overrides.expire_minutes {
        config.session.expire_minutes = minutes;
    }

    config
}
