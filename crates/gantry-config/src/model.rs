// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Gantry gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Gantry configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GantryConfig {
    /// Gateway HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Plugin installation and lifecycle settings.
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Gateway HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind. 0 picks a free port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host version advertised in plugin compatibility lookups.
    #[serde(default = "default_host_version")]
    pub host_version: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            host_version: default_host_version(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_host_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Plugin installation and lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsConfig {
    /// Directory plugins are extracted into.
    #[serde(default = "default_plugins_dir")]
    pub dir: String,

    /// Local plugin repository, laid out as `{repo_dir}/{id}/{version}/`.
    #[serde(default = "default_repo_dir")]
    pub repo_dir: String,

    /// Grace period in seconds before a stop escalates to a forced kill.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dir: default_plugins_dir(),
            repo_dir: default_repo_dir(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_plugins_dir() -> String {
    data_path("gantry/plugins")
}

fn default_repo_dir() -> String {
    data_path("gantry/repo")
}

fn data_path(suffix: &str) -> String {
    dirs::data_dir()
        .map(|d| d.join(suffix).to_string_lossy().into_owned())
        .unwrap_or_else(|| suffix.rsplit('/').next().unwrap_or(suffix).to_string())
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
