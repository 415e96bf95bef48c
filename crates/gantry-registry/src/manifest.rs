// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin manifest parsing from `plugin.toml` files.
//!
//! Every extracted plugin directory carries a `plugin.toml` describing its
//! identity, declared capabilities, and backend executable. The manifest is
//! the only input to descriptor construction; the binary format of plugin
//! archives themselves is handled by the filesystem store.

use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use gantry_core::types::{Capabilities, PluginClass, PluginDescriptor, PluginType};
use gantry_core::GantryError;

/// Parsed plugin manifest.
#[derive(Debug, Clone)]
pub struct PluginManifest {
    pub id: String,
    pub version: String,
    pub plugin_type: PluginType,
    pub capabilities: Capabilities,
    /// Backend executable name relative to the plugin directory.
    pub executable: Option<String>,
    /// Static asset directory relative to the plugin directory.
    pub static_dir: Option<String>,
}

impl PluginManifest {
    /// Build a descriptor for this manifest as installed under `dir`.
    pub fn into_descriptor(self, dir: PathBuf, class: PluginClass) -> PluginDescriptor {
        let static_dir = self.static_dir.map(|d| dir.join(d));
        PluginDescriptor {
            id: self.id,
            version: self.version,
            plugin_type: self.plugin_type,
            class,
            path: dir,
            capabilities: self.capabilities,
            static_dir,
            executable: self.executable,
        }
    }
}

/// Intermediate TOML deserialization struct for `plugin.toml`.
#[derive(Debug, Deserialize)]
struct PluginManifestFile {
    plugin: PluginSection,
    #[serde(default)]
    capabilities: Capabilities,
}

/// The `[plugin]` section of a `plugin.toml` file.
#[derive(Debug, Deserialize)]
struct PluginSection {
    id: String,
    version: String,
    #[serde(rename = "type")]
    plugin_type: String,
    executable: Option<String>,
    static_dir: Option<String>,
}

/// Parse a plugin manifest from TOML content.
///
/// Validates that `type` is a known [`PluginType`], the ID is non-empty,
/// and the version is valid semver.
pub fn parse_plugin_manifest(toml_content: &str) -> Result<PluginManifest, GantryError> {
    let file: PluginManifestFile = toml::from_str(toml_content)
        .map_err(|e| GantryError::Config(format!("invalid plugin manifest: {e}")))?;

    let section = file.plugin;

    if section.id.is_empty() {
        return Err(GantryError::Config(
            "plugin manifest: id must not be empty".to_string(),
        ));
    }

    semver::Version::parse(&section.version).map_err(|e| {
        GantryError::Config(format!(
            "plugin manifest: invalid version '{}': {e}",
            section.version
        ))
    })?;

    let plugin_type = PluginType::from_str(&section.plugin_type).map_err(|_| {
        GantryError::Config(format!(
            "plugin manifest: invalid type '{}'. Expected one of: datasource, panel, app, renderer, secretsmanager",
            section.plugin_type
        ))
    })?;

    Ok(PluginManifest {
        id: section.id,
        version: section.version,
        plugin_type,
        capabilities: file.capabilities,
        executable: section.executable,
        static_dir: section.static_dir,
    })
}
