// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local installer collaborators.
//!
//! `DirRepo` serves plugin artifacts from a directory laid out as
//! `{repo_dir}/{id}/{version}/`; a networked repository would implement the
//! same trait against a registry API and resolve per (os, arch). `DiskStore`
//! installs extracted plugins under the configured plugins directory and
//! `InstalledPluginsLister` enumerates them again at startup.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use gantry_core::traits::collab::{
    ArchivePayload, ExtractedArchive, PluginArchive, PluginSource,
};
use gantry_core::types::{CompatOpts, PluginClass};
use gantry_core::{FsStore, GantryError, PluginRepo, SourceLister};

/// Plugin repository backed by a local directory tree.
pub struct DirRepo {
    root: PathBuf,
}

impl DirRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl PluginRepo for DirRepo {
    async fn get_archive(
        &self,
        plugin_id: &str,
        version: &str,
        compat: &CompatOpts,
    ) -> Result<PluginArchive, GantryError> {
        debug!(plugin_id, version, ?compat, "resolving plugin artifact");
        let dir = self.root.join(plugin_id).join(version);
        if !dir.join("plugin.toml").is_file() {
            return Err(GantryError::Install {
                plugin_id: plugin_id.to_string(),
                message: format!("version {version} not present in repository"),
            });
        }
        Ok(PluginArchive {
            plugin_id: plugin_id.to_string(),
            version: version.to_string(),
            payload: ArchivePayload::Dir(dir),
        })
    }
}

/// Filesystem store installing plugins under a single directory.
pub struct DiskStore {
    plugins_dir: PathBuf,
}

impl DiskStore {
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
        }
    }

    fn plugin_dir(&self, plugin_id: &str) -> PathBuf {
        self.plugins_dir.join(plugin_id)
    }
}

#[async_trait]
impl FsStore for DiskStore {
    async fn extract(&self, archive: PluginArchive) -> Result<ExtractedArchive, GantryError> {
        let target = self.plugin_dir(&archive.plugin_id);
        match archive.payload {
            ArchivePayload::Dir(source) => {
                let target_clone = target.clone();
                tokio::task::spawn_blocking(move || copy_tree(&source, &target_clone))
                    .await
                    .map_err(|e| GantryError::Internal(format!("extract task: {e}")))?
                    .map_err(|e| GantryError::Install {
                        plugin_id: archive.plugin_id.clone(),
                        message: format!("copy failed: {e}"),
                    })?;
                Ok(ExtractedArchive {
                    plugin_id: archive.plugin_id,
                    dir: target,
                })
            }
            ArchivePayload::Bytes(_) => Err(GantryError::Install {
                plugin_id: archive.plugin_id,
                message: "opaque archive payloads are not supported by the local store".into(),
            }),
        }
    }

    async fn register(&self, plugin_id: &str, dir: &Path) -> Result<(), GantryError> {
        if !dir.is_dir() {
            return Err(GantryError::Install {
                plugin_id: plugin_id.to_string(),
                message: format!("{} is not a directory", dir.display()),
            });
        }
        Ok(())
    }

    async fn remove(&self, plugin_id: &str) -> Result<(), GantryError> {
        let dir = self.plugin_dir(plugin_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GantryError::Install {
                plugin_id: plugin_id.to_string(),
                message: format!("cannot remove {}: {e}", dir.display()),
            }),
        }
    }
}

/// Recursively copy a directory tree, replacing the target if present.
fn copy_tree(source: &Path, target: &Path) -> std::io::Result<()> {
    if target.exists() {
        std::fs::remove_dir_all(target)?;
    }
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// Lists already-installed plugins so they can be re-registered at startup.
pub struct InstalledPluginsLister {
    plugins_dir: PathBuf,
}

impl InstalledPluginsLister {
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
        }
    }
}

#[async_trait]
impl SourceLister for InstalledPluginsLister {
    async fn list(&self) -> Vec<PluginSource> {
        let mut paths = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.plugins_dir).await else {
            return Vec::new();
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.join("plugin.toml").is_file() {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            Vec::new()
        } else {
            vec![PluginSource {
                class: PluginClass::External,
                paths,
            }]
        }
    }
}
