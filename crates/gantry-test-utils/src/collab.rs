// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fake installer collaborators and process manager.
//!
//! Call counts are exposed so tests can assert which collaborators were
//! (and were not) invoked.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;

use gantry_core::traits::collab::{ArchivePayload, ExtractedArchive, PluginArchive, PluginSource};
use gantry_core::types::CompatOpts;
use gantry_core::{FsStore, GantryError, PluginRepo, ProcessManager, SourceLister};

/// Process manager double counting starts and stops per plugin ID.
#[derive(Default)]
pub struct FakeProcessManager {
    pub started: DashMap<String, usize>,
    pub stopped: DashMap<String, usize>,
    /// Plugin IDs whose `start` should fail.
    pub fail_start: DashMap<String, String>,
}

impl FakeProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_count(&self, plugin_id: &str) -> usize {
        self.started.get(plugin_id).map(|c| *c).unwrap_or(0)
    }

    pub fn stop_count(&self, plugin_id: &str) -> usize {
        self.stopped.get(plugin_id).map(|c| *c).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.started.iter().map(|e| *e.value()).sum::<usize>()
            + self.stopped.iter().map(|e| *e.value()).sum::<usize>()
    }
}

#[async_trait]
impl ProcessManager for FakeProcessManager {
    async fn start(&self, plugin_id: &str) -> Result<(), GantryError> {
        *self.started.entry(plugin_id.to_string()).or_insert(0) += 1;
        if let Some(message) = self.fail_start.get(plugin_id) {
            return Err(GantryError::StartFailure {
                plugin_id: plugin_id.to_string(),
                source: Box::new(std::io::Error::other(message.value().clone())),
            });
        }
        Ok(())
    }

    async fn stop(&self, plugin_id: &str) -> Result<(), GantryError> {
        *self.stopped.entry(plugin_id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn shutdown(&self) {}
}

/// Repository double serving archives from a configured map.
#[derive(Default)]
pub struct FakePluginRepo {
    archives: DashMap<(String, String), Vec<u8>>,
    /// Records the compat opts of every lookup, for assertions.
    pub requested: DashMap<String, CompatOpts>,
}

impl FakePluginRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `(plugin_id, version)` resolvable with the given archive bytes.
    pub fn with_archive(self, plugin_id: &str, version: &str, bytes: Vec<u8>) -> Self {
        self.add_archive(plugin_id, version, bytes);
        self
    }

    /// Post-construction variant of [`Self::with_archive`].
    pub fn add_archive(&self, plugin_id: &str, version: &str, bytes: Vec<u8>) {
        self.archives
            .insert((plugin_id.to_string(), version.to_string()), bytes);
    }
}

#[async_trait]
impl PluginRepo for FakePluginRepo {
    async fn get_archive(
        &self,
        plugin_id: &str,
        version: &str,
        compat: &CompatOpts,
    ) -> Result<PluginArchive, GantryError> {
        self.requested
            .insert(plugin_id.to_string(), compat.clone());
        let key = (plugin_id.to_string(), version.to_string());
        match self.archives.get(&key) {
            Some(bytes) => Ok(PluginArchive {
                plugin_id: plugin_id.to_string(),
                version: version.to_string(),
                payload: ArchivePayload::Bytes(bytes.value().clone()),
            }),
            None => Err(GantryError::Install {
                plugin_id: plugin_id.to_string(),
                message: format!("no archive for version {version}"),
            }),
        }
    }
}

/// Filesystem store double recording registrations and removals.
#[derive(Default)]
pub struct FakeFsStore {
    base_dir: PathBuf,
    pub registered: DashMap<String, PathBuf>,
    pub removed: DashMap<String, usize>,
}

impl FakeFsStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn contains(&self, plugin_id: &str) -> bool {
        self.registered.contains_key(plugin_id)
    }
}

#[async_trait]
impl FsStore for FakeFsStore {
    async fn extract(&self, archive: PluginArchive) -> Result<ExtractedArchive, GantryError> {
        let dir = self.base_dir.join(&archive.plugin_id);
        self.registered
            .insert(archive.plugin_id.clone(), dir.clone());
        Ok(ExtractedArchive {
            plugin_id: archive.plugin_id,
            dir,
        })
    }

    async fn register(&self, plugin_id: &str, dir: &Path) -> Result<(), GantryError> {
        self.registered
            .insert(plugin_id.to_string(), dir.to_path_buf());
        Ok(())
    }

    async fn remove(&self, plugin_id: &str) -> Result<(), GantryError> {
        self.registered.remove(plugin_id);
        *self.removed.entry(plugin_id.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

/// Source lister double returning a fixed list.
#[derive(Default)]
pub struct FakeSourceLister {
    sources: Vec<PluginSource>,
}

impl FakeSourceLister {
    pub fn new(sources: Vec<PluginSource>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl SourceLister for FakeSourceLister {
    async fn list(&self) -> Vec<PluginSource> {
        self.sources.clone()
    }
}
