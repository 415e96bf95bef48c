// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External collaborator seams consumed by the manager facade.
//!
//! The internals of plugin sourcing, archive fetching, and on-disk storage
//! are out of scope for the gateway; it only depends on these narrow
//! interfaces.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::GantryError;
use crate::types::{CompatOpts, PluginClass};

/// A place plugins may be found, with the provenance class they load as.
#[derive(Debug, Clone)]
pub struct PluginSource {
    pub class: PluginClass,
    pub paths: Vec<PathBuf>,
}

/// Enumerates where plugins may be found.
#[async_trait]
pub trait SourceLister: Send + Sync + 'static {
    async fn list(&self) -> Vec<PluginSource>;
}

/// How a fetched archive is materialized.
#[derive(Debug, Clone)]
pub enum ArchivePayload {
    /// Raw archive bytes fetched from a remote repository.
    Bytes(Vec<u8>),
    /// An already-unpacked directory on local disk.
    Dir(PathBuf),
}

/// A fetched plugin archive, not yet installed.
#[derive(Debug, Clone)]
pub struct PluginArchive {
    pub plugin_id: String,
    pub version: String,
    pub payload: ArchivePayload,
}

/// Fetches plugin archives from a repository, enforcing compatibility of
/// the (host version, OS, arch) tuple at lookup time.
#[async_trait]
pub trait PluginRepo: Send + Sync + 'static {
    async fn get_archive(
        &self,
        plugin_id: &str,
        version: &str,
        compat: &CompatOpts,
    ) -> Result<PluginArchive, GantryError>;
}

/// An archive extracted onto disk.
#[derive(Debug, Clone)]
pub struct ExtractedArchive {
    pub plugin_id: String,
    pub dir: PathBuf,
}

/// Records where extracted plugins live on disk.
#[async_trait]
pub trait FsStore: Send + Sync + 'static {
    /// Extract an archive into the store and return its location.
    async fn extract(&self, archive: PluginArchive) -> Result<ExtractedArchive, GantryError>;

    /// Record an already-extracted plugin directory.
    async fn register(&self, plugin_id: &str, dir: &Path) -> Result<(), GantryError>;

    /// Delete the plugin's extracted files. Idempotent.
    async fn remove(&self, plugin_id: &str) -> Result<(), GantryError>;
}
