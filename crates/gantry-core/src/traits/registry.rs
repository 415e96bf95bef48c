// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry seam: the in-memory mapping from plugin ID to plugin handle.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GantryError;
use crate::types::Plugin;

/// In-memory plugin registry.
///
/// All operations are safe under arbitrary concurrent invocation. `plugins`
/// returns a point-in-time snapshot that does not change after return, even
/// if `add`/`remove` race with it.
#[async_trait]
pub trait Registry: Send + Sync + 'static {
    /// Insert a plugin, replacing any prior entry with the same ID.
    async fn add(&self, plugin: Arc<Plugin>) -> Result<(), GantryError>;

    /// Delete the entry if present. Idempotent.
    async fn remove(&self, plugin_id: &str) -> Result<(), GantryError>;

    async fn plugin(&self, plugin_id: &str) -> Option<Arc<Plugin>>;

    /// Snapshot of all registered plugins, in no particular order.
    async fn plugins(&self) -> Vec<Arc<Plugin>>;
}
