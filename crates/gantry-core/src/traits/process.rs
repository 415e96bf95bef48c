// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process manager seam: owns the backend process lifecycle per plugin.

use async_trait::async_trait;

use crate::error::GantryError;

/// Starts and stops plugin backend processes.
///
/// Start and stop serialize per plugin ID; operations on different IDs
/// never block each other.
#[async_trait]
pub trait ProcessManager: Send + Sync + 'static {
    /// Ensure the plugin's backend is running. No-op if already running or
    /// the backend is unmanaged; fails with `Unavailable` if decommissioned.
    async fn start(&self, plugin_id: &str) -> Result<(), GantryError>;

    /// Stop the plugin's backend, escalating to forced termination after
    /// the configured grace period. Idempotent.
    async fn stop(&self, plugin_id: &str) -> Result<(), GantryError>;

    /// Stop all managed plugins, logging and continuing past individual
    /// failures. Used at process-wide teardown.
    async fn shutdown(&self);
}
