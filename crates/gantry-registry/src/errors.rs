// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin error records.
//!
//! A record is created when a plugin fails to start or its process crashes,
//! and retained for introspection until the plugin starts successfully or
//! is removed.

use dashmap::DashMap;

use gantry_core::types::{ErrorCode, PluginErrorRecord};

/// Tracks the most recent failure per plugin.
#[derive(Default)]
pub struct ErrorTracker {
    records: DashMap<String, PluginErrorRecord>,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure, replacing any prior record for the same plugin.
    pub fn record(&self, plugin_id: &str, error_code: ErrorCode) {
        self.records.insert(
            plugin_id.to_string(),
            PluginErrorRecord {
                plugin_id: plugin_id.to_string(),
                error_code,
            },
        );
    }

    /// Drop the record for a plugin (successful restart or removal).
    pub fn clear(&self, plugin_id: &str) {
        self.records.remove(plugin_id);
    }

    /// Snapshot of all current records.
    pub fn snapshot(&self) -> Vec<PluginErrorRecord> {
        self.records.iter().map(|e| e.value().clone()).collect()
    }
}
