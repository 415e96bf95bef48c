// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory plugin registry.
//!
//! `InMemoryRegistry` stores `Arc<Plugin>` handles keyed by plugin ID behind
//! a read-write lock: lookups and snapshots proceed concurrently, while
//! `add`/`remove` are exclusive with each other and with any in-flight
//! snapshot read. A snapshot returned by `plugins()` never changes after
//! return, even if a writer races with it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use gantry_core::types::Plugin;
use gantry_core::{GantryError, Registry};

/// Registry of installed plugins, keyed by ID.
#[derive(Default)]
pub struct InMemoryRegistry {
    entries: RwLock<HashMap<String, Arc<Plugin>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn add(&self, plugin: Arc<Plugin>) -> Result<(), GantryError> {
        let id = plugin.id().to_string();
        let replaced = self
            .entries
            .write()
            .expect("registry lock poisoned")
            .insert(id.clone(), plugin)
            .is_some();
        debug!(plugin_id = %id, replaced, "plugin registered");
        Ok(())
    }

    async fn remove(&self, plugin_id: &str) -> Result<(), GantryError> {
        let removed = self
            .entries
            .write()
            .expect("registry lock poisoned")
            .remove(plugin_id)
            .is_some();
        debug!(plugin_id, removed, "plugin unregistered");
        Ok(())
    }

    async fn plugin(&self, plugin_id: &str) -> Option<Arc<Plugin>> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .get(plugin_id)
            .cloned()
    }

    async fn plugins(&self) -> Vec<Arc<Plugin>> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_test_utils::{test_descriptor, FakeBackend};

    fn test_plugin(id: &str) -> Arc<Plugin> {
        Arc::new(Plugin {
            descriptor: test_descriptor(id),
            backend: Arc::new(FakeBackend::managed(id)),
        })
    }

    #[tokio::test]
    async fn add_and_lookup_roundtrip() {
        let registry = InMemoryRegistry::new();
        registry.add(test_plugin("loki")).await.unwrap();

        let found = registry.plugin("loki").await.unwrap();
        assert_eq!(found.id(), "loki");
        assert!(registry.plugin("tempo").await.is_none());
    }

    #[tokio::test]
    async fn add_with_colliding_id_replaces_entry() {
        let registry = InMemoryRegistry::new();
        let first = test_plugin("loki");
        registry.add(Arc::clone(&first)).await.unwrap();

        let second = test_plugin("loki");
        registry.add(Arc::clone(&second)).await.unwrap();

        assert_eq!(registry.len(), 1);
        let live = registry.plugin("loki").await.unwrap();
        assert!(Arc::ptr_eq(&live, &second));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = InMemoryRegistry::new();
        registry.add(test_plugin("loki")).await.unwrap();

        registry.remove("loki").await.unwrap();
        registry.remove("loki").await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_stable_under_concurrent_mutation() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.add(test_plugin("a")).await.unwrap();
        registry.add(test_plugin("b")).await.unwrap();

        let snapshot = registry.plugins().await;
        assert_eq!(snapshot.len(), 2);

        registry.remove("a").await.unwrap();
        registry.add(test_plugin("c")).await.unwrap();

        // The snapshot taken before the mutations is unchanged.
        assert_eq!(snapshot.len(), 2);
        let ids: Vec<&str> = snapshot.iter().map(|p| p.id()).collect();
        assert!(ids.contains(&"a"));
        assert!(ids.contains(&"b"));
    }

    #[tokio::test]
    async fn concurrent_adds_leave_one_entry_per_id() {
        let registry = Arc::new(InMemoryRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.add(test_plugin("shared")).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(registry.len(), 1);
    }
}
