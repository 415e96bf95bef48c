// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for gateway unit tests.

use std::sync::Arc;

use gantry_client::ClientDecorator;
use gantry_core::{BackendFactory, BackendPlugin, GantryError, PluginDescriptor};
use gantry_manager::PluginManager;
use gantry_registry::{ErrorTracker, InMemoryRegistry};
use gantry_test_utils::{FakeBackend, FakeFsStore, FakePluginRepo, FakeProcessManager};

struct PlainFactory;

impl BackendFactory for PlainFactory {
    fn create(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<Arc<dyn BackendPlugin>, GantryError> {
        Ok(Arc::new(FakeBackend::managed(&descriptor.id)))
    }
}

/// A manager with an empty registry and fake collaborators.
pub fn empty_manager() -> Arc<PluginManager> {
    let registry = Arc::new(InMemoryRegistry::new());
    let process = Arc::new(FakeProcessManager::new());
    let client = Arc::new(ClientDecorator::new(registry.clone(), process.clone()));
    Arc::new(PluginManager::new(
        registry,
        process,
        client,
        Arc::new(FakePluginRepo::new()),
        Arc::new(FakeFsStore::new("/tmp/gantry-gateway-tests")),
        Arc::new(PlainFactory),
        Arc::new(ErrorTracker::new()),
    ))
}
