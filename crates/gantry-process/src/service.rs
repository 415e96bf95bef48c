// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process lifecycle service.
//!
//! Start and stop for the same plugin ID serialize on a per-plugin lock so
//! concurrent starts collapse to a single launch. Locks are created lazily
//! and never removed; operations on different plugins never contend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use gantry_core::types::{ErrorCode, ProcessState};
use gantry_core::{GantryError, ProcessManager, Registry};
use gantry_registry::ErrorTracker;

use crate::metrics;

/// Default grace period before a stop escalates to a forced kill.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Owns the backend process lifecycle for every registered plugin.
pub struct ProcessService {
    registry: Arc<dyn Registry>,
    errors: Arc<ErrorTracker>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    shutdown_grace: Duration,
}

impl ProcessService {
    pub fn new(registry: Arc<dyn Registry>, errors: Arc<ErrorTracker>) -> Self {
        Self::with_grace(registry, errors, DEFAULT_SHUTDOWN_GRACE)
    }

    pub fn with_grace(
        registry: Arc<dyn Registry>,
        errors: Arc<ErrorTracker>,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            registry,
            errors,
            locks: DashMap::new(),
            shutdown_grace,
        }
    }

    /// The per-plugin exclusive lock, created on first use.
    fn lock_for(&self, plugin_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(plugin_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl ProcessManager for ProcessService {
    async fn start(&self, plugin_id: &str) -> Result<(), GantryError> {
        let plugin = self
            .registry
            .plugin(plugin_id)
            .await
            .ok_or_else(|| GantryError::not_found(plugin_id))?;

        let backend = Arc::clone(&plugin.backend);
        if !backend.is_managed() {
            return Ok(());
        }
        if backend.is_decommissioned() {
            return Err(GantryError::unavailable(plugin_id, "decommissioned"));
        }

        let lock = self.lock_for(plugin_id);
        let _guard = lock.lock().await;

        // Re-observe under the lock: a concurrent start may have finished.
        match backend.state() {
            ProcessState::Running => Ok(()),
            ProcessState::Decommissioned => {
                Err(GantryError::unavailable(plugin_id, "decommissioned"))
            }
            _ => {
                metrics::record_start(plugin_id);
                match backend.start().await {
                    Ok(()) => {
                        self.errors.clear(plugin_id);
                        info!(plugin_id, "backend started");
                        Ok(())
                    }
                    Err(e) => {
                        self.errors.record(plugin_id, ErrorCode::StartupFailed);
                        metrics::record_start_failure(plugin_id);
                        warn!(plugin_id, error = %e, "backend start failed");
                        Err(e)
                    }
                }
            }
        }
    }

    async fn stop(&self, plugin_id: &str) -> Result<(), GantryError> {
        // Stop of an unknown plugin is a no-op: the caller may already have
        // removed the registry entry.
        let Some(plugin) = self.registry.plugin(plugin_id).await else {
            return Ok(());
        };

        let backend = Arc::clone(&plugin.backend);
        if !backend.is_managed() {
            return Ok(());
        }

        let lock = self.lock_for(plugin_id);
        let _guard = lock.lock().await;

        if backend.state() == ProcessState::Exited {
            return Ok(());
        }

        metrics::record_stop(plugin_id);
        match tokio::time::timeout(self.shutdown_grace, backend.stop()).await {
            Ok(Ok(())) => {
                debug!(plugin_id, "backend stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(plugin_id, error = %e, "graceful stop failed, killing");
                metrics::record_kill(plugin_id);
                backend.kill().await
            }
            Err(_) => {
                warn!(
                    plugin_id,
                    grace = ?self.shutdown_grace,
                    "graceful stop timed out, killing"
                );
                metrics::record_kill(plugin_id);
                backend.kill().await
            }
        }
    }

    async fn shutdown(&self) {
        let plugins = self.registry.plugins().await;
        info!(count = plugins.len(), "stopping all plugin backends");

        let stops = plugins.iter().map(|p| {
            let id = p.id().to_string();
            async move {
                if let Err(e) = self.stop(&id).await {
                    warn!(plugin_id = %id, error = %e, "failed to stop backend during shutdown");
                }
            }
        });
        futures::future::join_all(stops).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::types::Plugin;
    use gantry_core::BackendPlugin;
    use gantry_registry::InMemoryRegistry;
    use gantry_test_utils::{test_descriptor, FakeBackend};

    async fn service_with(
        backend: FakeBackend,
    ) -> (ProcessService, Arc<FakeBackend>, Arc<ErrorTracker>) {
        let registry = Arc::new(InMemoryRegistry::new());
        let backend = Arc::new(backend);
        let id = backend.plugin_id().to_string();
        registry
            .add(Arc::new(Plugin {
                descriptor: test_descriptor(&id),
                backend: backend.clone(),
            }))
            .await
            .unwrap();
        let errors = Arc::new(ErrorTracker::new());
        let service = ProcessService::with_grace(
            registry,
            Arc::clone(&errors),
            Duration::from_millis(50),
        );
        (service, backend, errors)
    }

    #[tokio::test]
    async fn start_unknown_plugin_is_not_found() {
        let registry = Arc::new(InMemoryRegistry::new());
        let service = ProcessService::new(registry, Arc::new(ErrorTracker::new()));
        let err = service.start("ghost").await.unwrap_err();
        assert!(matches!(err, GantryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn start_is_idempotent_when_running() {
        let (service, backend, _) = service_with(FakeBackend::managed("loki")).await;
        service.start("loki").await.unwrap();
        service.start("loki").await.unwrap();
        assert_eq!(backend.start_count(), 1);
        assert_eq!(backend.state(), ProcessState::Running);
    }

    #[tokio::test]
    async fn concurrent_starts_collapse_to_one_launch() {
        let (service, backend, _) = service_with(
            FakeBackend::managed("loki").with_start_delay(Duration::from_millis(20)),
        )
        .await;
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move { service.start("loki").await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(backend.start_count(), 1);
    }

    #[tokio::test]
    async fn decommissioned_plugin_never_starts() {
        let (service, backend, _) = service_with(FakeBackend::managed("loki")).await;
        backend.decommission();

        let err = service.start("loki").await.unwrap_err();
        assert!(matches!(err, GantryError::Unavailable { .. }));
        assert_eq!(backend.start_count(), 0);
    }

    #[tokio::test]
    async fn start_failure_records_error_then_success_clears_it() {
        let (service, _, errors) =
            service_with(FakeBackend::managed("loki").with_failing_start("no binary")).await;

        let err = service.start("loki").await.unwrap_err();
        assert!(matches!(err, GantryError::StartFailure { .. }));
        let snapshot = errors.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].error_code, ErrorCode::StartupFailed);

        // A fresh backend for the same ID starts cleanly and clears the record.
        let (service, _, errors) = service_with(FakeBackend::managed("loki")).await;
        errors.record("loki", ErrorCode::StartupFailed);
        service.start("loki").await.unwrap();
        assert!(errors.snapshot().is_empty());
    }

    #[tokio::test]
    async fn restart_after_exit() {
        let (service, backend, _) = service_with(FakeBackend::managed("loki")).await;
        service.start("loki").await.unwrap();
        service.stop("loki").await.unwrap();
        assert_eq!(backend.state(), ProcessState::Exited);

        // Restart-on-demand from Exited.
        service.start("loki").await.unwrap();
        assert_eq!(backend.state(), ProcessState::Running);
        assert_eq!(backend.start_count(), 2);
    }

    #[tokio::test]
    async fn stop_escalates_to_kill_after_grace() {
        let (service, backend, _) = service_with(
            FakeBackend::managed("loki").with_stop_delay(Duration::from_millis(200)),
        )
        .await;
        service.start("loki").await.unwrap();

        service.stop("loki").await.unwrap();
        assert_eq!(backend.kill_count(), 1);
        assert_eq!(backend.state(), ProcessState::Exited);
    }

    #[tokio::test]
    async fn stop_unknown_plugin_is_noop() {
        let registry = Arc::new(InMemoryRegistry::new());
        let service = ProcessService::new(registry, Arc::new(ErrorTracker::new()));
        service.stop("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn unmanaged_backend_is_never_started() {
        let (service, backend, _) = service_with(FakeBackend::unmanaged("core-plugin")).await;
        service.start("core-plugin").await.unwrap();
        assert_eq!(backend.start_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_stops_everything_despite_failures() {
        let registry = Arc::new(InMemoryRegistry::new());
        let slow = Arc::new(
            FakeBackend::managed("slow").with_stop_delay(Duration::from_millis(200)),
        );
        let quick = Arc::new(FakeBackend::managed("quick"));
        for backend in [Arc::clone(&slow), Arc::clone(&quick)] {
            let id = backend.plugin_id().to_string();
            registry
                .add(Arc::new(Plugin {
                    descriptor: test_descriptor(&id),
                    backend,
                }))
                .await
                .unwrap();
        }
        let service = ProcessService::with_grace(
            registry,
            Arc::new(ErrorTracker::new()),
            Duration::from_millis(50),
        );
        service.start("slow").await.unwrap();
        service.start("quick").await.unwrap();

        service.shutdown().await;
        assert_eq!(slow.state(), ProcessState::Exited);
        assert_eq!(quick.state(), ProcessState::Exited);
        // The slow backend blew its grace period and was killed.
        assert_eq!(slow.kill_count(), 1);
        assert_eq!(quick.kill_count(), 0);
    }
}
