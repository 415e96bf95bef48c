// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plugin manager.
//!
//! Lifecycle: `add` resolves an artifact through the repository, extracts it
//! via the filesystem store, loads its manifest, and registers a backend
//! handle in the `NotStarted` state (processes launch lazily on first
//! invocation). `remove` decommissions the backend, stops the process, and
//! drops the registry and store entries; the stop serializes on the same
//! per-plugin lock as start, so a remove never begins while a start for the
//! same ID is in flight.
//!
//! Data-plane operations check registry existence first: an unknown plugin
//! ID never reaches the process manager or the backend client.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gantry_core::traits::sender::{PacketSender, ResourceSender};
use gantry_core::types::{
    CallResourceRequest, CheckHealthRequest, CheckHealthResult, CollectMetricsRequest,
    CollectMetricsResult, CompatOpts, Plugin, PluginClass, PluginErrorRecord, PluginType,
    PublishStreamRequest, PublishStreamResponse, QueryDataRequest, QueryDataResponse,
    RunStreamRequest, StaticRoute, SubscribeStreamRequest, SubscribeStreamResponse,
};
use gantry_core::{
    BackendClient, BackendFactory, FsStore, GantryError, PluginRepo, ProcessManager, Registry,
};
use gantry_registry::{parse_plugin_manifest, ErrorTracker};

/// Single entry point for plugin lifecycle and invocation.
pub struct PluginManager {
    registry: Arc<dyn Registry>,
    process: Arc<dyn ProcessManager>,
    client: Arc<dyn BackendClient>,
    repo: Arc<dyn PluginRepo>,
    store: Arc<dyn FsStore>,
    factory: Arc<dyn BackendFactory>,
    errors: Arc<ErrorTracker>,
}

impl PluginManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<dyn Registry>,
        process: Arc<dyn ProcessManager>,
        client: Arc<dyn BackendClient>,
        repo: Arc<dyn PluginRepo>,
        store: Arc<dyn FsStore>,
        factory: Arc<dyn BackendFactory>,
        errors: Arc<ErrorTracker>,
    ) -> Self {
        Self {
            registry,
            process,
            client,
            repo,
            store,
            factory,
            errors,
        }
    }

    /// Look up one plugin.
    pub async fn plugin(&self, plugin_id: &str) -> Option<Arc<Plugin>> {
        self.registry.plugin(plugin_id).await
    }

    /// Snapshot of registered plugins, optionally filtered by type.
    /// An empty filter returns everything.
    pub async fn plugins(&self, types: &[PluginType]) -> Vec<Arc<Plugin>> {
        let all = self.registry.plugins().await;
        if types.is_empty() {
            return all;
        }
        all.into_iter()
            .filter(|p| types.contains(&p.descriptor.plugin_type))
            .collect()
    }

    /// Install and register a plugin. The backend is left `NotStarted`;
    /// the first data-plane call launches it.
    pub async fn add(
        &self,
        plugin_id: &str,
        version: &str,
        compat: &CompatOpts,
    ) -> Result<(), GantryError> {
        let archive = self.repo.get_archive(plugin_id, version, compat).await?;
        let extracted = self.store.extract(archive).await?;

        let manifest_path = extracted.dir.join("plugin.toml");
        let manifest_toml =
            tokio::fs::read_to_string(&manifest_path)
                .await
                .map_err(|e| GantryError::Install {
                    plugin_id: plugin_id.to_string(),
                    message: format!("cannot read {}: {e}", manifest_path.display()),
                })?;
        let manifest = parse_plugin_manifest(&manifest_toml)?;
        if manifest.id != plugin_id {
            return Err(GantryError::Install {
                plugin_id: plugin_id.to_string(),
                message: format!("manifest declares id '{}'", manifest.id),
            });
        }

        let descriptor = manifest.into_descriptor(extracted.dir, PluginClass::External);
        let backend = self.factory.create(&descriptor)?;

        // Replacing an existing entry: retire the old backend first so the
        // registry never holds two live entries for one ID.
        if let Some(existing) = self.registry.plugin(plugin_id).await {
            warn!(plugin_id, "replacing existing plugin registration");
            existing.backend.decommission();
            self.process.stop(plugin_id).await?;
        }

        self.registry
            .add(Arc::new(Plugin {
                descriptor,
                backend,
            }))
            .await?;
        self.errors.clear(plugin_id);
        info!(plugin_id, version, "plugin installed");
        Ok(())
    }

    /// Stop, deregister, and delete a plugin. After a successful remove no
    /// process for the plugin is left running.
    pub async fn remove(&self, plugin_id: &str) -> Result<(), GantryError> {
        let plugin = self
            .registry
            .plugin(plugin_id)
            .await
            .ok_or_else(|| GantryError::not_found(plugin_id))?;

        // Decommission before stopping so a racing data-plane call cannot
        // relaunch the process between the stop and the registry removal.
        plugin.backend.decommission();
        self.process.stop(plugin_id).await?;

        self.registry.remove(plugin_id).await?;
        self.store.remove(plugin_id).await?;
        self.errors.clear(plugin_id);
        info!(plugin_id, "plugin removed");
        Ok(())
    }

    /// Current snapshot of plugin error records.
    pub fn plugin_errors(&self) -> Vec<PluginErrorRecord> {
        self.errors.snapshot()
    }

    /// Static routes for plugins declaring a static asset directory.
    pub async fn routes(&self) -> Vec<StaticRoute> {
        self.registry
            .plugins()
            .await
            .iter()
            .filter_map(|p| {
                p.descriptor.static_dir.as_ref().map(|dir| StaticRoute {
                    plugin_id: p.id().to_string(),
                    directory: dir.clone(),
                })
            })
            .collect()
    }

    /// Stop all plugin backends. Used at process-wide teardown.
    pub async fn shutdown(&self) {
        self.process.shutdown().await;
    }

    async fn ensure_exists(&self, plugin_id: &str) -> Result<(), GantryError> {
        if self.registry.plugin(plugin_id).await.is_none() {
            return Err(GantryError::not_found(plugin_id));
        }
        Ok(())
    }

    pub async fn query_data(
        &self,
        ctx: CancellationToken,
        req: QueryDataRequest,
    ) -> Result<QueryDataResponse, GantryError> {
        self.ensure_exists(&req.context.plugin_id).await?;
        self.client.query_data(ctx, req).await
    }

    pub async fn call_resource(
        &self,
        ctx: CancellationToken,
        req: CallResourceRequest,
        sender: Arc<dyn ResourceSender>,
    ) -> Result<(), GantryError> {
        self.ensure_exists(&req.context.plugin_id).await?;
        self.client.call_resource(ctx, req, sender).await
    }

    pub async fn check_health(
        &self,
        ctx: CancellationToken,
        req: CheckHealthRequest,
    ) -> Result<CheckHealthResult, GantryError> {
        self.ensure_exists(&req.context.plugin_id).await?;
        self.client.check_health(ctx, req).await
    }

    pub async fn collect_metrics(
        &self,
        ctx: CancellationToken,
        req: CollectMetricsRequest,
    ) -> Result<CollectMetricsResult, GantryError> {
        self.ensure_exists(&req.context.plugin_id).await?;
        self.client.collect_metrics(ctx, req).await
    }

    pub async fn subscribe_stream(
        &self,
        ctx: CancellationToken,
        req: SubscribeStreamRequest,
    ) -> Result<SubscribeStreamResponse, GantryError> {
        self.ensure_exists(&req.context.plugin_id).await?;
        self.client.subscribe_stream(ctx, req).await
    }

    pub async fn publish_stream(
        &self,
        ctx: CancellationToken,
        req: PublishStreamRequest,
    ) -> Result<PublishStreamResponse, GantryError> {
        self.ensure_exists(&req.context.plugin_id).await?;
        self.client.publish_stream(ctx, req).await
    }

    pub async fn run_stream(
        &self,
        ctx: CancellationToken,
        req: RunStreamRequest,
        sender: Arc<dyn PacketSender>,
    ) -> Result<(), GantryError> {
        self.ensure_exists(&req.context.plugin_id).await?;
        self.client.run_stream(ctx, req, sender).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use gantry_client::ClientDecorator;
    use gantry_core::types::{DataQuery, DataResponse, PluginContext, ProcessState};
    use gantry_core::BackendPlugin;
    use gantry_registry::InMemoryRegistry;
    use gantry_test_utils::{FakeBackend, FakeFsStore, FakePluginRepo, FakeProcessManager};

    /// Factory producing fake backends that echo query data.
    struct FakeFactory;

    impl BackendFactory for FakeFactory {
        fn create(
            &self,
            descriptor: &gantry_core::PluginDescriptor,
        ) -> Result<Arc<dyn BackendPlugin>, GantryError> {
            let backend = FakeBackend::managed(&descriptor.id).with_query_data(|req| {
                let mut resp = QueryDataResponse::default();
                for q in &req.queries {
                    resp.responses
                        .insert(q.ref_id.clone(), DataResponse::ok(serde_json::json!("ok")));
                }
                Ok(resp)
            });
            Ok(Arc::new(backend))
        }
    }

    struct Fixture {
        manager: PluginManager,
        registry: Arc<InMemoryRegistry>,
        process: Arc<FakeProcessManager>,
        repo: Arc<FakePluginRepo>,
        store: Arc<FakeFsStore>,
        _tmp: tempfile::TempDir,
    }

    const MANIFEST: &str = r#"
[plugin]
id = "loki"
version = "1.0.0"
type = "datasource"
executable = "loki_backend"
static_dir = "public"

[capabilities]
query = true
"#;

    fn write_manifest(dir: &std::path::Path, plugin_id: &str, toml: &str) {
        let plugin_dir = dir.join(plugin_id);
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join("plugin.toml"), toml).unwrap();
    }

    async fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(tmp.path(), "loki", MANIFEST);

        let registry = Arc::new(InMemoryRegistry::new());
        let process = Arc::new(FakeProcessManager::new());
        let errors = Arc::new(ErrorTracker::new());
        let client = Arc::new(ClientDecorator::new(registry.clone(), process.clone()));
        let repo = Arc::new(FakePluginRepo::new().with_archive("loki", "1.0.0", vec![0xCA]));
        let store = Arc::new(FakeFsStore::new(tmp.path()));

        let manager = PluginManager::new(
            registry.clone(),
            process.clone(),
            client,
            repo.clone(),
            store.clone(),
            Arc::new(FakeFactory),
            errors,
        );
        Fixture {
            manager,
            registry,
            process,
            repo,
            store,
            _tmp: tmp,
        }
    }

    #[tokio::test]
    async fn add_then_get_then_remove_round_trip() {
        let f = fixture().await;
        f.manager
            .add("loki", "1.0.0", &CompatOpts::default())
            .await
            .unwrap();

        let plugin = f.manager.plugin("loki").await.unwrap();
        assert_eq!(plugin.id(), "loki");
        assert_eq!(plugin.descriptor.version, "1.0.0");
        assert_eq!(plugin.backend.state(), ProcessState::NotStarted);

        f.manager.remove("loki").await.unwrap();
        assert!(f.manager.plugin("loki").await.is_none());
        assert!(!f.store.contains("loki"));
        assert_eq!(f.process.stop_count("loki"), 1);
    }

    #[tokio::test]
    async fn add_does_not_start_the_process() {
        let f = fixture().await;
        f.manager
            .add("loki", "1.0.0", &CompatOpts::default())
            .await
            .unwrap();
        assert_eq!(f.process.start_count("loki"), 0);
    }

    #[tokio::test]
    async fn add_passes_compat_opts_to_the_repository() {
        let f = fixture().await;
        let compat = CompatOpts {
            host_version: "10.2.0".into(),
            os: "linux".into(),
            arch: "arm64".into(),
        };
        f.manager.add("loki", "1.0.0", &compat).await.unwrap();
        assert_eq!(*f.repo.requested.get("loki").unwrap(), compat);
    }

    #[tokio::test]
    async fn add_unknown_version_fails_without_registering() {
        let f = fixture().await;
        let err = f
            .manager
            .add("loki", "9.9.9", &CompatOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GantryError::Install { .. }));
        assert!(f.manager.plugin("loki").await.is_none());
    }

    #[tokio::test]
    async fn add_rejects_manifest_id_mismatch() {
        let f = fixture().await;
        write_manifest(
            f._tmp.path(),
            "impostor",
            r#"
[plugin]
id = "somebody-else"
version = "1.0.0"
type = "datasource"
"#,
        );
        f.repo.add_archive("impostor", "1.0.0", vec![0xFE]);
        let err = f
            .manager
            .add("impostor", "1.0.0", &CompatOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GantryError::Install { .. }));
    }

    #[tokio::test]
    async fn re_add_replaces_and_retires_the_old_backend() {
        let f = fixture().await;
        f.manager
            .add("loki", "1.0.0", &CompatOpts::default())
            .await
            .unwrap();
        let old = f.manager.plugin("loki").await.unwrap();

        f.manager
            .add("loki", "1.0.0", &CompatOpts::default())
            .await
            .unwrap();
        assert_eq!(f.registry.len(), 1);
        assert!(old.backend.is_decommissioned());
        assert_eq!(f.process.stop_count("loki"), 1);

        let new = f.manager.plugin("loki").await.unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert!(!new.backend.is_decommissioned());
    }

    #[tokio::test]
    async fn remove_unknown_plugin_is_not_found() {
        let f = fixture().await;
        let err = f.manager.remove("ghost").await.unwrap_err();
        assert!(matches!(err, GantryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn data_plane_call_for_unknown_plugin_never_reaches_process_or_backend() {
        let f = fixture().await;
        let err = f
            .manager
            .query_data(
                CancellationToken::new(),
                QueryDataRequest {
                    context: PluginContext::new("ghost"),
                    queries: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GantryError::NotFound { .. }));
        assert_eq!(f.process.total_calls(), 0);
    }

    #[tokio::test]
    async fn data_plane_delegates_through_the_client() {
        let f = fixture().await;
        f.manager
            .add("loki", "1.0.0", &CompatOpts::default())
            .await
            .unwrap();

        let resp = f
            .manager
            .query_data(
                CancellationToken::new(),
                QueryDataRequest {
                    context: PluginContext::new("loki"),
                    queries: vec![DataQuery {
                        ref_id: "A".into(),
                        query: serde_json::json!({"expr": "up"}),
                        max_data_points: None,
                        interval_ms: None,
                    }],
                },
            )
            .await
            .unwrap();
        assert!(resp.responses["A"].error.is_none());
        assert_eq!(f.process.start_count("loki"), 1);
    }

    #[tokio::test]
    async fn routes_lists_only_plugins_with_static_dirs() {
        let f = fixture().await;
        f.manager
            .add("loki", "1.0.0", &CompatOpts::default())
            .await
            .unwrap();

        let routes = f.manager.routes().await;
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].plugin_id, "loki");
        assert!(routes[0].directory.ends_with("public"));
    }

    #[tokio::test]
    async fn type_filter_on_plugins() {
        let f = fixture().await;
        f.manager
            .add("loki", "1.0.0", &CompatOpts::default())
            .await
            .unwrap();

        assert_eq!(f.manager.plugins(&[]).await.len(), 1);
        assert_eq!(
            f.manager.plugins(&[PluginType::DataSource]).await.len(),
            1
        );
        assert!(f.manager.plugins(&[PluginType::Panel]).await.is_empty());
    }

    /// Counter-instrumented backend to prove decommissioned plugins never
    /// see data-plane traffic.
    #[tokio::test]
    async fn decommissioned_plugin_gets_unavailable_without_backend_traffic() {
        let f = fixture().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_handler = Arc::clone(&calls);
        let backend = Arc::new(FakeBackend::managed("tempo").with_query_data(move |_| {
            calls_in_handler.fetch_add(1, Ordering::SeqCst);
            Ok(QueryDataResponse::default())
        }));
        f.registry
            .add(Arc::new(Plugin {
                descriptor: gantry_test_utils::test_descriptor("tempo"),
                backend: backend.clone(),
            }))
            .await
            .unwrap();
        backend.decommission();

        let err = f
            .manager
            .query_data(
                CancellationToken::new(),
                QueryDataRequest {
                    context: PluginContext::new("tempo"),
                    queries: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GantryError::Unavailable { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.process.start_count("tempo"), 0);
    }
}
