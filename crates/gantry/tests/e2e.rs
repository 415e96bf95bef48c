// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the full plugin pipeline.
//!
//! Each test assembles the real registry, process service, client
//! decorator, and local installer collaborators over temp directories,
//! with fake backends standing in for plugin processes. Tests are
//! independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use backends::BackendMap;
use tokio_util::sync::CancellationToken;

use gantry_client::ClientDecorator;
use gantry_core::types::{
    CompatOpts, DataQuery, DataResponse, ErrorCode, PluginContext, ProcessState,
    QueryDataRequest, QueryDataResponse,
};
use gantry_core::{BackendFactory, BackendPlugin, GantryError, PluginDescriptor};
use gantry_manager::{DirRepo, DiskStore, PluginManager};
use gantry_process::ProcessService;
use gantry_registry::{ErrorTracker, InMemoryRegistry};
use gantry_test_utils::FakeBackend;

/// Lets the factory hand created backends out to test assertions.
mod backends {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use gantry_test_utils::FakeBackend;

    #[derive(Default, Clone)]
    pub struct BackendMap {
        inner: Arc<Mutex<HashMap<String, Arc<FakeBackend>>>>,
    }

    impl BackendMap {
        pub fn insert(&self, id: &str, backend: Arc<FakeBackend>) {
            self.inner
                .lock()
                .unwrap()
                .insert(id.to_string(), backend);
        }

        pub fn get(&self, id: &str) -> Arc<FakeBackend> {
            self.inner.lock().unwrap().get(id).cloned().expect("backend created")
        }
    }
}

/// Factory producing inspectable fake backends.
struct RecordingFactory {
    backends: BackendMap,
    start_delay: Option<Duration>,
    fail_start: bool,
}

impl RecordingFactory {
    fn new(backends: BackendMap) -> Self {
        Self {
            backends,
            start_delay: None,
            fail_start: false,
        }
    }
}

impl BackendFactory for RecordingFactory {
    fn create(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<Arc<dyn BackendPlugin>, GantryError> {
        let mut backend = FakeBackend::managed(&descriptor.id).with_query_data(|req| {
            let mut resp = QueryDataResponse::default();
            for q in &req.queries {
                resp.responses
                    .insert(q.ref_id.clone(), DataResponse::ok(serde_json::json!("pong")));
            }
            Ok(resp)
        });
        if let Some(delay) = self.start_delay {
            backend = backend.with_start_delay(delay);
        }
        if self.fail_start {
            backend = backend.with_failing_start("simulated launch failure");
        }
        let backend = Arc::new(backend);
        self.backends.insert(&descriptor.id, backend.clone());
        Ok(backend)
    }
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

struct Stack {
    manager: Arc<PluginManager>,
    errors: Arc<ErrorTracker>,
    backends: BackendMap,
    plugins_dir: std::path::PathBuf,
    _repo_tmp: tempfile::TempDir,
    _plugins_tmp: tempfile::TempDir,
}

fn seed_repo(root: &std::path::Path) {
    let dir = root.join("loki/1.0.0");
    std::fs::create_dir_all(dir.join("public")).unwrap();
    std::fs::write(dir.join("plugin.toml"), MANIFEST).unwrap();
    std::fs::write(dir.join("loki_backend"), b"#!/bin/sh\nexit 0\n").unwrap();
}

fn stack_with(factory: impl FnOnce(BackendMap) -> RecordingFactory) -> Stack {
    let repo_tmp = tempfile::tempdir().unwrap();
    let plugins_tmp = tempfile::tempdir().unwrap();
    seed_repo(repo_tmp.path());

    let registry = Arc::new(InMemoryRegistry::new());
    let errors = Arc::new(ErrorTracker::new());
    let process = Arc::new(ProcessService::with_grace(
        registry.clone(),
        Arc::clone(&errors),
        Duration::from_millis(100),
    ));
    let client = Arc::new(ClientDecorator::new(registry.clone(), process.clone()));
    let backends = BackendMap::default();
    let manager = Arc::new(PluginManager::new(
        registry,
        process,
        client,
        Arc::new(DirRepo::new(repo_tmp.path())),
        Arc::new(DiskStore::new(plugins_tmp.path())),
        Arc::new(factory(backends.clone())),
        Arc::clone(&errors),
    ));

    Stack {
        manager,
        errors,
        backends,
        plugins_dir: plugins_tmp.path().to_path_buf(),
        _repo_tmp: repo_tmp,
        _plugins_tmp: plugins_tmp,
    }
}

fn query(plugin_id: &str) -> QueryDataRequest {
    QueryDataRequest {
        context: PluginContext::new(plugin_id),
        queries: vec![DataQuery {
            ref_id: "A".into(),
            query: serde_json::json!({"expr": "up"}),
            max_data_points: None,
            interval_ms: None,
        }],
    }
}

#[tokio::test]
async fn install_query_remove_lifecycle() {
    let stack = stack_with(RecordingFactory::new);

    stack
        .manager
        .add("loki", "1.0.0", &CompatOpts::default())
        .await
        .unwrap();

    // Files landed under the plugins dir.
    let installed = stack.plugins_dir.join("loki");
    assert!(installed.join("plugin.toml").is_file());
    assert!(installed.join("loki_backend").is_file());

    // First call lazily starts the backend and routes the query.
    let resp = stack
        .manager
        .query_data(CancellationToken::new(), query("loki"))
        .await
        .unwrap();
    assert_eq!(resp.responses["A"].data, Some(serde_json::json!("pong")));

    let backend = stack.backends.get("loki");
    assert_eq!(backend.state(), ProcessState::Running);
    assert_eq!(backend.start_count(), 1);

    // Second call reuses the running backend.
    stack
        .manager
        .query_data(CancellationToken::new(), query("loki"))
        .await
        .unwrap();
    assert_eq!(backend.start_count(), 1);

    // Remove stops the process, clears the registry, and deletes files.
    stack.manager.remove("loki").await.unwrap();
    assert!(stack.manager.plugin("loki").await.is_none());
    assert!(backend.is_decommissioned());
    assert!(!installed.exists());

    let err = stack
        .manager
        .query_data(CancellationToken::new(), query("loki"))
        .await
        .unwrap_err();
    assert!(matches!(err, GantryError::NotFound { .. }));
}

#[tokio::test]
async fn concurrent_queries_launch_exactly_one_process() {
    let stack = stack_with(|backends| {
        let mut f = RecordingFactory::new(backends);
        f.start_delay = Some(Duration::from_millis(25));
        f
    });
    stack
        .manager
        .add("loki", "1.0.0", &CompatOpts::default())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let manager = Arc::clone(&stack.manager);
        handles.push(tokio::spawn(async move {
            manager
                .query_data(CancellationToken::new(), query("loki"))
                .await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(stack.backends.get("loki").start_count(), 1);
}

#[tokio::test]
async fn start_failure_is_recorded_and_surfaced() {
    let stack = stack_with(|backends| {
        let mut f = RecordingFactory::new(backends);
        f.fail_start = true;
        f
    });
    stack
        .manager
        .add("loki", "1.0.0", &CompatOpts::default())
        .await
        .unwrap();

    let err = stack
        .manager
        .query_data(CancellationToken::new(), query("loki"))
        .await
        .unwrap_err();
    assert!(matches!(err, GantryError::StartFailure { .. }));

    let records = stack.manager.plugin_errors();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].plugin_id, "loki");
    assert_eq!(records[0].error_code, ErrorCode::StartupFailed);

    // The record survives until the plugin is removed.
    stack.manager.remove("loki").await.unwrap();
    assert!(stack.manager.plugin_errors().is_empty());
}

#[tokio::test]
async fn remove_waits_for_an_in_flight_start() {
    let stack = stack_with(|backends| {
        let mut f = RecordingFactory::new(backends);
        f.start_delay = Some(Duration::from_millis(50));
        f
    });
    stack
        .manager
        .add("loki", "1.0.0", &CompatOpts::default())
        .await
        .unwrap();

    // Kick off a query whose lazy start holds the per-plugin lock.
    let manager = Arc::clone(&stack.manager);
    let starter = tokio::spawn(async move {
        let _ = manager
            .query_data(CancellationToken::new(), query("loki"))
            .await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Remove must serialize behind the start rather than racing it.
    stack.manager.remove("loki").await.unwrap();
    starter.await.unwrap();

    assert!(stack.manager.plugin("loki").await.is_none());
    let backend = stack.backends.get("loki");
    assert!(backend.is_decommissioned());
    assert!(backend.stop_count() + backend.kill_count() >= 1);
}

#[tokio::test]
async fn static_routes_follow_the_installed_layout() {
    let stack = stack_with(RecordingFactory::new);
    stack
        .manager
        .add("loki", "1.0.0", &CompatOpts::default())
        .await
        .unwrap();

    let routes = stack.manager.routes().await;
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].plugin_id, "loki");
    assert_eq!(routes[0].directory, stack.plugins_dir.join("loki/public"));
    assert!(routes[0].directory.is_dir());

    stack.errors.record("loki", ErrorCode::Crashed);
    assert_eq!(stack.manager.plugin_errors().len(), 1);
}
