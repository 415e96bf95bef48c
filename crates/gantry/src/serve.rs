// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gantry serve` command implementation.
//!
//! Wires the registry, process service, backend client, installer
//! collaborators, and the gateway together, re-registers already-installed
//! plugins, and serves until a shutdown signal arrives. Backends are
//! stopped (bounded by the configured grace period) before the process
//! exits.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use gantry_client::ClientDecorator;
use gantry_config::GantryConfig;
use gantry_core::types::{Plugin, PluginClass};
use gantry_core::{BackendFactory, GantryError, Registry, SourceLister};
use gantry_gateway::{GatewayServer, ServerConfig};
use gantry_manager::{DirRepo, DiskStore, InstalledPluginsLister, PluginManager};
use gantry_process::{ProcessService, SubprocessFactory};
use gantry_registry::{parse_plugin_manifest, ErrorTracker, InMemoryRegistry};

use crate::signals;

/// Initialize the tracing subscriber from the configured level.
///
/// `RUST_LOG` takes precedence when set.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Load one installed plugin directory into a registry entry.
async fn load_installed(
    path: &std::path::Path,
    class: PluginClass,
    factory: &dyn BackendFactory,
) -> Result<Arc<Plugin>, GantryError> {
    let manifest_toml = tokio::fs::read_to_string(path.join("plugin.toml"))
        .await
        .map_err(|e| GantryError::Config(format!("cannot read {}: {e}", path.display())))?;
    let manifest = parse_plugin_manifest(&manifest_toml)?;
    let descriptor = manifest.into_descriptor(path.to_path_buf(), class);
    let backend = factory.create(&descriptor)?;
    Ok(Arc::new(Plugin {
        descriptor,
        backend,
    }))
}

/// Re-register plugins found under the plugins directory. Backends are left
/// `NotStarted`; a broken manifest skips that plugin rather than failing
/// startup.
async fn bootstrap_installed(
    lister: &dyn SourceLister,
    registry: &dyn Registry,
    factory: &dyn BackendFactory,
) {
    let mut count = 0usize;
    for source in lister.list().await {
        for path in &source.paths {
            match load_installed(path, source.class, factory).await {
                Ok(plugin) => {
                    let id = plugin.id().to_string();
                    if let Err(e) = registry.add(plugin).await {
                        warn!(plugin_id = %id, error = %e, "failed to register installed plugin");
                    } else {
                        count += 1;
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unloadable plugin");
                }
            }
        }
    }
    info!(count, "installed plugins registered");
}

/// Runs the `gantry serve` command.
pub async fn run_serve(config: GantryConfig) -> Result<(), GantryError> {
    init_tracing(&config.log.level);
    gantry_process::metrics::register_metrics();

    info!("starting gantry serve");

    let registry = Arc::new(InMemoryRegistry::new());
    let errors = Arc::new(ErrorTracker::new());
    let process = Arc::new(ProcessService::with_grace(
        registry.clone(),
        Arc::clone(&errors),
        Duration::from_secs(config.plugins.shutdown_grace_secs),
    ));
    let client = Arc::new(ClientDecorator::new(registry.clone(), process.clone()));
    let factory = Arc::new(SubprocessFactory::new());

    let manager = Arc::new(PluginManager::new(
        registry.clone(),
        process,
        client,
        Arc::new(DirRepo::new(&config.plugins.repo_dir)),
        Arc::new(DiskStore::new(&config.plugins.dir)),
        factory.clone(),
        errors,
    ));

    let lister = InstalledPluginsLister::new(&config.plugins.dir);
    bootstrap_installed(&lister, registry.as_ref(), factory.as_ref()).await;

    let token = signals::install_signal_handler();
    let mut server = GatewayServer::new(
        ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
            host_version: config.gateway.host_version.clone(),
        },
        Arc::clone(&manager),
        token.clone(),
    );
    server.start().await?;

    let run_result = server.run().await;
    server.stop();

    // Whatever ended the run loop, backends must not outlive the gateway.
    manager.shutdown().await;

    match run_result {
        Err(GantryError::Cancelled) => {
            info!("shutdown complete");
            Ok(())
        }
        other => other,
    }
}
