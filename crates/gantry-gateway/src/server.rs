// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up the management and data-plane routes and the server lifecycle:
//! `start` binds the listener, `run` serves until the shutdown token is
//! cancelled and returns the cancellation cause, `stop` is the post-run
//! hook for the enclosing supervisor.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use gantry_core::types::CompatOpts;
use gantry_core::GantryError;
use gantry_manager::PluginManager;

use crate::handlers;

/// Gateway server configuration (mirrors `ServerConfig` from gantry-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind. Port 0 picks a free port.
    pub port: u16,
    /// Host version reported in compatibility lookups for AddPlugin.
    pub host_version: String,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The plugin manager facade every handler routes through.
    pub manager: Arc<PluginManager>,
    /// Cancelled at server shutdown; per-request tokens derive from it.
    pub shutdown: CancellationToken,
    /// Host version for compatibility lookups.
    pub host_version: String,
}

impl GatewayState {
    /// Compatibility tuple for an AddPlugin request.
    pub fn compat_opts(&self, os: &str, arch: &str) -> CompatOpts {
        CompatOpts {
            host_version: self.host_version.clone(),
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }
}

/// Build the gateway router. Exposed for in-process tests.
pub fn router(state: GatewayState) -> Router {
    let management = Router::new()
        .route(
            "/api/plugins",
            get(handlers::get_plugins).post(handlers::add_plugin),
        )
        .route("/api/plugins/errors", get(handlers::plugin_errors))
        .route("/api/plugins/static-routes", get(handlers::static_routes))
        .route(
            "/api/plugins/{id}",
            get(handlers::get_plugin).delete(handlers::remove_plugin),
        );

    let data_plane = Router::new()
        .route("/api/data/query", post(handlers::query_data))
        .route("/api/data/resource", post(handlers::call_resource))
        .route("/api/data/health", post(handlers::check_health))
        .route("/api/data/metrics", post(handlers::collect_metrics))
        .route("/api/stream/subscribe", post(handlers::subscribe_stream))
        .route("/api/stream/publish", post(handlers::publish_stream))
        .route("/api/stream/run", post(handlers::run_stream));

    Router::new()
        .merge(management)
        .merge(data_plane)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The gateway server with a start/run/stop lifecycle.
pub struct GatewayServer {
    config: ServerConfig,
    state: GatewayState,
    listener: Option<TcpListener>,
}

impl GatewayServer {
    pub fn new(config: ServerConfig, manager: Arc<PluginManager>, shutdown: CancellationToken) -> Self {
        let state = GatewayState {
            manager,
            shutdown,
            host_version: config.host_version.clone(),
        };
        Self {
            config,
            state,
            listener: None,
        }
    }

    /// Bind the listener. Returns the bound address (useful with port 0).
    pub async fn start(&mut self) -> Result<SocketAddr, GantryError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            GantryError::Internal(format!("failed to bind gateway to {addr}: {e}"))
        })?;
        let local = listener
            .local_addr()
            .map_err(|e| GantryError::Internal(format!("listener address: {e}")))?;
        self.listener = Some(listener);
        info!(%local, "gateway listening");
        Ok(local)
    }

    /// Serve until the shutdown token is cancelled. Returns the cancellation
    /// cause once the in-flight connections have drained.
    pub async fn run(&mut self) -> Result<(), GantryError> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| GantryError::Internal("gateway run called before start".into()))?;
        let app = router(self.state.clone());
        let token = self.state.shutdown.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(token.clone().cancelled_owned())
            .await
            .map_err(|e| GantryError::Internal(format!("gateway server error: {e}")))?;

        if token.is_cancelled() {
            Err(GantryError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Post-run hook; the listener is already closed when this runs.
    pub fn stop(&self) {
        info!("gateway stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compat_opts_carry_the_host_version() {
        let state_version = "10.2.0";
        let state = GatewayState {
            manager: crate::tests_support::empty_manager(),
            shutdown: CancellationToken::new(),
            host_version: state_version.to_string(),
        };
        let compat = state.compat_opts("linux", "amd64");
        assert_eq!(compat.host_version, "10.2.0");
        assert_eq!(compat.os, "linux");
        assert_eq!(compat.arch, "amd64");
    }
}
