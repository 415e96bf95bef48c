// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway RPC surface.
//!
//! Management handlers cover plugin CRUD, error records, and static routes;
//! unary data-plane handlers decode the wire envelope, invoke the manager,
//! and re-encode the result. No business logic lives here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::warn;

use gantry_core::GantryError;

use crate::server::GatewayState;
use crate::sse;
use crate::wire::{
    parse_type_filter, WireAddPluginRequest, WireCallResourceRequest, WireCheckHealthRequest,
    WireCheckHealthResponse, WireCollectMetricsRequest, WireCollectMetricsResponse, WireError,
    WireOkResponse, WirePlugin, WirePluginError, WirePluginList, WirePublishStreamRequest,
    WirePublishStreamResponse, WireQueryDataRequest, WireQueryDataResponse, WireRunStreamRequest,
    WireStaticRoute, WireSubscribeStreamRequest, WireSubscribeStreamResponse,
};

/// Map an internal error onto the wire representation.
pub fn error_response(err: GantryError) -> Response {
    if !err.is_expected() {
        warn!(error = %err, "request failed");
    }
    let status = match &err {
        GantryError::NotFound { .. } => StatusCode::NOT_FOUND,
        GantryError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        GantryError::MethodNotImplemented => StatusCode::NOT_IMPLEMENTED,
        // Non-standard "client closed request", the closest fit for a
        // caller-side cancellation.
        GantryError::Cancelled => {
            StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        GantryError::Install { .. } | GantryError::Config(_) => StatusCode::BAD_REQUEST,
        GantryError::StartFailure { .. }
        | GantryError::Transport { .. }
        | GantryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(WireError {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// --- Management surface ---

/// GET /api/plugins/{id}
pub async fn get_plugin(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.manager.plugin(&id).await {
        Some(plugin) => Json(WirePlugin::from(&plugin.descriptor)).into_response(),
        None => error_response(GantryError::not_found(&id)),
    }
}

#[derive(Debug, Deserialize)]
pub struct PluginsQuery {
    /// Comma-separated type filter; invalid values are dropped, not rejected.
    #[serde(default)]
    pub types: Option<String>,
}

/// GET /api/plugins?types=datasource,app
pub async fn get_plugins(
    State(state): State<GatewayState>,
    Query(query): Query<PluginsQuery>,
) -> Response {
    let types = parse_type_filter(query.types.as_deref());
    let plugins = state.manager.plugins(&types).await;
    Json(WirePluginList {
        plugins: plugins
            .iter()
            .map(|p| WirePlugin::from(&p.descriptor))
            .collect(),
    })
    .into_response()
}

/// POST /api/plugins
pub async fn add_plugin(
    State(state): State<GatewayState>,
    Json(body): Json<WireAddPluginRequest>,
) -> Response {
    let compat = state.compat_opts(&body.os, &body.arch);
    match state.manager.add(&body.id, &body.version, &compat).await {
        Ok(()) => Json(WireOkResponse { ok: true }).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/plugins/{id}
pub async fn remove_plugin(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.manager.remove(&id).await {
        Ok(()) => Json(WireOkResponse { ok: true }).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/plugins/errors
pub async fn plugin_errors(State(state): State<GatewayState>) -> Response {
    let errors: Vec<WirePluginError> = state
        .manager
        .plugin_errors()
        .iter()
        .map(WirePluginError::from)
        .collect();
    Json(errors).into_response()
}

/// GET /api/plugins/static-routes
pub async fn static_routes(State(state): State<GatewayState>) -> Response {
    let routes: Vec<WireStaticRoute> = state
        .manager
        .routes()
        .await
        .iter()
        .map(WireStaticRoute::from)
        .collect();
    Json(routes).into_response()
}

// --- Unary data-plane surface ---

/// POST /api/data/query
pub async fn query_data(
    State(state): State<GatewayState>,
    Json(body): Json<WireQueryDataRequest>,
) -> Response {
    let token = state.shutdown.child_token();
    match state.manager.query_data(token, body.into()).await {
        Ok(resp) => Json(WireQueryDataResponse::from(resp)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/data/resource (SSE response)
pub async fn call_resource(
    State(state): State<GatewayState>,
    Json(body): Json<WireCallResourceRequest>,
) -> Response {
    let req = match body.into_internal() {
        Ok(req) => req,
        Err(e) => {
            return error_response(GantryError::Config(format!("invalid body encoding: {e}")))
        }
    };
    sse::stream_resource(state, req).await.into_response()
}

/// POST /api/data/health
pub async fn check_health(
    State(state): State<GatewayState>,
    Json(body): Json<WireCheckHealthRequest>,
) -> Response {
    let token = state.shutdown.child_token();
    match state.manager.check_health(token, body.into()).await {
        Ok(resp) => Json(WireCheckHealthResponse::from(resp)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/data/metrics
pub async fn collect_metrics(
    State(state): State<GatewayState>,
    Json(body): Json<WireCollectMetricsRequest>,
) -> Response {
    let token = state.shutdown.child_token();
    match state.manager.collect_metrics(token, body.into()).await {
        Ok(resp) => Json(WireCollectMetricsResponse::from(resp)).into_response(),
        Err(e) => error_response(e),
    }
}

// --- Stream surface ---

/// POST /api/stream/subscribe
pub async fn subscribe_stream(
    State(state): State<GatewayState>,
    Json(body): Json<WireSubscribeStreamRequest>,
) -> Response {
    let token = state.shutdown.child_token();
    match state.manager.subscribe_stream(token, body.into()).await {
        Ok(resp) => Json(WireSubscribeStreamResponse::from(resp)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/stream/publish
pub async fn publish_stream(
    State(state): State<GatewayState>,
    Json(body): Json<WirePublishStreamRequest>,
) -> Response {
    let token = state.shutdown.child_token();
    match state.manager.publish_stream(token, body.into()).await {
        Ok(resp) => Json(WirePublishStreamResponse::from(resp)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/stream/run (SSE response)
pub async fn run_stream(
    State(state): State<GatewayState>,
    Json(body): Json<WireRunStreamRequest>,
) -> Response {
    sse::stream_run(state, body.into()).await.into_response()
}
