// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire DTOs and their conversions to and from the internal types.
//!
//! The gateway never hands internal structs to serde directly; every RPC
//! decodes into one of these DTOs and re-encodes from one, keeping the wire
//! format independent of internal type evolution. Binary resource bodies
//! travel base64-encoded.

use std::collections::HashMap;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use gantry_core::types::{
    CallResourceRequest, CallResourceResponse, CheckHealthRequest, CheckHealthResult,
    CollectMetricsRequest, CollectMetricsResult, DataQuery, DataResponse, PluginContext,
    PluginDescriptor, PluginErrorRecord, PublishStreamRequest, PublishStreamResponse,
    QueryDataRequest, QueryDataResponse, RunStreamRequest, StaticRoute, StreamAccess,
    StreamPacket, SubscribeStreamRequest, SubscribeStreamResponse,
};
use gantry_core::PluginType;

/// Wire form of a plugin descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePlugin {
    pub id: String,
    pub version: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,
}

impl From<&PluginDescriptor> for WirePlugin {
    fn from(d: &PluginDescriptor) -> Self {
        Self {
            id: d.id.clone(),
            version: d.version.clone(),
            plugin_type: d.plugin_type.to_string(),
            class: d.class.to_string(),
            static_dir: d
                .static_dir
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireAddPluginRequest {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
}

#[derive(Debug, Serialize)]
pub struct WireOkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct WirePluginList {
    pub plugins: Vec<WirePlugin>,
}

#[derive(Debug, Serialize)]
pub struct WirePluginError {
    pub plugin_id: String,
    pub error_code: String,
}

impl From<&PluginErrorRecord> for WirePluginError {
    fn from(r: &PluginErrorRecord) -> Self {
        Self {
            plugin_id: r.plugin_id.clone(),
            error_code: r.error_code.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WireStaticRoute {
    pub plugin_id: String,
    pub directory: String,
}

impl From<&StaticRoute> for WireStaticRoute {
    fn from(r: &StaticRoute) -> Self {
        Self {
            plugin_id: r.plugin_id.clone(),
            directory: r.directory.to_string_lossy().into_owned(),
        }
    }
}

/// Parse a comma-separated type filter, silently dropping invalid values.
pub fn parse_type_filter(raw: Option<&str>) -> Vec<PluginType> {
    raw.map(|s| {
        s.split(',')
            .filter_map(|t| PluginType::from_str(t.trim()).ok())
            .collect()
    })
    .unwrap_or_default()
}

// --- Data-plane envelopes ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePluginContext {
    pub plugin_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl From<WirePluginContext> for PluginContext {
    fn from(w: WirePluginContext) -> Self {
        Self {
            plugin_id: w.plugin_id,
            user: w.user,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDataQuery {
    pub ref_id: String,
    pub query: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_data_points: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireQueryDataRequest {
    pub plugin_context: WirePluginContext,
    pub queries: Vec<WireDataQuery>,
}

impl From<WireQueryDataRequest> for QueryDataRequest {
    fn from(w: WireQueryDataRequest) -> Self {
        Self {
            context: w.plugin_context.into(),
            queries: w
                .queries
                .into_iter()
                .map(|q| DataQuery {
                    ref_id: q.ref_id,
                    query: q.query,
                    max_data_points: q.max_data_points,
                    interval_ms: q.interval_ms,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDataResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireQueryDataResponse {
    pub responses: HashMap<String, WireDataResponse>,
}

impl From<QueryDataResponse> for WireQueryDataResponse {
    fn from(r: QueryDataResponse) -> Self {
        Self {
            responses: r
                .responses
                .into_iter()
                .map(|(ref_id, resp)| {
                    (
                        ref_id,
                        WireDataResponse {
                            data: resp.data,
                            error: resp.error,
                        },
                    )
                })
                .collect(),
        }
    }
}

impl From<DataResponse> for WireDataResponse {
    fn from(r: DataResponse) -> Self {
        Self {
            data: r.data,
            error: r.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireCallResourceRequest {
    pub plugin_context: WirePluginContext,
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Base64-encoded request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl WireCallResourceRequest {
    pub fn into_internal(self) -> Result<CallResourceRequest, base64::DecodeError> {
        let body = match self.body {
            Some(b) => BASE64.decode(b)?,
            None => Vec::new(),
        };
        Ok(CallResourceRequest {
            context: self.plugin_context.into(),
            path: self.path,
            method: self.method,
            headers: self.headers,
            body,
        })
    }
}

/// One SSE chunk of a streamed resource response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResourceChunk {
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Base64-encoded chunk body.
    pub body: String,
}

impl From<CallResourceResponse> for WireResourceChunk {
    fn from(r: CallResourceResponse) -> Self {
        Self {
            status: r.status,
            headers: r.headers,
            body: BASE64.encode(r.body),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireCheckHealthRequest {
    pub plugin_context: WirePluginContext,
}

impl From<WireCheckHealthRequest> for CheckHealthRequest {
    fn from(w: WireCheckHealthRequest) -> Self {
        Self {
            context: w.plugin_context.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireCheckHealthResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_details: Option<serde_json::Value>,
}

impl From<CheckHealthResult> for WireCheckHealthResponse {
    fn from(r: CheckHealthResult) -> Self {
        Self {
            status: r.status.to_string(),
            message: r.message,
            json_details: r.json_details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireCollectMetricsRequest {
    pub plugin_context: WirePluginContext,
}

impl From<WireCollectMetricsRequest> for CollectMetricsRequest {
    fn from(w: WireCollectMetricsRequest) -> Self {
        Self {
            context: w.plugin_context.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireCollectMetricsResponse {
    /// Prometheus exposition text.
    pub prometheus: String,
}

impl From<CollectMetricsResult> for WireCollectMetricsResponse {
    fn from(r: CollectMetricsResult) -> Self {
        Self {
            prometheus: String::from_utf8_lossy(&r.prometheus).into_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSubscribeStreamRequest {
    pub plugin_context: WirePluginContext,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<WireSubscribeStreamRequest> for SubscribeStreamRequest {
    fn from(w: WireSubscribeStreamRequest) -> Self {
        Self {
            context: w.plugin_context.into(),
            path: w.path,
            data: w.data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSubscribeStreamResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_data: Option<serde_json::Value>,
}

impl From<SubscribeStreamResponse> for WireSubscribeStreamResponse {
    fn from(r: SubscribeStreamResponse) -> Self {
        Self {
            status: stream_access_str(r.status),
            initial_data: r.initial_data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePublishStreamRequest {
    pub plugin_context: WirePluginContext,
    pub path: String,
    pub data: serde_json::Value,
}

impl From<WirePublishStreamRequest> for PublishStreamRequest {
    fn from(w: WirePublishStreamRequest) -> Self {
        Self {
            context: w.plugin_context.into(),
            path: w.path,
            data: w.data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePublishStreamResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<PublishStreamResponse> for WirePublishStreamResponse {
    fn from(r: PublishStreamResponse) -> Self {
        Self {
            status: stream_access_str(r.status),
            data: r.data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRunStreamRequest {
    pub plugin_context: WirePluginContext,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<WireRunStreamRequest> for RunStreamRequest {
    fn from(w: WireRunStreamRequest) -> Self {
        Self {
            context: w.plugin_context.into(),
            path: w.path,
            data: w.data,
        }
    }
}

/// One SSE packet of a running stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireStreamPacket {
    pub data: serde_json::Value,
}

impl From<StreamPacket> for WireStreamPacket {
    fn from(p: StreamPacket) -> Self {
        Self { data: p.data }
    }
}

fn stream_access_str(access: StreamAccess) -> String {
    access.to_string()
}

/// Error body returned for failed RPCs.
#[derive(Debug, Serialize, Deserialize)]
pub struct WireError {
    pub error: String,
}
