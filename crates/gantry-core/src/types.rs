// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Gantry workspace.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::traits::backend::BackendPlugin;

/// The kind of capability surface a plugin provides.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    DataSource,
    Panel,
    App,
    Renderer,
    SecretsManager,
}

/// Provenance of a plugin installation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PluginClass {
    /// Shipped with the host binary.
    Core,
    /// Distributed alongside the host but separately packaged.
    Bundled,
    /// Installed by the operator from a plugin repository.
    External,
}

/// Which of the data-plane capabilities a plugin declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub query: bool,
    #[serde(default)]
    pub resource: bool,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub health: bool,
    #[serde(default)]
    pub metrics: bool,
}

/// Static metadata for an installed plugin. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Globally unique plugin identifier (e.g., "loki-datasource").
    pub id: String,
    /// Semantic version of the installed artifact.
    pub version: String,
    pub plugin_type: PluginType,
    pub class: PluginClass,
    /// Directory the plugin was extracted into.
    pub path: PathBuf,
    pub capabilities: Capabilities,
    /// Directory of static frontend assets, if the plugin ships any.
    pub static_dir: Option<PathBuf>,
    /// Backend executable name relative to `path`. `None` means the plugin
    /// has no backend process of its own.
    pub executable: Option<String>,
}

impl PluginDescriptor {
    /// Whether this plugin requires a managed backend process.
    pub fn has_backend(&self) -> bool {
        self.executable.is_some()
    }
}

/// A registered plugin: descriptor plus its live backend handle.
pub struct Plugin {
    pub descriptor: PluginDescriptor,
    pub backend: Arc<dyn BackendPlugin>,
}

impl Plugin {
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("descriptor", &self.descriptor)
            .field("state", &self.backend.state())
            .finish()
    }
}

/// Lifecycle state of a plugin's backend process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProcessState {
    NotStarted,
    Starting,
    Running,
    Exited,
    /// Terminal. A decommissioned plugin is never started again.
    Decommissioned,
}

/// Why a plugin error record was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    StartupFailed,
    Crashed,
}

/// Retained record of a plugin failure, for introspection until the plugin
/// is successfully restarted or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginErrorRecord {
    pub plugin_id: String,
    pub error_code: ErrorCode,
}

/// Mapping from a plugin to the directory its static assets are served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRoute {
    pub plugin_id: String,
    pub directory: PathBuf,
}

/// Compatibility tuple used to select a plugin artifact version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatOpts {
    pub host_version: String,
    pub os: String,
    pub arch: String,
}

/// Identifies the plugin (and optionally the calling user) a data-plane
/// request targets. Carried inside every request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginContext {
    pub plugin_id: String,
    #[serde(default)]
    pub user: Option<String>,
}

impl PluginContext {
    pub fn new(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            user: None,
        }
    }
}

/// A single query inside a [`QueryDataRequest`] batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQuery {
    /// Caller-supplied reference ID; responses are keyed by it.
    pub ref_id: String,
    /// Opaque query payload, interpreted by the plugin.
    pub query: serde_json::Value,
    #[serde(default)]
    pub max_data_points: Option<u64>,
    #[serde(default)]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDataRequest {
    pub context: PluginContext,
    pub queries: Vec<DataQuery>,
}

/// Result for one query in a batch. A failed sub-query carries `error`
/// while its siblings still carry data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DataResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Per-ref-ID responses for a query batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDataResponse {
    pub responses: BTreeMap<String, DataResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResourceRequest {
    pub context: PluginContext,
    /// Resource path within the plugin (e.g., "annotations").
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
}

/// One chunk of a streamed resource response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResourceResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckHealthRequest {
    pub context: PluginContext,
}

/// Health reported by a plugin backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Unknown,
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckHealthResult {
    pub status: HealthStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub json_details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectMetricsRequest {
    pub context: PluginContext,
}

/// Prometheus exposition-format payload reported by a plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectMetricsResult {
    pub prometheus: Vec<u8>,
}

/// Outcome of a stream subscribe or publish negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StreamAccess {
    Ok,
    NotFound,
    PermissionDenied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeStreamRequest {
    pub context: PluginContext,
    pub path: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeStreamResponse {
    pub status: StreamAccess,
    #[serde(default)]
    pub initial_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishStreamRequest {
    pub context: PluginContext,
    pub path: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishStreamResponse {
    pub status: StreamAccess,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStreamRequest {
    pub context: PluginContext,
    pub path: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// One packet pushed over a running stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamPacket {
    pub data: serde_json::Value,
}
