// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-plugin backend handle: process lifecycle plus the data-plane
//! capability surface.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::GantryError;
use crate::traits::sender::{PacketSender, ResourceSender};
use crate::types::{
    CallResourceRequest, CheckHealthRequest, CheckHealthResult, CollectMetricsRequest,
    CollectMetricsResult, PluginDescriptor, ProcessState, PublishStreamRequest,
    PublishStreamResponse, QueryDataRequest, QueryDataResponse, RunStreamRequest,
    SubscribeStreamRequest, SubscribeStreamResponse,
};

/// Handle to one plugin's backend, regardless of transport.
///
/// Lifecycle methods are driven by the process manager, which serializes
/// them per plugin ID; implementations only need to keep their own state
/// consistent under concurrent data-plane calls.
///
/// A capability the backend does not implement returns
/// [`GantryError::MethodNotImplemented`]; callers treat that as an expected,
/// reportable state.
#[async_trait]
pub trait BackendPlugin: Send + Sync + 'static {
    fn plugin_id(&self) -> &str;

    /// Whether the gateway owns this backend's process lifecycle. Unmanaged
    /// backends (e.g., in-process cores) are never started or stopped.
    fn is_managed(&self) -> bool;

    /// Current process state. `Decommissioned` is terminal.
    fn state(&self) -> ProcessState;

    /// Mark the backend as decommissioned. It must never start again.
    fn decommission(&self);

    fn is_decommissioned(&self) -> bool {
        self.state() == ProcessState::Decommissioned
    }

    /// Launch the backend. Must be a no-op if already running.
    async fn start(&self) -> Result<(), GantryError>;

    /// Request graceful shutdown.
    async fn stop(&self) -> Result<(), GantryError>;

    /// Force-terminate the backend after a graceful stop timed out.
    async fn kill(&self) -> Result<(), GantryError>;

    async fn query_data(
        &self,
        ctx: CancellationToken,
        req: QueryDataRequest,
    ) -> Result<QueryDataResponse, GantryError>;

    async fn call_resource(
        &self,
        ctx: CancellationToken,
        req: CallResourceRequest,
        sender: Arc<dyn ResourceSender>,
    ) -> Result<(), GantryError>;

    async fn check_health(
        &self,
        ctx: CancellationToken,
        req: CheckHealthRequest,
    ) -> Result<CheckHealthResult, GantryError>;

    async fn collect_metrics(
        &self,
        ctx: CancellationToken,
        req: CollectMetricsRequest,
    ) -> Result<CollectMetricsResult, GantryError>;

    async fn subscribe_stream(
        &self,
        ctx: CancellationToken,
        req: SubscribeStreamRequest,
    ) -> Result<SubscribeStreamResponse, GantryError>;

    async fn publish_stream(
        &self,
        ctx: CancellationToken,
        req: PublishStreamRequest,
    ) -> Result<PublishStreamResponse, GantryError>;

    /// Run a long-lived stream producer, pushing packets to `sender` until
    /// the backend ends the stream or `ctx` is cancelled. Cancellation must
    /// release the sender and return [`GantryError::Cancelled`].
    async fn run_stream(
        &self,
        ctx: CancellationToken,
        req: RunStreamRequest,
        sender: Arc<dyn PacketSender>,
    ) -> Result<(), GantryError>;
}

/// Creates backend handles for newly registered plugins.
pub trait BackendFactory: Send + Sync + 'static {
    fn create(&self, descriptor: &PluginDescriptor) -> Result<Arc<dyn BackendPlugin>, GantryError>;
}
