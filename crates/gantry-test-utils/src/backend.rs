// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configurable fake backend.
//!
//! Each capability is an explicit `Option<handler>` installed by a builder
//! method; a capability with no handler returns `MethodNotImplemented` as
//! part of the contract. Lifecycle calls are counted so tests can assert
//! exactly how many launches happened.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use gantry_core::traits::sender::{PacketSender, ResourceSender};
use gantry_core::types::{
    CallResourceRequest, CallResourceResponse, Capabilities, CheckHealthRequest,
    CheckHealthResult, CollectMetricsRequest, CollectMetricsResult, PluginClass,
    PluginDescriptor, PluginType, ProcessState, PublishStreamRequest, PublishStreamResponse,
    QueryDataRequest, QueryDataResponse, RunStreamRequest, StreamPacket,
    SubscribeStreamRequest, SubscribeStreamResponse,
};
use gantry_core::{BackendPlugin, GantryError};

/// A descriptor with sensible defaults for tests.
pub fn test_descriptor(id: &str) -> PluginDescriptor {
    PluginDescriptor {
        id: id.to_string(),
        version: "1.0.0".to_string(),
        plugin_type: PluginType::DataSource,
        class: PluginClass::External,
        path: PathBuf::from(format!("/tmp/gantry-test/{id}")),
        capabilities: Capabilities {
            query: true,
            resource: true,
            stream: true,
            health: true,
            metrics: true,
        },
        static_dir: None,
        executable: Some("fake_backend".to_string()),
    }
}

type QueryHandler =
    Box<dyn Fn(QueryDataRequest) -> Result<QueryDataResponse, GantryError> + Send + Sync>;
type ResourceHandler =
    Box<dyn Fn(CallResourceRequest) -> Result<Vec<CallResourceResponse>, GantryError> + Send + Sync>;
type HealthHandler =
    Box<dyn Fn(CheckHealthRequest) -> Result<CheckHealthResult, GantryError> + Send + Sync>;
type MetricsHandler =
    Box<dyn Fn(CollectMetricsRequest) -> Result<CollectMetricsResult, GantryError> + Send + Sync>;
type SubscribeHandler = Box<
    dyn Fn(SubscribeStreamRequest) -> Result<SubscribeStreamResponse, GantryError> + Send + Sync,
>;
type PublishHandler =
    Box<dyn Fn(PublishStreamRequest) -> Result<PublishStreamResponse, GantryError> + Send + Sync>;

/// Fake backend with explicit, per-capability configuration.
pub struct FakeBackend {
    plugin_id: String,
    managed: bool,
    state: RwLock<ProcessState>,
    start_count: AtomicUsize,
    stop_count: AtomicUsize,
    kill_count: AtomicUsize,
    /// Configured start failure message; `Some` makes every start fail.
    fail_start: Option<String>,
    /// Artificial start latency, to widen race windows in concurrency tests.
    start_delay: Option<Duration>,
    /// Simulate a slow graceful stop, to exercise kill escalation.
    stop_delay: Option<Duration>,
    query_handler: Option<QueryHandler>,
    resource_handler: Option<ResourceHandler>,
    health_handler: Option<HealthHandler>,
    metrics_handler: Option<MetricsHandler>,
    subscribe_handler: Option<SubscribeHandler>,
    publish_handler: Option<PublishHandler>,
    /// Packets pushed by `run_stream` before completing.
    stream_packets: Vec<StreamPacket>,
    /// When set, `run_stream` pushes packets forever until cancelled.
    endless_stream: bool,
}

impl FakeBackend {
    /// A managed backend in the `NotStarted` state with no capabilities.
    pub fn managed(plugin_id: &str) -> Self {
        Self::new(plugin_id, true)
    }

    /// An unmanaged backend (the process manager never starts or stops it).
    pub fn unmanaged(plugin_id: &str) -> Self {
        Self::new(plugin_id, false)
    }

    fn new(plugin_id: &str, managed: bool) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            managed,
            state: RwLock::new(ProcessState::NotStarted),
            start_count: AtomicUsize::new(0),
            stop_count: AtomicUsize::new(0),
            kill_count: AtomicUsize::new(0),
            fail_start: None,
            start_delay: None,
            stop_delay: None,
            query_handler: None,
            resource_handler: None,
            health_handler: None,
            metrics_handler: None,
            subscribe_handler: None,
            publish_handler: None,
            stream_packets: Vec::new(),
            endless_stream: false,
        }
    }

    pub fn with_query_data<F>(mut self, f: F) -> Self
    where
        F: Fn(QueryDataRequest) -> Result<QueryDataResponse, GantryError> + Send + Sync + 'static,
    {
        self.query_handler = Some(Box::new(f));
        self
    }

    pub fn with_call_resource<F>(mut self, f: F) -> Self
    where
        F: Fn(CallResourceRequest) -> Result<Vec<CallResourceResponse>, GantryError>
            + Send
            + Sync
            + 'static,
    {
        self.resource_handler = Some(Box::new(f));
        self
    }

    pub fn with_check_health<F>(mut self, f: F) -> Self
    where
        F: Fn(CheckHealthRequest) -> Result<CheckHealthResult, GantryError> + Send + Sync + 'static,
    {
        self.health_handler = Some(Box::new(f));
        self
    }

    pub fn with_collect_metrics<F>(mut self, f: F) -> Self
    where
        F: Fn(CollectMetricsRequest) -> Result<CollectMetricsResult, GantryError>
            + Send
            + Sync
            + 'static,
    {
        self.metrics_handler = Some(Box::new(f));
        self
    }

    pub fn with_subscribe_stream<F>(mut self, f: F) -> Self
    where
        F: Fn(SubscribeStreamRequest) -> Result<SubscribeStreamResponse, GantryError>
            + Send
            + Sync
            + 'static,
    {
        self.subscribe_handler = Some(Box::new(f));
        self
    }

    pub fn with_publish_stream<F>(mut self, f: F) -> Self
    where
        F: Fn(PublishStreamRequest) -> Result<PublishStreamResponse, GantryError>
            + Send
            + Sync
            + 'static,
    {
        self.publish_handler = Some(Box::new(f));
        self
    }

    /// `run_stream` pushes these packets, then completes normally.
    pub fn with_stream_packets(mut self, packets: Vec<StreamPacket>) -> Self {
        self.stream_packets = packets;
        self
    }

    /// `run_stream` pushes packets forever until its token is cancelled.
    pub fn with_endless_stream(mut self) -> Self {
        self.endless_stream = true;
        self
    }

    pub fn with_failing_start(mut self, message: &str) -> Self {
        self.fail_start = Some(message.to_string());
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = Some(delay);
        self
    }

    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub fn kill_count(&self) -> usize {
        self.kill_count.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ProcessState) {
        let mut guard = self.state.write().expect("state lock poisoned");
        // Decommissioned is terminal; nothing overwrites it.
        if *guard != ProcessState::Decommissioned {
            *guard = state;
        }
    }
}

#[async_trait]
impl BackendPlugin for FakeBackend {
    fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    fn is_managed(&self) -> bool {
        self.managed
    }

    fn state(&self) -> ProcessState {
        *self.state.read().expect("state lock poisoned")
    }

    fn decommission(&self) {
        self.set_state(ProcessState::Decommissioned);
    }

    async fn start(&self) -> Result<(), GantryError> {
        self.start_count.fetch_add(1, Ordering::SeqCst);
        self.set_state(ProcessState::Starting);
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_start {
            self.set_state(ProcessState::Exited);
            return Err(GantryError::StartFailure {
                plugin_id: self.plugin_id.clone(),
                source: Box::new(std::io::Error::other(message.clone())),
            });
        }
        self.set_state(ProcessState::Running);
        Ok(())
    }

    async fn stop(&self) -> Result<(), GantryError> {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }
        if self.state() != ProcessState::Decommissioned {
            self.set_state(ProcessState::Exited);
        }
        Ok(())
    }

    async fn kill(&self) -> Result<(), GantryError> {
        self.kill_count.fetch_add(1, Ordering::SeqCst);
        if self.state() != ProcessState::Decommissioned {
            self.set_state(ProcessState::Exited);
        }
        Ok(())
    }

    async fn query_data(
        &self,
        _ctx: CancellationToken,
        req: QueryDataRequest,
    ) -> Result<QueryDataResponse, GantryError> {
        match &self.query_handler {
            Some(f) => f(req),
            None => Err(GantryError::MethodNotImplemented),
        }
    }

    async fn call_resource(
        &self,
        ctx: CancellationToken,
        req: CallResourceRequest,
        sender: Arc<dyn ResourceSender>,
    ) -> Result<(), GantryError> {
        let chunks = match &self.resource_handler {
            Some(f) => f(req)?,
            None => return Err(GantryError::MethodNotImplemented),
        };
        for chunk in chunks {
            if ctx.is_cancelled() {
                return Err(GantryError::Cancelled);
            }
            sender.send(chunk).await?;
        }
        Ok(())
    }

    async fn check_health(
        &self,
        _ctx: CancellationToken,
        req: CheckHealthRequest,
    ) -> Result<CheckHealthResult, GantryError> {
        match &self.health_handler {
            Some(f) => f(req),
            None => Err(GantryError::MethodNotImplemented),
        }
    }

    async fn collect_metrics(
        &self,
        _ctx: CancellationToken,
        req: CollectMetricsRequest,
    ) -> Result<CollectMetricsResult, GantryError> {
        match &self.metrics_handler {
            Some(f) => f(req),
            None => Err(GantryError::MethodNotImplemented),
        }
    }

    async fn subscribe_stream(
        &self,
        _ctx: CancellationToken,
        req: SubscribeStreamRequest,
    ) -> Result<SubscribeStreamResponse, GantryError> {
        match &self.subscribe_handler {
            Some(f) => f(req),
            None => Err(GantryError::MethodNotImplemented),
        }
    }

    async fn publish_stream(
        &self,
        _ctx: CancellationToken,
        req: PublishStreamRequest,
    ) -> Result<PublishStreamResponse, GantryError> {
        match &self.publish_handler {
            Some(f) => f(req),
            None => Err(GantryError::MethodNotImplemented),
        }
    }

    async fn run_stream(
        &self,
        ctx: CancellationToken,
        req: RunStreamRequest,
        sender: Arc<dyn PacketSender>,
    ) -> Result<(), GantryError> {
        if self.endless_stream {
            let mut seq = 0u64;
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => return Err(GantryError::Cancelled),
                    _ = tokio::time::sleep(Duration::from_millis(5)) => {
                        seq += 1;
                        let packet = StreamPacket {
                            data: serde_json::json!({"path": req.path.as_str(), "seq": seq}),
                        };
                        sender.send(packet).await?;
                    }
                }
            }
        }

        if self.stream_packets.is_empty() {
            return Err(GantryError::MethodNotImplemented);
        }
        for packet in self.stream_packets.iter().cloned() {
            tokio::select! {
                _ = ctx.cancelled() => return Err(GantryError::Cancelled),
                res = sender.send(packet) => res?,
            }
        }
        Ok(())
    }
}
