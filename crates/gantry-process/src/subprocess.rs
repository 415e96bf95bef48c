// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Out-of-process backend transport.
//!
//! A `SubprocessBackend` spawns the plugin's executable and exchanges
//! newline-delimited JSON frames over stdin/stdout. Outbound frames are
//! requests (`{kind, id, method, payload}`), cancellations, and a shutdown
//! request; inbound frames are unary results, stream chunks, stream
//! completion markers, and errors. A reader task routes inbound frames to
//! pending calls by ID; process exit fails every pending call with a
//! transport error and flips the state to `Exited`, so the next invocation
//! attempts a fresh start.
//!
//! Plugin stderr is forwarded to tracing at debug level.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use gantry_core::traits::sender::{PacketSender, ResourceSender};
use gantry_core::types::{
    CallResourceRequest, CallResourceResponse, CheckHealthRequest, CheckHealthResult,
    CollectMetricsRequest, CollectMetricsResult, PluginDescriptor, ProcessState,
    PublishStreamRequest, PublishStreamResponse, QueryDataRequest, QueryDataResponse,
    RunStreamRequest, StreamPacket, SubscribeStreamRequest, SubscribeStreamResponse,
};
use gantry_core::{BackendFactory, BackendPlugin, GantryError};

/// Frames written to the plugin's stdin.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum OutboundFrame {
    Request {
        id: u64,
        method: String,
        payload: serde_json::Value,
    },
    Cancel {
        id: u64,
    },
    Shutdown,
}

/// Frames read from the plugin's stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum InboundFrame {
    Result {
        id: u64,
        payload: serde_json::Value,
    },
    Chunk {
        id: u64,
        payload: serde_json::Value,
    },
    Done {
        id: u64,
    },
    Error {
        id: u64,
        code: ErrorFrameCode,
        message: String,
    },
}

impl InboundFrame {
    fn id(&self) -> u64 {
        match self {
            Self::Result { id, .. }
            | Self::Chunk { id, .. }
            | Self::Done { id }
            | Self::Error { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ErrorFrameCode {
    NotImplemented,
    Error,
}

type PendingMap = Arc<DashMap<u64, mpsc::UnboundedSender<InboundFrame>>>;

/// Backend handle speaking the stdio frame protocol to a child process.
pub struct SubprocessBackend {
    plugin_id: String,
    executable: PathBuf,
    workdir: PathBuf,
    state: Arc<RwLock<ProcessState>>,
    next_id: AtomicU64,
    pending: PendingMap,
    stdin: Mutex<Option<ChildStdin>>,
    child: Mutex<Option<Child>>,
}

impl SubprocessBackend {
    pub fn new(plugin_id: &str, executable: PathBuf, workdir: PathBuf) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            executable,
            workdir,
            state: Arc::new(RwLock::new(ProcessState::NotStarted)),
            next_id: AtomicU64::new(1),
            pending: Arc::new(DashMap::new()),
            stdin: Mutex::new(None),
            child: Mutex::new(None),
        }
    }

    fn set_state(&self, state: ProcessState) {
        set_state(&self.state, state);
    }

    fn transport(&self, message: impl Into<String>) -> GantryError {
        GantryError::Transport {
            plugin_id: self.plugin_id.clone(),
            message: message.into(),
            source: None,
        }
    }

    fn map_error_frame(&self, code: ErrorFrameCode, message: String) -> GantryError {
        match code {
            ErrorFrameCode::NotImplemented => GantryError::MethodNotImplemented,
            ErrorFrameCode::Error => GantryError::Internal(format!(
                "plugin '{}' error: {message}",
                self.plugin_id
            )),
        }
    }

    async fn write_frame(&self, frame: &OutboundFrame) -> Result<(), GantryError> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(|| self.transport("backend not running"))?;
        let mut line = serde_json::to_vec(frame)
            .map_err(|e| GantryError::Internal(format!("frame encode: {e}")))?;
        line.push(b'\n');
        stdin
            .write_all(&line)
            .await
            .map_err(|e| self.transport(format!("write to backend failed: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| self.transport(format!("flush to backend failed: {e}")))
    }

    /// Allocate a call ID and register its inbound frame channel.
    fn begin_call(&self) -> (u64, mpsc::UnboundedReceiver<InboundFrame>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending.insert(id, tx);
        (id, rx)
    }

    fn end_call(&self, id: u64) {
        self.pending.remove(&id);
    }

    /// One request, one result frame.
    async fn call_unary(
        &self,
        ctx: CancellationToken,
        method: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, GantryError> {
        let (id, mut rx) = self.begin_call();
        let result = async {
            self.write_frame(&OutboundFrame::Request {
                id,
                method: method.to_string(),
                payload,
            })
            .await?;

            tokio::select! {
                _ = ctx.cancelled() => {
                    let _ = self.write_frame(&OutboundFrame::Cancel { id }).await;
                    Err(GantryError::Cancelled)
                }
                frame = rx.recv() => match frame {
                    Some(InboundFrame::Result { payload, .. }) => Ok(payload),
                    Some(InboundFrame::Error { code, message, .. }) => {
                        Err(self.map_error_frame(code, message))
                    }
                    Some(other) => Err(GantryError::Internal(format!(
                        "unexpected frame for unary call: {other:?}"
                    ))),
                    None => Err(self.transport("backend exited during call")),
                },
            }
        }
        .await;
        self.end_call(id);
        result
    }

    fn decode<T: serde::de::DeserializeOwned>(
        &self,
        payload: serde_json::Value,
    ) -> Result<T, GantryError> {
        serde_json::from_value(payload).map_err(|e| {
            self.transport(format!("malformed response from backend: {e}"))
        })
    }
}

fn set_state(state: &Arc<RwLock<ProcessState>>, new: ProcessState) {
    let mut guard = state.write().expect("state lock poisoned");
    // Decommissioned is terminal; nothing overwrites it.
    if *guard != ProcessState::Decommissioned {
        *guard = new;
    }
}

/// Routes inbound frames to pending calls until the stream ends, then marks
/// the backend exited and fails whatever is still pending.
async fn read_frames<R: AsyncRead + Unpin>(
    plugin_id: String,
    stdout: R,
    pending: PendingMap,
    state: Arc<RwLock<ProcessState>>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<InboundFrame>(&line) {
                    Ok(frame) => {
                        let id = frame.id();
                        match pending.get(&id) {
                            Some(tx) => {
                                let _ = tx.send(frame);
                            }
                            None => {
                                debug!(plugin_id, call_id = id, "frame for unknown call, ignoring");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(plugin_id, error = %e, "unparseable frame from backend");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(plugin_id, error = %e, "read from backend failed");
                break;
            }
        }
    }

    set_state(&state, ProcessState::Exited);
    // Dropping the senders closes each pending call's channel, which the
    // callers observe as a transport error.
    pending.clear();
    debug!(plugin_id, "backend stdout closed");
}

/// Forwards plugin stderr lines to tracing.
async fn forward_stderr<R: AsyncRead + Unpin>(plugin_id: String, stderr: R) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(plugin_id, "{line}");
    }
}

#[async_trait]
impl BackendPlugin for SubprocessBackend {
    fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    fn is_managed(&self) -> bool {
        true
    }

    fn state(&self) -> ProcessState {
        *self.state.read().expect("state lock poisoned")
    }

    fn decommission(&self) {
        *self.state.write().expect("state lock poisoned") = ProcessState::Decommissioned;
    }

    async fn start(&self) -> Result<(), GantryError> {
        if self.state() == ProcessState::Running {
            return Ok(());
        }
        self.set_state(ProcessState::Starting);

        let mut command = Command::new(&self.executable);
        command
            .current_dir(&self.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            self.set_state(ProcessState::Exited);
            GantryError::StartFailure {
                plugin_id: self.plugin_id.clone(),
                source: Box::new(e),
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GantryError::Internal("child stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GantryError::Internal("child stderr not captured".into()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GantryError::Internal("child stdin not captured".into()))?;

        tokio::spawn(read_frames(
            self.plugin_id.clone(),
            stdout,
            Arc::clone(&self.pending),
            Arc::clone(&self.state),
        ));
        tokio::spawn(forward_stderr(self.plugin_id.clone(), stderr));

        *self.stdin.lock().await = Some(stdin);
        *self.child.lock().await = Some(child);
        self.set_state(ProcessState::Running);
        debug!(plugin_id = %self.plugin_id, executable = %self.executable.display(), "backend process spawned");
        Ok(())
    }

    async fn stop(&self) -> Result<(), GantryError> {
        // Best effort: ask the plugin to exit on its own.
        let _ = self.write_frame(&OutboundFrame::Shutdown).await;

        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            let _ = child.wait().await;
        }
        *guard = None;
        *self.stdin.lock().await = None;
        self.set_state(ProcessState::Exited);
        Ok(())
    }

    async fn kill(&self) -> Result<(), GantryError> {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        *guard = None;
        *self.stdin.lock().await = None;
        self.set_state(ProcessState::Exited);
        Ok(())
    }

    async fn query_data(
        &self,
        ctx: CancellationToken,
        req: QueryDataRequest,
    ) -> Result<QueryDataResponse, GantryError> {
        let payload = serde_json::to_value(&req)
            .map_err(|e| GantryError::Internal(format!("request encode: {e}")))?;
        let result = self.call_unary(ctx, "query_data", payload).await?;
        self.decode(result)
    }

    async fn call_resource(
        &self,
        ctx: CancellationToken,
        req: CallResourceRequest,
        sender: Arc<dyn ResourceSender>,
    ) -> Result<(), GantryError> {
        let payload = serde_json::to_value(&req)
            .map_err(|e| GantryError::Internal(format!("request encode: {e}")))?;
        let (id, mut rx) = self.begin_call();
        let result = async {
            self.write_frame(&OutboundFrame::Request {
                id,
                method: "call_resource".to_string(),
                payload,
            })
            .await?;

            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        let _ = self.write_frame(&OutboundFrame::Cancel { id }).await;
                        return Err(GantryError::Cancelled);
                    }
                    frame = rx.recv() => match frame {
                        Some(InboundFrame::Chunk { payload, .. }) => {
                            let chunk: CallResourceResponse = self.decode(payload)?;
                            sender.send(chunk).await?;
                        }
                        // A unary reply is treated as a single-chunk response.
                        Some(InboundFrame::Result { payload, .. }) => {
                            let chunk: CallResourceResponse = self.decode(payload)?;
                            sender.send(chunk).await?;
                            return Ok(());
                        }
                        Some(InboundFrame::Done { .. }) => return Ok(()),
                        Some(InboundFrame::Error { code, message, .. }) => {
                            return Err(self.map_error_frame(code, message));
                        }
                        None => return Err(self.transport("backend exited during resource call")),
                    },
                }
            }
        }
        .await;
        self.end_call(id);
        result
    }

    async fn check_health(
        &self,
        ctx: CancellationToken,
        req: CheckHealthRequest,
    ) -> Result<CheckHealthResult, GantryError> {
        let payload = serde_json::to_value(&req)
            .map_err(|e| GantryError::Internal(format!("request encode: {e}")))?;
        let result = self.call_unary(ctx, "check_health", payload).await?;
        self.decode(result)
    }

    async fn collect_metrics(
        &self,
        ctx: CancellationToken,
        req: CollectMetricsRequest,
    ) -> Result<CollectMetricsResult, GantryError> {
        let payload = serde_json::to_value(&req)
            .map_err(|e| GantryError::Internal(format!("request encode: {e}")))?;
        let result = self.call_unary(ctx, "collect_metrics", payload).await?;
        self.decode(result)
    }

    async fn subscribe_stream(
        &self,
        ctx: CancellationToken,
        req: SubscribeStreamRequest,
    ) -> Result<SubscribeStreamResponse, GantryError> {
        let payload = serde_json::to_value(&req)
            .map_err(|e| GantryError::Internal(format!("request encode: {e}")))?;
        let result = self.call_unary(ctx, "subscribe_stream", payload).await?;
        self.decode(result)
    }

    async fn publish_stream(
        &self,
        ctx: CancellationToken,
        req: PublishStreamRequest,
    ) -> Result<PublishStreamResponse, GantryError> {
        let payload = serde_json::to_value(&req)
            .map_err(|e| GantryError::Internal(format!("request encode: {e}")))?;
        let result = self.call_unary(ctx, "publish_stream", payload).await?;
        self.decode(result)
    }

    async fn run_stream(
        &self,
        ctx: CancellationToken,
        req: RunStreamRequest,
        sender: Arc<dyn PacketSender>,
    ) -> Result<(), GantryError> {
        let payload = serde_json::to_value(&req)
            .map_err(|e| GantryError::Internal(format!("request encode: {e}")))?;
        let (id, mut rx) = self.begin_call();
        let result = async {
            self.write_frame(&OutboundFrame::Request {
                id,
                method: "run_stream".to_string(),
                payload,
            })
            .await?;

            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        let _ = self.write_frame(&OutboundFrame::Cancel { id }).await;
                        return Err(GantryError::Cancelled);
                    }
                    frame = rx.recv() => match frame {
                        Some(InboundFrame::Chunk { payload, .. }) => {
                            sender.send(StreamPacket { data: payload }).await?;
                        }
                        Some(InboundFrame::Done { .. }) => return Ok(()),
                        Some(InboundFrame::Error { code, message, .. }) => {
                            return Err(self.map_error_frame(code, message));
                        }
                        Some(InboundFrame::Result { .. }) => {
                            return Err(GantryError::Internal(
                                "unexpected unary result on stream".into(),
                            ));
                        }
                        None => return Err(self.transport("backend exited during stream")),
                    },
                }
            }
        }
        .await;
        self.end_call(id);
        result
    }
}

/// Backend for plugins that ship no executable (frontend-only panels and
/// apps). Never started; every data-plane call reports the capability as
/// unimplemented.
pub struct UnmanagedBackend {
    plugin_id: String,
    decommissioned: RwLock<bool>,
}

impl UnmanagedBackend {
    pub fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            decommissioned: RwLock::new(false),
        }
    }
}

#[async_trait]
impl BackendPlugin for UnmanagedBackend {
    fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    fn is_managed(&self) -> bool {
        false
    }

    fn state(&self) -> ProcessState {
        if *self.decommissioned.read().expect("state lock poisoned") {
            ProcessState::Decommissioned
        } else {
            ProcessState::NotStarted
        }
    }

    fn decommission(&self) {
        *self.decommissioned.write().expect("state lock poisoned") = true;
    }

    async fn start(&self) -> Result<(), GantryError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), GantryError> {
        Ok(())
    }

    async fn kill(&self) -> Result<(), GantryError> {
        Ok(())
    }

    async fn query_data(
        &self,
        _ctx: CancellationToken,
        _req: QueryDataRequest,
    ) -> Result<QueryDataResponse, GantryError> {
        Err(GantryError::MethodNotImplemented)
    }

    async fn call_resource(
        &self,
        _ctx: CancellationToken,
        _req: CallResourceRequest,
        _sender: Arc<dyn ResourceSender>,
    ) -> Result<(), GantryError> {
        Err(GantryError::MethodNotImplemented)
    }

    async fn check_health(
        &self,
        _ctx: CancellationToken,
        _req: CheckHealthRequest,
    ) -> Result<CheckHealthResult, GantryError> {
        Err(GantryError::MethodNotImplemented)
    }

    async fn collect_metrics(
        &self,
        _ctx: CancellationToken,
        _req: CollectMetricsRequest,
    ) -> Result<CollectMetricsResult, GantryError> {
        Err(GantryError::MethodNotImplemented)
    }

    async fn subscribe_stream(
        &self,
        _ctx: CancellationToken,
        _req: SubscribeStreamRequest,
    ) -> Result<SubscribeStreamResponse, GantryError> {
        Err(GantryError::MethodNotImplemented)
    }

    async fn publish_stream(
        &self,
        _ctx: CancellationToken,
        _req: PublishStreamRequest,
    ) -> Result<PublishStreamResponse, GantryError> {
        Err(GantryError::MethodNotImplemented)
    }

    async fn run_stream(
        &self,
        _ctx: CancellationToken,
        _req: RunStreamRequest,
        _sender: Arc<dyn PacketSender>,
    ) -> Result<(), GantryError> {
        Err(GantryError::MethodNotImplemented)
    }
}

/// Creates subprocess backends for plugins with an executable and unmanaged
/// backends for asset-only plugins.
#[derive(Default)]
pub struct SubprocessFactory;

impl SubprocessFactory {
    pub fn new() -> Self {
        Self
    }
}

impl BackendFactory for SubprocessFactory {
    fn create(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<Arc<dyn BackendPlugin>, GantryError> {
        match &descriptor.executable {
            Some(executable) => Ok(Arc::new(SubprocessBackend::new(
                &descriptor.id,
                descriptor.path.join(executable),
                descriptor.path.clone(),
            ))),
            None => Ok(Arc::new(UnmanagedBackend::new(&descriptor.id))),
        }
    }
}
