// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events adapters for the two server-streaming RPCs.
//!
//! The backend client pushes chunks through a sender capability; here that
//! capability is an mpsc channel drained by the SSE response body. Client
//! disconnect drops the body stream, which cancels the per-request token
//! through a drop guard, which stops the backend-side producer.
//!
//! SSE event format:
//! ```text
//! event: chunk            (resource calls) / packet (run-stream)
//! data: {...}
//!
//! event: done
//! data: {}
//!
//! event: error
//! data: {"error": "..."}
//! ```

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::response::sse::{Event, Sse};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::DropGuard;
use tracing::debug;

use gantry_core::traits::sender::{PacketSender, ResourceSender};
use gantry_core::types::{CallResourceRequest, CallResourceResponse, RunStreamRequest, StreamPacket};
use gantry_core::GantryError;

use crate::server::GatewayState;
use crate::wire::{WireResourceChunk, WireStreamPacket};

/// SSE event names.
pub mod event_types {
    pub const CHUNK: &str = "chunk";
    pub const PACKET: &str = "packet";
    pub const DONE: &str = "done";
    pub const ERROR: &str = "error";
}

type EventResult = Result<Event, Infallible>;

/// An SSE body stream that cancels the request token when dropped.
pub struct GuardedEventStream {
    inner: ReceiverStream<EventResult>,
    _guard: DropGuard,
}

impl Stream for GuardedEventStream {
    type Item = EventResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Sender adapter pushing resource chunks into the SSE channel.
struct SseResourceSender {
    tx: mpsc::Sender<EventResult>,
}

#[async_trait]
impl ResourceSender for SseResourceSender {
    async fn send(&self, chunk: CallResourceResponse) -> Result<(), GantryError> {
        let event = Event::default()
            .event(event_types::CHUNK)
            .json_data(WireResourceChunk::from(chunk))
            .map_err(|e| GantryError::Internal(format!("chunk encode: {e}")))?;
        // A closed channel means the HTTP client is gone; report it as a
        // cancellation so the backend stops producing.
        self.tx
            .send(Ok(event))
            .await
            .map_err(|_| GantryError::Cancelled)
    }
}

/// Sender adapter pushing stream packets into the SSE channel.
struct SsePacketSender {
    tx: mpsc::Sender<EventResult>,
}

#[async_trait]
impl PacketSender for SsePacketSender {
    async fn send(&self, packet: StreamPacket) -> Result<(), GantryError> {
        let event = Event::default()
            .event(event_types::PACKET)
            .json_data(WireStreamPacket::from(packet))
            .map_err(|e| GantryError::Internal(format!("packet encode: {e}")))?;
        self.tx
            .send(Ok(event))
            .await
            .map_err(|_| GantryError::Cancelled)
    }
}

fn terminal_event(result: Result<(), GantryError>) -> Event {
    match result {
        Ok(()) => Event::default().event(event_types::DONE).data("{}"),
        Err(e) => Event::default()
            .event(event_types::ERROR)
            .data(serde_json::json!({"error": e.to_string()}).to_string()),
    }
}

/// Stream a resource call's response chunks as SSE.
pub async fn stream_resource(
    state: GatewayState,
    req: CallResourceRequest,
) -> Sse<GuardedEventStream> {
    let token = state.shutdown.child_token();
    let (tx, rx) = mpsc::channel::<EventResult>(32);
    let sender = Arc::new(SseResourceSender { tx: tx.clone() });

    let manager = Arc::clone(&state.manager);
    let call_token = token.clone();
    tokio::spawn(async move {
        let result = manager.call_resource(call_token, req, sender).await;
        if let Err(e) = &result {
            debug!(error = %e, "resource stream ended with error");
        }
        let _ = tx.send(Ok(terminal_event(result))).await;
    });

    Sse::new(GuardedEventStream {
        inner: ReceiverStream::new(rx),
        _guard: token.drop_guard(),
    })
}

/// Stream a run-stream call's packets as SSE.
pub async fn stream_run(state: GatewayState, req: RunStreamRequest) -> Sse<GuardedEventStream> {
    let token = state.shutdown.child_token();
    let (tx, rx) = mpsc::channel::<EventResult>(32);
    let sender = Arc::new(SsePacketSender { tx: tx.clone() });

    let manager = Arc::clone(&state.manager);
    let call_token = token.clone();
    tokio::spawn(async move {
        let result = manager.run_stream(call_token, req, sender).await;
        if let Err(e) = &result {
            debug!(error = %e, "run stream ended with error");
        }
        let _ = tx.send(Ok(terminal_event(result))).await;
    });

    Sse::new(GuardedEventStream {
        inner: ReceiverStream::new(rx),
        _guard: token.drop_guard(),
    })
}
