// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender capabilities for streaming responses.
//!
//! A sender pushes zero-or-more chunks to a caller over a streaming call.
//! Passing the capability instead of a raw transport object keeps the
//! backend client protocol-agnostic: the gateway satisfies these traits
//! with SSE adapters, tests with collecting doubles.

use async_trait::async_trait;

use crate::error::GantryError;
use crate::types::{CallResourceResponse, StreamPacket};

/// Receives chunks of a streamed resource-call response.
#[async_trait]
pub trait ResourceSender: Send + Sync {
    async fn send(&self, chunk: CallResourceResponse) -> Result<(), GantryError>;
}

/// Receives packets from a running stream.
#[async_trait]
pub trait PacketSender: Send + Sync {
    async fn send(&self, packet: StreamPacket) -> Result<(), GantryError>;
}
