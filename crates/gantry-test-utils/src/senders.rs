// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collecting sender doubles.
//!
//! Capture everything sent through them so tests can assert on chunk and
//! packet sequences without a real transport.

use std::sync::Mutex;

use async_trait::async_trait;

use gantry_core::traits::sender::{PacketSender, ResourceSender};
use gantry_core::types::{CallResourceResponse, StreamPacket};
use gantry_core::GantryError;

/// Captures streamed resource-call chunks.
#[derive(Default)]
pub struct CollectingResourceSender {
    sent: Mutex<Vec<CallResourceResponse>>,
}

impl CollectingResourceSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<CallResourceResponse> {
        self.sent.lock().expect("sender lock poisoned").clone()
    }
}

#[async_trait]
impl ResourceSender for CollectingResourceSender {
    async fn send(&self, chunk: CallResourceResponse) -> Result<(), GantryError> {
        self.sent.lock().expect("sender lock poisoned").push(chunk);
        Ok(())
    }
}

/// Captures stream packets.
#[derive(Default)]
pub struct CollectingPacketSender {
    sent: Mutex<Vec<StreamPacket>>,
}

impl CollectingPacketSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<StreamPacket> {
        self.sent.lock().expect("sender lock poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().expect("sender lock poisoned").len()
    }
}

#[async_trait]
impl PacketSender for CollectingPacketSender {
    async fn send(&self, packet: StreamPacket) -> Result<(), GantryError> {
        self.sent.lock().expect("sender lock poisoned").push(packet);
        Ok(())
    }
}
