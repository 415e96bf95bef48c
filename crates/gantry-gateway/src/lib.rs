// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/SSE protocol gateway for the Gantry plugin manager.
//!
//! A translation-only layer: each handler decodes the wire envelope into
//! the internal request type, invokes the manager facade, and re-encodes
//! the result. Streaming RPCs (resource calls and run-stream) adapt the
//! SSE transport to the internal sender capabilities so the backend client
//! stays protocol-agnostic.

pub mod handlers;
pub mod server;
pub mod sse;
pub mod wire;

pub use server::{router, GatewayServer, GatewayState, ServerConfig};

#[cfg(test)]
mod tests_support;
