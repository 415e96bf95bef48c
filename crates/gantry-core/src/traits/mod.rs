// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams for the Gantry plugin gateway.
//!
//! Every component boundary (registry, process manager, backend client,
//! sender capabilities, installer collaborators) is a trait defined here,
//! using `#[async_trait]` for dynamic dispatch compatibility.

pub mod backend;
pub mod client;
pub mod collab;
pub mod process;
pub mod registry;
pub mod sender;

pub use backend::{BackendFactory, BackendPlugin};
pub use client::BackendClient;
pub use collab::{FsStore, PluginRepo, SourceLister};
pub use process::ProcessManager;
pub use registry::Registry;
pub use sender::{PacketSender, ResourceSender};
