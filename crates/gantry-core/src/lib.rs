// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Gantry plugin gateway.
//!
//! This crate provides the foundational trait definitions, error type, and
//! common types used throughout the Gantry workspace. The registry, process
//! manager, backend client, and installer collaborators all implement traits
//! defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::GantryError;
pub use types::{
    Plugin, PluginClass, PluginDescriptor, PluginErrorRecord, PluginType, ProcessState,
    StaticRoute,
};

// Re-export all seam traits at crate root.
pub use traits::{
    BackendClient, BackendFactory, BackendPlugin, FsStore, PacketSender, PluginRepo,
    ProcessManager, Registry, ResourceSender, SourceLister,
};
