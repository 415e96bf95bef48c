// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin registry, error tracker, and manifest parser.
//!
//! The registry is the single source of truth for which plugins exist;
//! it is mutated only by `add`/`remove` and read by everything else. The
//! error tracker retains per-plugin failure records for introspection.

pub mod errors;
pub mod manifest;
pub mod registry;

pub use errors::ErrorTracker;
pub use manifest::{parse_plugin_manifest, PluginManifest};
pub use registry::InMemoryRegistry;
