// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin manager facade.
//!
//! Composes the registry, process service, backend client, and installer
//! collaborators into a single surface exposing lifecycle operations
//! (add/remove), metadata queries (plugins, errors, static routes), and
//! data-plane routing.

pub mod install;
pub mod manager;

pub use install::{DirRepo, DiskStore, InstalledPluginsLister};
pub use manager::PluginManager;
