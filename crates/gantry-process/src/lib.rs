// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend process lifecycle management.
//!
//! `ProcessService` owns start/stop/shutdown for every managed plugin,
//! serializing operations per plugin ID so that two starts never race and
//! operations on plugin A never block on plugin B. `SubprocessBackend` is
//! the out-of-process transport: a child process speaking newline-delimited
//! JSON over stdio.

pub mod metrics;
pub mod service;
pub mod subprocess;

pub use service::ProcessService;
pub use subprocess::{SubprocessBackend, SubprocessFactory, UnmanagedBackend};
