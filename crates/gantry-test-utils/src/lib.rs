// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Gantry integration tests.
//!
//! Provides fake backends, fake collaborators, and collecting senders for
//! fast, deterministic, CI-runnable tests without real plugin processes.
//!
//! # Components
//!
//! - [`FakeBackend`] - Configurable backend with explicit per-capability handlers
//! - [`FakeProcessManager`] - Process manager double with call-count maps
//! - [`FakePluginRepo`] / [`FakeFsStore`] / [`FakeSourceLister`] - installer collaborators
//! - [`CollectingResourceSender`] / [`CollectingPacketSender`] - sender capture doubles

pub mod backend;
pub mod collab;
pub mod senders;

pub use backend::{test_descriptor, FakeBackend};
pub use collab::{FakeFsStore, FakePluginRepo, FakeProcessManager, FakeSourceLister};
pub use senders::{CollectingPacketSender, CollectingResourceSender};
