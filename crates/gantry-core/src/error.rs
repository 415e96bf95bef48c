// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Gantry plugin gateway.

use thiserror::Error;

/// The primary error type used across all Gantry components.
///
/// Every variant is recovered at the client/manager boundary and mapped onto
/// the gateway's wire representation; none of them terminate the process.
#[derive(Debug, Error)]
pub enum GantryError {
    /// The requested plugin ID is not present in the registry.
    #[error("plugin not found: {plugin_id}")]
    NotFound { plugin_id: String },

    /// The plugin exists but its backend cannot serve calls (decommissioned,
    /// or exited and not restartable).
    #[error("plugin unavailable: {plugin_id}: {reason}")]
    Unavailable { plugin_id: String, reason: String },

    /// The plugin does not implement the requested capability. This is an
    /// expected, reportable state, not a failure.
    #[error("method not implemented")]
    MethodNotImplemented,

    /// The backend process failed to launch.
    #[error("failed to start plugin {plugin_id}: {source}")]
    StartFailure {
        plugin_id: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A call to an already-running backend failed (crash, broken pipe,
    /// timeout). The backend is marked exited so the next call restarts it.
    #[error("transport error for plugin {plugin_id}: {message}")]
    Transport {
        plugin_id: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The caller cancelled the request before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// Plugin installation or removal failed.
    #[error("install error for plugin {plugin_id}: {message}")]
    Install { plugin_id: String, message: String },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GantryError {
    /// Shorthand for a [`GantryError::NotFound`].
    pub fn not_found(plugin_id: impl Into<String>) -> Self {
        Self::NotFound {
            plugin_id: plugin_id.into(),
        }
    }

    /// Shorthand for a [`GantryError::Unavailable`].
    pub fn unavailable(plugin_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            plugin_id: plugin_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error represents an expected per-plugin condition rather
    /// than a gateway-side defect. Expected errors are surfaced to callers
    /// without being logged as failures.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Unavailable { .. }
                | Self::MethodNotImplemented
                | Self::Cancelled
        )
    }
}
