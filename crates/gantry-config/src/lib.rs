// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Gantry gateway.
//!
//! Layered TOML loading (defaults, system, user, local, environment) with
//! post-deserialization validation and miette diagnostics.

#![allow(clippy::result_large_err)] // figment::Error propagates through the load path

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{figment_to_config_errors, render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::GantryConfig;
pub use validation::validate_config;

/// Load and validate the configuration, collecting every error.
pub fn load_and_validate() -> Result<GantryConfig, Vec<ConfigError>> {
    let config = load_config().map_err(figment_to_config_errors)?;
    validate_config(&config)?;
    Ok(config)
}
