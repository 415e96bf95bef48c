// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers for the process service.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics.

use metrics::describe_counter;

/// Register all process-service metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("gantry_plugin_starts_total", "Backend process launches");
    describe_counter!(
        "gantry_plugin_start_failures_total",
        "Backend process launch failures"
    );
    describe_counter!("gantry_plugin_stops_total", "Backend process stops");
    describe_counter!(
        "gantry_plugin_kills_total",
        "Backend processes force-killed after a graceful stop timed out"
    );
}

/// Record a backend launch attempt.
pub fn record_start(plugin_id: &str) {
    metrics::counter!("gantry_plugin_starts_total", "plugin" => plugin_id.to_string())
        .increment(1);
}

/// Record a failed backend launch.
pub fn record_start_failure(plugin_id: &str) {
    metrics::counter!("gantry_plugin_start_failures_total", "plugin" => plugin_id.to_string())
        .increment(1);
}

/// Record a backend stop.
pub fn record_stop(plugin_id: &str) {
    metrics::counter!("gantry_plugin_stops_total", "plugin" => plugin_id.to_string())
        .increment(1);
}

/// Record a forced termination.
pub fn record_kill(plugin_id: &str) {
    metrics::counter!("gantry_plugin_kills_total", "plugin" => plugin_id.to_string())
        .increment(1);
}
