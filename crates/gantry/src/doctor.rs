// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gantry doctor` command implementation.
//!
//! Prints the resolved configuration and checks the plugin directories,
//! reporting each installed plugin's manifest status.

use std::path::Path;

use gantry_config::GantryConfig;
use gantry_registry::parse_plugin_manifest;

/// Outcome of a single doctor check.
enum CheckResult {
    Ok(String),
    Warn(String),
}

impl CheckResult {
    fn print(&self) {
        match self {
            CheckResult::Ok(msg) => println!("  ok    {msg}"),
            CheckResult::Warn(msg) => println!("  warn  {msg}"),
        }
    }
}

fn check_dir(label: &str, path: &str) -> CheckResult {
    if Path::new(path).is_dir() {
        CheckResult::Ok(format!("{label}: {path}"))
    } else {
        CheckResult::Warn(format!("{label}: {path} does not exist yet"))
    }
}

fn check_installed_plugins(plugins_dir: &str) -> Vec<CheckResult> {
    let mut results = Vec::new();
    let Ok(entries) = std::fs::read_dir(plugins_dir) else {
        return results;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let manifest_path = path.join("plugin.toml");
        if !manifest_path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match std::fs::read_to_string(&manifest_path)
            .map_err(|e| e.to_string())
            .and_then(|toml| parse_plugin_manifest(&toml).map_err(|e| e.to_string()))
        {
            Ok(manifest) => results.push(CheckResult::Ok(format!(
                "plugin {name}: {} v{} ({})",
                manifest.id, manifest.version, manifest.plugin_type
            ))),
            Err(e) => results.push(CheckResult::Warn(format!("plugin {name}: {e}"))),
        }
    }
    results
}

/// Runs the `gantry doctor` command.
pub fn run_doctor(config: &GantryConfig) {
    println!("gantry doctor");
    println!();
    println!("configuration:");
    println!("  gateway.host          = {}", config.gateway.host);
    println!("  gateway.port          = {}", config.gateway.port);
    println!("  gateway.host_version  = {}", config.gateway.host_version);
    println!("  plugins.dir           = {}", config.plugins.dir);
    println!("  plugins.repo_dir      = {}", config.plugins.repo_dir);
    println!(
        "  plugins.shutdown_grace_secs = {}",
        config.plugins.shutdown_grace_secs
    );
    println!("  log.level             = {}", config.log.level);
    println!();

    println!("checks:");
    check_dir("plugins directory", &config.plugins.dir).print();
    check_dir("repository directory", &config.plugins.repo_dir).print();
    let plugin_results = check_installed_plugins(&config.plugins.dir);
    if plugin_results.is_empty() {
        println!("  ok    no installed plugins");
    }
    for result in &plugin_results {
        result.print();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_dir_reports_missing_directories() {
        let result = check_dir("plugins directory", "/definitely/not/here");
        assert!(matches!(result, CheckResult::Warn(_)));
    }

    #[test]
    fn installed_plugin_manifests_are_inspected() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good");
        std::fs::create_dir_all(&good).unwrap();
        std::fs::write(
            good.join("plugin.toml"),
            "[plugin]\nid = \"good\"\nversion = \"1.0.0\"\ntype = \"app\"\n",
        )
        .unwrap();
        let bad = tmp.path().join("bad");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join("plugin.toml"), "[plugin").unwrap();

        let results = check_installed_plugins(&tmp.path().to_string_lossy());
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|r| matches!(r, CheckResult::Ok(_))));
        assert!(results.iter().any(|r| matches!(r, CheckResult::Warn(_))));
    }
}
