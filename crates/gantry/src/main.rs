// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gantry - a plugin process gateway.
//!
//! This is the binary entry point for the Gantry gateway.

mod doctor;
mod serve;
mod signals;

use clap::{Parser, Subcommand};

/// Gantry - a plugin process gateway.
#[derive(Parser, Debug)]
#[command(name = "gantry", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server.
    Serve,
    /// Inspect configuration and installed plugins.
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match gantry_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            gantry_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("gantry serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Doctor) => {
            doctor::run_doctor(&config);
        }
        None => {
            println!("gantry: use --help for available commands");
        }
    }
}
