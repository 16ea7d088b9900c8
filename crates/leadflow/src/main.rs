// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leadflow - outbound lead engagement engine.
//!
//! This is the binary entry point for the Leadflow service.

use clap::{Parser, Subcommand};

mod serve;

/// Leadflow - outbound lead engagement engine.
#[derive(Parser, Debug)]
#[command(name = "leadflow", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the engagement engine and HTTP gateway.
    Serve,
    /// Print the effective configuration after merging all sources.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match leadflow_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            leadflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(err) = serve::run_serve(config).await {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                eprintln!("error: failed to render config: {err}");
                std::process::exit(1);
            }
        },
        None => {
            println!("leadflow: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        let config =
            leadflow_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.engine.orchestrator_interval_secs, 60);
    }
}
