//! Image relay (v1)
//!
//! Reverse-proxy relay that serves images by opaque ID from an upstream
//! content store.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client                        IMAGE RELAY                          Content
//!   GET /<id>                                                          store
//!  ──────────▶ net::listener ─▶ http::server ─▶ relay::handler
//!                                                 │
//!                                                 ├─ relay::identifier (gate)
//!                                                 ├─ relay::resolver   (candidates)
//!                                                 └─ upstream::client ─────────▶ GET /u/<path>
//!  ◀────────── 200 + streamed body / 404 ◀────────────────────────────────────── image/*
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use image_relay::config::{self, RelayConfig};
use image_relay::lifecycle;
use image_relay::observability::logging;
use image_relay::probe;

#[derive(Parser)]
#[command(name = "image-relay")]
#[command(about = "Relay images from an upstream content store", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults are used when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay (default)
    Serve,
    /// Validate the configuration and print the effective settings
    Check,
    /// Fetch one identifier from upstream and report each candidate attempt
    Probe {
        /// Identifier as a client would request it (without leading '/')
        id: String,

        /// Write the image body to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = config::load_or_default(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            logging::init_logging(&config.observability)?;
            tracing::info!("image-relay v{} starting", env!("CARGO_PKG_VERSION"));
            lifecycle::serve(config).await?;
            tracing::info!("Shutdown complete");
        }
        Commands::Check => {
            println!("{}", toml::to_string_pretty(&config)?);
            eprintln!("Configuration OK");
        }
        Commands::Probe { id, output } => {
            logging::init_logging(&config.observability)?;
            run_probe(&config, &id, output).await?;
        }
    }

    Ok(())
}

async fn run_probe(
    config: &RelayConfig,
    id: &str,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = probe::probe(config, id, output.as_deref()).await?;

    for attempt in &report.attempts {
        match &attempt.result {
            Ok((content_type, bytes)) => {
                println!("{}  OK  {} ({} bytes)", attempt.target, content_type, bytes)
            }
            Err(e) => println!("{}  FAIL  {} ({})", attempt.target, e.label(), e),
        }
    }

    match report.success() {
        Some(found) => {
            if let Some(path) = output {
                println!("Wrote {} to {}", found.candidate, path.display());
            }
            Ok(())
        }
        None => Err(format!("no candidate for '{id}' succeeded").into()),
    }
}
