// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "pod-capture")]
#[command(about = "Proof-of-delivery capture: scan an AWB, capture proof, upload it")]
#[command(version = pod_capture::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Use a still image as the camera instead of a live device
    #[arg(short, long, global = true)]
    source: Option<PathBuf>,

    /// Configuration file (default: ~/.config/pod-capture/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive workflow (default)
    Run,

    /// Decode the QR code in an image file
    Decode {
        /// Image to decode
        image: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=pod_capture=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Decode { image }) => cli::decode_image(&image),
        Some(Commands::Config) => cli::print_config(&config),
        Some(Commands::Run) | None => cli::run_session(config, cli.source.as_deref()),
    }
}
