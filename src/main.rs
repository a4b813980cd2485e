// SPDX-License-Identifier: GPL-3.0-only

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "sketch-sensors")]
#[command(about = "Gesture-gated sensor access and landmark mapping for sketches")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/sketch-sensors/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by the layout and map commands
#[derive(Args, Debug, Clone)]
pub struct LayoutArgs {
    /// Source frame resolution, e.g. 640x480
    #[arg(long)]
    source: String,

    /// Output surface size, e.g. 405x720 (default: from config)
    #[arg(long)]
    surface: Option<String>,

    /// Fit policy: fit-height, fit-width, cover, contain or fixed (default: from config)
    #[arg(long)]
    policy: Option<String>,

    /// Display size for the fixed policy, e.g. 320x240
    #[arg(long)]
    fixed: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved layout as JSON
    Layout {
        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Map a source-pixel point onto the surface
    Map {
        #[command(flatten)]
        layout: LayoutArgs,

        /// Mirror horizontally around the surface midline
        #[arg(long)]
        mirror: bool,

        /// Source x coordinate
        #[arg(allow_negative_numbers = true)]
        x: f64,

        /// Source y coordinate
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },

    /// Run a scripted session against the simulated platform
    Simulate {
        /// Deny the first camera request, then retry on the next tap
        #[arg(long)]
        deny_first: bool,

        /// Report this sensor class as unsupported
        #[arg(long)]
        unsupported: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=sketch_sensors=debug, RUST_LOG=info
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
    let config = sketch_sensors::Config::load(cli.config.as_deref());

    match cli.command {
        Commands::Layout { layout } => cli::print_layout(&config, &layout),
        Commands::Map {
            layout,
            mirror,
            x,
            y,
        } => cli::print_mapped(&config, &layout, mirror, x, y),
        Commands::Simulate {
            deny_first,
            unsupported,
        } => cli::simulate(&config, deny_first, unsupported.as_deref()),
    }
}
