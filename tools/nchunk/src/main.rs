//! nchunk - inspect and pack Nethercore chunk files
//!
//! # Commands
//!
//! - `nchunk info` - Validate the header and list the chunk table
//! - `nchunk extract` - Write one chunk's payload to a file or dump it as hex
//! - `nchunk pack` - Build a chunk file from a TOML manifest
//!
//! # Usage
//!
//! ```bash
//! # List chunks of a scene file
//! nchunk info level.scn --magic SCNE
//!
//! # Dump chunk 3 as hex
//! nchunk extract level.scn --magic SCNE --id 3
//!
//! # Pack chunks listed in a manifest
//! nchunk pack chunks.toml -o level.scn
//! ```
//!
//! Set `RUST_LOG=debug` (or `trace`) to see header and patch events.

mod extract;
mod info;
mod manifest;
mod pack;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// nchunk - inspect and pack Nethercore chunk files
#[derive(Parser)]
#[command(name = "nchunk")]
#[command(about = "Inspect and pack Nethercore chunk files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the header and list the chunk table
    Info(info::InfoArgs),

    /// Write one chunk's payload to a file or dump it as hex
    Extract(extract::ExtractArgs),

    /// Build a chunk file from a TOML manifest
    Pack(pack::PackArgs),
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info(args) => info::execute(args),
        Commands::Extract(args) => extract::execute(args),
        Commands::Pack(args) => pack::execute(args),
    }
}
