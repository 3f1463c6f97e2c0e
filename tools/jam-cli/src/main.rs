//! Jam CLI - inspect clone allocation and animation frames
//!
//! # Commands
//!
//! - `jam families` - List bundled instrument families
//! - `jam allocate` - Allocate one part's notes onto clones, print the assignment
//! - `jam frames` - Sample animation frames for one part at a fixed rate
//! - `jam perform` - Prepare every part of a performance manifest and sample it
//!
//! # Usage
//!
//! ```bash
//! # Which clone plays which note?
//! jam allocate sax.json --family tenor_sax
//!
//! # One JSON frame per line at 30 fps between 2s and 4s
//! jam frames sax.json --family tenor_sax --fps 30 --from 2 --to 4
//!
//! # Several parts at once
//! jam perform band.toml --at 12.5
//! ```
//!
//! Event files are JSON arrays of `{time, pitch, velocity, is_note_on}`
//! records in time order, already filtered to one part.

mod allocate;
mod families;
mod frames;
mod input;
mod manifest;
mod perform;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Jam CLI - inspect clone allocation and animation frames
#[derive(Parser)]
#[command(name = "jam")]
#[command(about = "Inspect polyphony-to-clone allocation and animation frames")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bundled instrument families
    Families(families::FamiliesArgs),

    /// Allocate one part's notes onto clones and print the assignment
    Allocate(allocate::AllocateArgs),

    /// Sample animation frames for one part
    Frames(frames::FramesArgs),

    /// Prepare and sample every part of a performance manifest
    Perform(perform::PerformArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Families(args) => families::execute(args),
        Commands::Allocate(args) => allocate::execute(args),
        Commands::Frames(args) => frames::execute(args),
        Commands::Perform(args) => perform::execute(args),
    }
}
