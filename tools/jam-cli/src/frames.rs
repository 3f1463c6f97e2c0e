//! Frames command - sample animation frames as JSON lines

use anyhow::{Context, Result};
use clap::Args;
use nether_jam::{Allocator, Animator};
use std::io::Write;
use std::sync::Arc;

use crate::input::PartArgs;

/// Arguments for the frames command
#[derive(Args)]
pub struct FramesArgs {
    #[command(flatten)]
    pub part: PartArgs,

    /// Sample rate in frames per timeline unit
    #[arg(long, default_value_t = 60.0)]
    pub fps: f64,

    /// First sample time (defaults to the first note)
    #[arg(long)]
    pub from: Option<f64>,

    /// Last sample time (defaults to the last note end)
    #[arg(long)]
    pub to: Option<f64>,

    /// Skip frames where no clone is visible
    #[arg(long)]
    pub visible_only: bool,
}

/// Execute the frames command
pub fn execute(args: FramesArgs) -> Result<()> {
    if !(args.fps.is_finite() && args.fps > 0.0) {
        anyhow::bail!("--fps must be a positive number (got {})", args.fps);
    }

    let (records, family, config) = args.part.load()?;
    let timeline = args.part.timeline(&records)?;
    // Notes shorter than a frame still get one
    let allocation = config.allocation.for_frame_rate(args.fps);
    let assignment = Allocator::new(allocation).allocate(&timeline, &family)?;

    let from = args.from.or(timeline.start_time()).unwrap_or(0.0);
    let to = args.to.or(timeline.end_time()).unwrap_or(from);
    let animator = Animator::new(
        Arc::new(family),
        Arc::new(assignment),
        config.animation.presence_margin,
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut written = 0usize;
    for t in sample_times(from, to, args.fps) {
        let frame = animator.frame_at(t);
        if args.visible_only && frame.visible_count() == 0 {
            continue;
        }
        serde_json::to_writer(&mut out, &frame)?;
        writeln!(out).context("Failed to write frame")?;
        written += 1;
    }

    tracing::info!("Wrote {} frames ({:.3} to {:.3})", written, from, to);
    Ok(())
}

/// `from, from + 1/fps, ...` up to and including `to`
///
/// Times are computed by index, not by accumulation, so long ranges don't drift.
fn sample_times(from: f64, to: f64, fps: f64) -> impl Iterator<Item = f64> {
    let count = if to >= from {
        ((to - from) * fps).floor() as usize + 1
    } else {
        0
    };
    (0..count).map(move |i| from + i as f64 / fps)
}
