//! Perform command - prepare every part of a manifest and sample it
//!
//! Parts whose events are malformed are reported and rendered silent; the
//! rest of the performance still plays.

use anyhow::{Context, Result};
use clap::Args;
use nether_jam::{InstrumentFamily, PartInput, Performance};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::input::{load_config, load_records, resolve_family};
use crate::manifest::PerformanceManifest;

/// Arguments for the perform command
#[derive(Args)]
pub struct PerformArgs {
    /// Performance manifest (.toml)
    pub manifest: PathBuf,

    /// Print the frame of every part at this time as JSON
    #[arg(long)]
    pub at: Option<f64>,
}

/// Execute the perform command
pub fn execute(args: PerformArgs) -> Result<()> {
    let manifest = PerformanceManifest::load(&args.manifest)?;
    let base_dir = args.manifest.parent().unwrap_or(Path::new("."));

    let config_path = manifest
        .config
        .as_deref()
        .map(|path| PerformanceManifest::resolve(base_dir, path));
    let config = load_config(config_path.as_deref())?;

    let mut inputs = Vec::with_capacity(manifest.parts.len());
    for part in &manifest.parts {
        let family_path = if part.family.ends_with(".toml") {
            PerformanceManifest::resolve(base_dir, &part.family)
                .to_string_lossy()
                .into_owned()
        } else {
            part.family.clone()
        };
        // Envelope overrides are applied by the performance itself
        let family = resolve_family(&family_path, &Default::default())
            .with_context(|| format!("Part '{}'", part.name))?;
        let records = load_records(&PerformanceManifest::resolve(base_dir, &part.events))?;
        let mut input = PartInput::new(part.name.clone(), Arc::new(family), records);
        if let Some(end) = part.stream_end {
            input = input.with_stream_end(end);
        }
        inputs.push(input);
    }

    let performance = Performance::prepare(inputs, &config);

    if let Some(t) = args.at {
        println!("{}", serde_json::to_string_pretty(&performance.frame_at(t))?);
        return Ok(());
    }

    println!("=== Performance ===");
    for part in performance.parts() {
        match part.animator() {
            Some(animator) => {
                let assignment = animator.assignment();
                println!(
                    "  {:<16} {:<12} notes {:>5}  stolen {:>4}  dropped {:>4}",
                    part.name(),
                    part.family().name(),
                    assignment.fates().len(),
                    assignment.stolen_count(),
                    assignment.dropped_count()
                );
            }
            None => println!("  {:<16} {:<12} FAILED", part.name(), part.family().name()),
        }
    }

    let failures = performance.failures();
    if !failures.is_empty() {
        println!();
        for (name, error) in failures {
            println!("  {}: {}", name, error);
        }
    }
    println!();
    println!("  Overflows: {}", performance.overflow_count());

    let end = performance
        .parts()
        .iter()
        .filter_map(|part| part.animator())
        .filter_map(|animator| {
            animator
                .assignment()
                .iter_tenancies()
                .filter_map(|(_, tenancy)| tenancy.end)
                .reduce(f64::max)
        })
        .reduce(f64::max);
    if let Some(end) = end {
        println!("  Ends at: {:.3}", end);
    }

    Ok(())
}
