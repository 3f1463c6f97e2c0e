//! Allocate command - print which clone plays which note

use anyhow::Result;
use clap::Args;
use nether_jam::{Allocator, InstrumentFamily, NoteFate, OverflowOutcome};

use crate::input::PartArgs;

/// Arguments for the allocate command
#[derive(Args)]
pub struct AllocateArgs {
    #[command(flatten)]
    pub part: PartArgs,

    /// Print the full assignment as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Execute the allocate command
pub fn execute(args: AllocateArgs) -> Result<()> {
    let (records, family, config) = args.part.load()?;
    let timeline = args.part.timeline(&records)?;
    let assignment = Allocator::new(config.allocation).allocate(&timeline, &family)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&assignment)?);
        return Ok(());
    }

    println!("=== Allocation ===");
    println!("  Family: {}", family.name());
    println!("  Clones: {}", family.clone_capacity());
    println!("  Notes: {}", timeline.len());
    println!("  Peak polyphony: {}", timeline.peak_polyphony());
    println!("  Stolen: {}", assignment.stolen_count());
    println!("  Dropped: {}", assignment.dropped_count());

    for slot in 0..assignment.capacity() {
        println!();
        println!("  Clone {}:", slot);
        for tenancy in assignment.tenancies(slot) {
            let end = tenancy
                .end
                .map_or_else(|| "...".to_string(), |end| format!("{:.3}", end));
            let marker = if tenancy.stolen { " (stolen)" } else { "" };
            println!(
                "    {:>8.3} - {:<8} {} pitch {}{}",
                tenancy.start, end, tenancy.note, tenancy.pitch, marker
            );
        }
    }

    if !assignment.overflows().is_empty() {
        println!();
        println!("  Overflows:");
        for overflow in assignment.overflows() {
            match overflow.outcome {
                OverflowOutcome::Stolen {
                    slot,
                    victim,
                    reason,
                } => println!(
                    "    {:>8.3} {} took clone {} from {} ({:?})",
                    overflow.time, overflow.incoming, slot, victim, reason
                ),
                OverflowOutcome::Dropped => {
                    println!("    {:>8.3} {} dropped", overflow.time, overflow.incoming)
                }
            }
        }
    }

    let dropped: Vec<String> = assignment
        .fates()
        .iter()
        .enumerate()
        .filter(|(_, fate)| matches!(fate, NoteFate::Dropped))
        .map(|(id, _)| format!("#{}", id))
        .collect();
    if !dropped.is_empty() {
        println!();
        println!("  Never shown: {}", dropped.join(", "));
    }

    Ok(())
}
