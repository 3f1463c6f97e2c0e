//! Families command - list bundled instrument families

use anyhow::Result;
use clap::Args;
use nether_jam::{BUNDLED_FAMILIES, FamilyDescriptor, InstrumentFamily};

/// Arguments for the families command
#[derive(Args)]
pub struct FamiliesArgs {
    /// Print the descriptor source of this family
    #[arg(long)]
    pub show: Option<String>,
}

/// Execute the families command
pub fn execute(args: FamiliesArgs) -> Result<()> {
    if let Some(name) = &args.show {
        let Some((_, source)) = BUNDLED_FAMILIES
            .iter()
            .find(|(bundled, _)| *bundled == name.as_str())
        else {
            anyhow::bail!("Unknown bundled family '{}'", name);
        };
        print!("{}", source);
        return Ok(());
    }

    println!("=== Bundled Families ===");
    for (name, _) in BUNDLED_FAMILIES {
        let family = FamilyDescriptor::bundled(name)?;
        let range = family
            .fingering()
            .range()
            .map_or_else(|| "-".to_string(), |r| format!("{}-{}", r.start(), r.end()));
        println!(
            "  {:<12} clones {}  keys {:>2}  range {:<7} stagger {:?}",
            name,
            family.clone_capacity(),
            family.fingering().key_count(),
            range,
            family.stagger_mode()
        );
    }
    Ok(())
}
