//! Shared input loading for the part commands

use anyhow::{Context, Result};
use clap::Args;
use nether_jam::{EngineConfig, EventTimeline, FamilyDescriptor, MidiRecord, config};
use std::path::{Path, PathBuf};

/// Arguments shared by commands that work on one part
#[derive(Args)]
pub struct PartArgs {
    /// JSON event file (array of note records)
    pub events: PathBuf,

    /// Bundled family name or path to a family .toml
    #[arg(long, short, default_value = "tenor_sax")]
    pub family: String,

    /// Engine config (defaults are used when omitted)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// End of the event stream; notes still sounding there end with it
    #[arg(long)]
    pub stream_end: Option<f64>,
}

impl PartArgs {
    pub fn load(&self) -> Result<(Vec<MidiRecord>, FamilyDescriptor, EngineConfig)> {
        let records = load_records(&self.events)?;
        let config = load_config(self.config.as_deref())?;
        let family = resolve_family(&self.family, &config)?;
        Ok((records, family, config))
    }

    /// Validate `records` into a timeline, closed at `--stream-end` if given
    pub fn timeline(&self, records: &[MidiRecord]) -> Result<EventTimeline> {
        EventTimeline::from_records_until(records, self.stream_end)
            .with_context(|| format!("Malformed events: {}", self.events.display()))
    }
}

/// Read a JSON event file
pub fn load_records(path: &Path) -> Result<Vec<MidiRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read events: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse events: {}", path.display()))
}

/// Explicit config files must load; no file means defaults
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => config::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Bundled family by name, or a descriptor file by path
///
/// An envelope in the engine config replaces the family's own.
pub fn resolve_family(name_or_path: &str, config: &EngineConfig) -> Result<FamilyDescriptor> {
    let family = if name_or_path.ends_with(".toml") {
        FamilyDescriptor::load(name_or_path)
            .with_context(|| format!("Failed to load family: {}", name_or_path))?
    } else {
        FamilyDescriptor::bundled(name_or_path)?
    };

    Ok(match config.animation.envelope {
        Some(envelope) => family.with_envelope(envelope),
        None => family,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nether_jam::InstrumentFamily;

    #[test]
    fn test_resolve_bundled_family() {
        let family = resolve_family("flute", &EngineConfig::default()).unwrap();
        assert_eq!(family.name(), "flute");
        assert!(resolve_family("theremin", &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_config_envelope_overrides_family() {
        let config = config::from_toml_str("[animation.envelope]\nattack = 0.3").unwrap();
        let family = resolve_family("tenor_sax", &config).unwrap();
        assert_eq!(family.envelope().attack, 0.3);
    }

    #[test]
    fn test_stream_end_closes_part() {
        let args = PartArgs {
            events: PathBuf::from("part.json"),
            family: "flute".to_string(),
            config: None,
            stream_end: Some(3.0),
        };
        let timeline = args.timeline(&[MidiRecord::on(0.0, 72, 100)]).unwrap();
        assert!(timeline.unbounded().is_empty());
        assert_eq!(timeline.end_time(), Some(3.0));

        let args = PartArgs {
            stream_end: None,
            ..args
        };
        let timeline = args.timeline(&[MidiRecord::on(0.0, 72, 100)]).unwrap();
        assert_eq!(timeline.unbounded().len(), 1);
    }

    #[test]
    fn test_load_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.json");
        std::fs::write(
            &path,
            r#"[{"time": 0.0, "pitch": 60, "velocity": 90, "is_note_on": true}]"#,
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records, vec![MidiRecord::on(0.0, 60, 90)]);
        assert!(load_records(&dir.path().join("missing.json")).is_err());
    }
}
