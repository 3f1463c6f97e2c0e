//! Performance manifest parsing
//!
//! ```toml
//! config = "jam.toml"        # optional, relative to the manifest
//!
//! [[parts]]
//! name = "lead"
//! family = "tenor_sax"       # bundled name or path to a family .toml
//! events = "lead.json"
//! stream_end = 96.0          # optional, closes notes left sounding
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Performance manifest structure
#[derive(Debug, Deserialize)]
pub struct PerformanceManifest {
    /// Engine config file
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub parts: Vec<PartEntry>,
}

/// Single part entry
#[derive(Debug, Deserialize)]
pub struct PartEntry {
    pub name: String,
    pub family: String,
    pub events: String,
    /// End of this part's event stream
    #[serde(default)]
    pub stream_end: Option<f64>,
}

impl PerformanceManifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content).context("Failed to parse manifest")?;
        if manifest.parts.is_empty() {
            anyhow::bail!("Manifest declares no [[parts]]");
        }
        Ok(manifest)
    }

    /// Resolve a manifest-relative path
    pub fn resolve(base_dir: &Path, path: &str) -> PathBuf {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = PerformanceManifest::parse(
            r#"
config = "jam.toml"

[[parts]]
name = "lead"
family = "tenor_sax"
events = "lead.json"

[[parts]]
name = "harmony"
family = "families/alto.toml"
events = "harmony.json"
stream_end = 32.0
"#,
        )
        .unwrap();

        assert_eq!(manifest.config.as_deref(), Some("jam.toml"));
        assert_eq!(manifest.parts.len(), 2);
        assert_eq!(manifest.parts[1].family, "families/alto.toml");
        assert_eq!(manifest.parts[0].stream_end, None);
        assert_eq!(manifest.parts[1].stream_end, Some(32.0));
    }

    #[test]
    fn test_manifest_needs_parts() {
        assert!(PerformanceManifest::parse("config = \"jam.toml\"").is_err());
        assert!(PerformanceManifest::parse("[[parts]]\nname = \"x\"").is_err());
    }

    #[test]
    fn test_resolve_relative_to_manifest() {
        let path = PerformanceManifest::resolve(Path::new("/songs/blues"), "lead.json");
        assert_eq!(path, PathBuf::from("/songs/blues/lead.json"));
    }
}
