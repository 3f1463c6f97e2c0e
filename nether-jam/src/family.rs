//! Instrument families as data
//!
//! The engine only needs a small capability set from an instrument family:
//! its fingering table, how many clones it may show, where each clone sits,
//! and how its motion envelopes are shaped. [`InstrumentFamily`] names that
//! set; [`FamilyDescriptor`] implements it from a TOML descriptor so adding an
//! instrument never needs new code.
//!
//! # Descriptor format
//!
//! ```toml
//! name = "flute"
//! clone_capacity = 4
//! meshes = ["Flute.obj"]
//!
//! [stagger]
//! mode = "compact"           # or "static"
//! base = [0.0, 0.0, 0.0]
//! step = [5.0, 0.0, -5.0]
//! yaw_step_degrees = 0.0
//! scale = 1.0
//!
//! [envelope]
//! attack = 0.02
//!
//! [fingering]
//! keys = ["thumb", "l1"]
//! [[fingering.notes]]
//! pitch = 72
//! keys = ["l1"]
//! ```

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::envelope::EnvelopeConfig;
use crate::error::FamilyError;
use crate::fingering::{FingeringDef, FingeringTable};

/// Descriptors compiled into the crate: (name, TOML source)
pub const BUNDLED_FAMILIES: &[(&str, &str)] = &[
    ("tenor_sax", include_str!("../families/tenor_sax.toml")),
    ("flute", include_str!("../families/flute.toml")),
];

/// Static placement of one clone relative to the instrument origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub translation: Vec3,
    pub rotation: Quat,
    /// Uniform scale of the clone mesh
    #[serde(default = "default_scale")]
    pub scale: f32,
}

impl Placement {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: 1.0,
    };
}

impl Default for Placement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// How visible clones pick their placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StaggerMode {
    /// Each slot always sits at its own placement
    #[default]
    Static,
    /// Visible clones close ranks: the n-th visible slot takes placement n
    Compact,
}

/// Stagger geometry: placement(i) = base + scale * step * i, yawed by yaw_step * i,
/// every clone sized by scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaggerGeometry {
    #[serde(default)]
    pub mode: StaggerMode,
    /// Origin of the clone group (default: zero)
    #[serde(default = "default_base")]
    pub base: Vec3,
    /// Translation between neighbouring clones (default: zero)
    #[serde(default = "default_step")]
    pub step: Vec3,
    /// Rotation about Y between neighbouring clones (default: 0)
    #[serde(default)]
    pub yaw_step_degrees: f32,
    /// Group scale, applied to the step and to every clone (default: 1.0)
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_base() -> Vec3 {
    Vec3::ZERO
}
fn default_step() -> Vec3 {
    Vec3::ZERO
}
fn default_scale() -> f32 {
    1.0
}

impl Default for StaggerGeometry {
    fn default() -> Self {
        Self {
            mode: StaggerMode::default(),
            base: default_base(),
            step: default_step(),
            yaw_step_degrees: 0.0,
            scale: default_scale(),
        }
    }
}

impl StaggerGeometry {
    pub fn placement(&self, index: usize) -> Placement {
        let i = index as f32;
        Placement {
            translation: self.base + self.step * (self.scale * i),
            rotation: Quat::from_rotation_y((self.yaw_step_degrees * i).to_radians()),
            scale: self.scale,
        }
    }
}

/// Capability set the engine needs from an instrument family
pub trait InstrumentFamily: Send + Sync {
    fn name(&self) -> &str;

    /// Shared, read-only fingering table
    fn fingering(&self) -> &FingeringTable;

    /// Number of clones the family may show at once (at least 1)
    fn clone_capacity(&self) -> usize;

    /// Static placement of clone `index`
    fn placement_offset(&self, index: usize) -> Placement;

    fn stagger_mode(&self) -> StaggerMode {
        StaggerMode::Static
    }

    fn envelope(&self) -> &EnvelopeConfig;
}

/// Serialized form of a family descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyDef {
    pub name: String,
    pub clone_capacity: usize,
    /// Mesh references, passed through to the renderer untouched
    #[serde(default)]
    pub meshes: Vec<String>,
    #[serde(default)]
    pub stagger: StaggerGeometry,
    #[serde(default)]
    pub envelope: EnvelopeConfig,
    #[serde(default)]
    pub fingering: FingeringDef,
}

/// Data-driven instrument family
#[derive(Debug, Clone)]
pub struct FamilyDescriptor {
    name: String,
    clone_capacity: usize,
    meshes: Vec<String>,
    stagger: StaggerGeometry,
    envelope: EnvelopeConfig,
    fingering: FingeringTable,
}

impl FamilyDescriptor {
    pub fn from_def(def: &FamilyDef) -> Result<Self, FamilyError> {
        if def.clone_capacity == 0 {
            return Err(FamilyError::ZeroCapacity(def.name.clone()));
        }
        let fingering = FingeringTable::from_def(&def.name, &def.fingering).map_err(|source| {
            FamilyError::Fingering {
                family: def.name.clone(),
                source,
            }
        })?;

        Ok(Self {
            name: def.name.clone(),
            clone_capacity: def.clone_capacity,
            meshes: def.meshes.clone(),
            stagger: def.stagger,
            envelope: def.envelope,
            fingering,
        })
    }

    pub fn from_toml_str(source: &str) -> Result<Self, FamilyError> {
        let def: FamilyDef = toml::from_str(source)?;
        Self::from_def(&def)
    }

    /// Load a descriptor file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FamilyError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// One of [`BUNDLED_FAMILIES`]
    pub fn bundled(name: &str) -> Result<Self, FamilyError> {
        let (_, source) = BUNDLED_FAMILIES
            .iter()
            .find(|(bundled, _)| *bundled == name)
            .ok_or_else(|| FamilyError::UnknownBundled(name.to_string()))?;
        Self::from_toml_str(source)
    }

    /// Replace the envelope (engine-wide overrides)
    pub fn with_envelope(mut self, envelope: EnvelopeConfig) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn meshes(&self) -> &[String] {
        &self.meshes
    }

    pub fn stagger(&self) -> &StaggerGeometry {
        &self.stagger
    }
}

impl InstrumentFamily for FamilyDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn fingering(&self) -> &FingeringTable {
        &self.fingering
    }

    fn clone_capacity(&self) -> usize {
        self.clone_capacity
    }

    fn placement_offset(&self, index: usize) -> Placement {
        self.stagger.placement(index)
    }

    fn stagger_mode(&self) -> StaggerMode {
        self.stagger.mode
    }

    fn envelope(&self) -> &EnvelopeConfig {
        &self.envelope
    }
}

/// Any family with its envelope replaced
pub struct EnvelopeOverride {
    inner: Arc<dyn InstrumentFamily>,
    envelope: EnvelopeConfig,
}

impl EnvelopeOverride {
    pub fn new(inner: Arc<dyn InstrumentFamily>, envelope: EnvelopeConfig) -> Self {
        Self { inner, envelope }
    }
}

impl InstrumentFamily for EnvelopeOverride {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fingering(&self) -> &FingeringTable {
        self.inner.fingering()
    }

    fn clone_capacity(&self) -> usize {
        self.inner.clone_capacity()
    }

    fn placement_offset(&self, index: usize) -> Placement {
        self.inner.placement_offset(index)
    }

    fn stagger_mode(&self) -> StaggerMode {
        self.inner.stagger_mode()
    }

    fn envelope(&self) -> &EnvelopeConfig {
        &self.envelope
    }
}

#[cfg(test)]
mod tests;
