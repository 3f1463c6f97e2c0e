//! Fingering tables: pitch → pressed-key pose
//!
//! One table per instrument family, loaded once and shared read-only by every
//! clone of that family. Keys are declared by name up front and referenced by
//! a compact [`KeyId`] (the declaration index) everywhere else.
//!
//! # Definition format
//!
//! ```toml
//! keys = ["octave", "b", "a", "g"]
//! range = [59, 72]          # optional, defaults to the fingered pitches
//!
//! [[notes]]
//! pitch = 71
//! keys = ["b"]
//!
//! [[notes]]
//! pitch = 69
//! keys = ["b", "a"]
//! depth = 0.8               # optional, defaults to 1.0
//! ```

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::RangeInclusive;

use crate::error::{FingeringError, UnsupportedPitchError};

/// Index of a key in its family's declaration list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(pub u8);

/// One pressed key and how far it is pressed (0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: KeyId,
    pub depth: f32,
}

/// Discrete key/valve pose for one pitch
///
/// Keys are kept sorted by id so equal poses compare equal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    keys: SmallVec<[KeyPress; 8]>,
}

impl Pose {
    /// Nothing pressed
    pub fn rest() -> Self {
        Self::default()
    }

    /// Build from presses; later duplicates of a key are ignored
    pub fn from_presses(presses: impl IntoIterator<Item = KeyPress>) -> Self {
        let mut keys: SmallVec<[KeyPress; 8]> = presses.into_iter().collect();
        keys.sort_by_key(|press| press.key);
        keys.dedup_by_key(|press| press.key);
        Self { keys }
    }

    pub fn is_rest(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn presses(&self) -> &[KeyPress] {
        &self.keys
    }

    pub fn is_pressed(&self, key: KeyId) -> bool {
        self.depth_of(key) > 0.0
    }

    /// Press depth of `key`, 0.0 when not pressed
    pub fn depth_of(&self, key: KeyId) -> f32 {
        self.keys
            .binary_search_by_key(&key, |press| press.key)
            .map(|i| self.keys[i].depth)
            .unwrap_or(0.0)
    }
}

/// Serialized form of one pitch's fingering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteFingeringDef {
    pub pitch: u8,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default = "default_depth")]
    pub depth: f32,
}

fn default_depth() -> f32 {
    1.0
}

/// Serialized form of a whole table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FingeringDef {
    /// Key names, in [`KeyId`] order
    #[serde(default)]
    pub keys: Vec<String>,
    /// Playable range (inclusive); defaults to the lowest..=highest fingered pitch
    #[serde(default)]
    pub range: Option<[u8; 2]>,
    #[serde(default)]
    pub notes: Vec<NoteFingeringDef>,
}

/// Pitch → pose lookup for one instrument family
#[derive(Debug, Clone)]
pub struct FingeringTable {
    family: String,
    keys: Vec<String>,
    range: Option<(u8, u8)>,
    poses: HashMap<u8, Pose>,
    rest: Pose,
}

impl FingeringTable {
    /// Validate a definition and build the lookup
    pub fn from_def(family: &str, def: &FingeringDef) -> Result<Self, FingeringError> {
        if def.keys.len() > u8::MAX as usize + 1 {
            return Err(FingeringError::TooManyKeys(def.keys.len()));
        }

        let mut key_ids: HashMap<&str, KeyId> = HashMap::with_capacity(def.keys.len());
        for (i, name) in def.keys.iter().enumerate() {
            if key_ids.insert(name.as_str(), KeyId(i as u8)).is_some() {
                return Err(FingeringError::DuplicateKey(name.clone()));
            }
        }

        let declared = match def.range {
            Some([low, high]) if low > high => {
                return Err(FingeringError::EmptyRange { low, high });
            }
            Some([low, high]) => Some((low, high)),
            None => None,
        };

        let mut poses = HashMap::with_capacity(def.notes.len());
        for note in &def.notes {
            if let Some((low, high)) = declared {
                if note.pitch < low || note.pitch > high {
                    return Err(FingeringError::OutsideRange {
                        pitch: note.pitch,
                        low,
                        high,
                    });
                }
            }
            if !(0.0..=1.0).contains(&note.depth) {
                return Err(FingeringError::DepthOutOfRange {
                    pitch: note.pitch,
                    depth: note.depth,
                });
            }

            let mut presses = SmallVec::<[KeyPress; 8]>::new();
            for name in &note.keys {
                let key = *key_ids
                    .get(name.as_str())
                    .ok_or_else(|| FingeringError::UnknownKey {
                        pitch: note.pitch,
                        key: name.clone(),
                    })?;
                presses.push(KeyPress {
                    key,
                    depth: note.depth,
                });
            }

            if poses
                .insert(note.pitch, Pose::from_presses(presses))
                .is_some()
            {
                return Err(FingeringError::DuplicatePitch(note.pitch));
            }
        }

        let range = declared.or_else(|| {
            let low = poses.keys().min()?;
            let high = poses.keys().max()?;
            Some((*low, *high))
        });

        Ok(Self {
            family: family.to_string(),
            keys: def.keys.clone(),
            range,
            poses,
            rest: Pose::rest(),
        })
    }

    /// Shorthand for tables written in code
    pub fn from_entries(
        family: &str,
        keys: &[&str],
        entries: &[(u8, &[&str])],
    ) -> Result<Self, FingeringError> {
        let def = FingeringDef {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            range: None,
            notes: entries
                .iter()
                .map(|(pitch, keys)| NoteFingeringDef {
                    pitch: *pitch,
                    keys: keys.iter().map(|k| k.to_string()).collect(),
                    depth: default_depth(),
                })
                .collect(),
        };
        Self::from_def(family, &def)
    }

    /// Pose for `pitch`, without building an error on a miss
    pub fn lookup(&self, pitch: u8) -> Option<&Pose> {
        let (low, high) = self.range?;
        if !(low..=high).contains(&pitch) {
            return None;
        }
        self.poses.get(&pitch)
    }

    /// Pose for `pitch`
    ///
    /// # Errors
    ///
    /// [`UnsupportedPitchError`] when the pitch is outside the playable range
    /// or has no entry. Render the rest pose instead.
    pub fn pose_for(&self, pitch: u8) -> Result<&Pose, UnsupportedPitchError> {
        self.lookup(pitch).ok_or_else(|| UnsupportedPitchError {
            pitch,
            family: self.family.clone(),
        })
    }

    pub fn supports(&self, pitch: u8) -> bool {
        self.lookup(pitch).is_some()
    }

    pub fn rest_pose(&self) -> &Pose {
        &self.rest
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Playable range, None for a table that fingers nothing
    pub fn range(&self) -> Option<RangeInclusive<u8>> {
        self.range.map(|(low, high)| low..=high)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn key_name(&self, key: KeyId) -> Option<&str> {
        self.keys.get(key.0 as usize).map(String::as_str)
    }

    pub fn key_id(&self, name: &str) -> Option<KeyId> {
        self.keys
            .iter()
            .position(|k| k == name)
            .map(|i| KeyId(i as u8))
    }
}

#[cfg(test)]
mod tests;
