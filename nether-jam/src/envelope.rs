//! Time-parameterized motion envelopes
//!
//! Every value here is a pure function of `(start, end, t)` so a frame can be
//! recomputed for any time, in any order, with bit-identical results.

use glam::Quat;
use serde::{Deserialize, Serialize};

/// Continuous motion of one clone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    /// Key travel scale applied to the pose depths (0.0-1.0)
    pub key_travel: f32,
    /// Bell scale along its axis (1.0 = at rest)
    pub bell_stretch: f32,
    /// Clone rotation relative to its rest orientation
    pub rotation: Quat,
}

impl Motion {
    /// Clone at rest
    pub const REST: Self = Self {
        key_travel: 0.0,
        bell_stretch: 1.0,
        rotation: Quat::IDENTITY,
    };
}

impl Default for Motion {
    fn default() -> Self {
        Self::REST
    }
}

/// Envelope settings for one instrument family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Key press travel time (default: 0.04)
    #[serde(default = "default_attack")]
    pub attack: f64,
    /// Key lift travel time before the note ends (default: 0.04)
    #[serde(default = "default_release")]
    pub release: f64,
    /// Bell stretch at note start, decaying to 0 over the note (default: 0.0)
    #[serde(default)]
    pub stretch_factor: f32,
    /// Decay time of the stretch for notes without an end (default: 0.5)
    #[serde(default = "default_stretch_decay")]
    pub stretch_decay: f64,
    /// Forward tilt at full key travel, in degrees (default: 0.0)
    #[serde(default)]
    pub tilt_degrees: f32,
}

fn default_attack() -> f64 {
    0.04
}
fn default_release() -> f64 {
    0.04
}
fn default_stretch_decay() -> f64 {
    0.5
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack: default_attack(),
            release: default_release(),
            stretch_factor: 0.0,
            stretch_decay: default_stretch_decay(),
            tilt_degrees: 0.0,
        }
    }
}

/// Cubic ease, clamped to [0, 1]
#[inline]
pub fn smoothstep(x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

impl EnvelopeConfig {
    /// Attack and release times fitted into a note of length `duration`
    ///
    /// When both ramps don't fit they shrink proportionally, so the keys still
    /// reach full travel exactly once.
    fn fitted_ramps(&self, duration: f64) -> (f64, f64) {
        let attack = self.attack.max(0.0);
        let release = self.release.max(0.0);
        let total = attack + release;
        if total <= duration || total <= 0.0 {
            (attack, release)
        } else {
            let scale = duration / total;
            (attack * scale, release * scale)
        }
    }

    /// Key travel at `t` for a note visible on `[start, end)`
    ///
    /// `end` is infinite for notes that never end.
    pub fn key_travel(&self, start: f64, end: f64, t: f64) -> f32 {
        let elapsed = t - start;
        if elapsed < 0.0 || t >= end {
            return 0.0;
        }

        let duration = end - start;
        let (attack, release) = self.fitted_ramps(duration);

        let press = if attack > 0.0 {
            smoothstep(elapsed / attack)
        } else {
            1.0
        };
        let lift = if end.is_finite() && release > 0.0 {
            smoothstep((end - t) / release)
        } else {
            1.0
        };

        press.min(lift) as f32
    }

    /// Bell stretch at `t`: `1 + stretch_factor * (1 - progress)`
    pub fn bell_stretch(&self, start: f64, end: f64, t: f64) -> f32 {
        if self.stretch_factor == 0.0 || t < start || t >= end {
            return 1.0;
        }

        let span = if end.is_finite() {
            end - start
        } else {
            self.stretch_decay
        };
        let progress = if span > 0.0 {
            ((t - start) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };

        1.0 + self.stretch_factor * (1.0 - progress as f32)
    }

    /// Forward tilt proportional to key travel
    pub fn tilt(&self, key_travel: f32) -> Quat {
        if self.tilt_degrees == 0.0 {
            return Quat::IDENTITY;
        }
        Quat::from_rotation_x(-(self.tilt_degrees * key_travel).to_radians())
    }

    /// Full motion sample
    pub fn motion(&self, start: f64, end: f64, t: f64) -> Motion {
        let key_travel = self.key_travel(start, end, t);
        Motion {
            key_travel,
            bell_stretch: self.bell_stretch(start, end, t),
            rotation: self.tilt(key_travel),
        }
    }
}
