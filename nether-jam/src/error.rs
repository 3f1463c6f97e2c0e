//! Error types
//!
//! Every fallible stage has its own enum so callers can decide how far a
//! failure reaches: an unsupported pitch only blanks one clone's fingering,
//! a malformed timeline disables one instrument part, and a bad config file
//! stops the tool that tried to load it.

use thiserror::Error;

/// A pitch the instrument family has no fingering for.
///
/// Recoverable: the clone is still shown, in its rest pose.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("pitch {pitch} has no fingering on {family}")]
pub struct UnsupportedPitchError {
    pub pitch: u8,
    pub family: String,
}

/// Input that cannot be turned into an event timeline.
///
/// Fatal for the instrument part being built, never for the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedTimelineError {
    #[error("record {index} at {time} comes before the previous record at {previous}")]
    NonMonotonic {
        index: usize,
        time: f64,
        previous: f64,
    },
    #[error("record {index} has a non-finite time")]
    NonFiniteTime { index: usize },
    #[error("note-off for pitch {pitch} at {time} (record {index}) has no matching note-on")]
    UnmatchedNoteOff { index: usize, pitch: u8, time: f64 },
    #[error("record {index} has pitch {pitch} (max 127)")]
    PitchOutOfRange { index: usize, pitch: u8 },
    #[error("record {index} has velocity {velocity} (max 127)")]
    VelocityOutOfRange { index: usize, velocity: u8 },
}

/// Problems in a fingering table definition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FingeringError {
    #[error("fingering for pitch {pitch} uses undeclared key '{key}'")]
    UnknownKey { pitch: u8, key: String },
    #[error("pitch {0} is fingered more than once")]
    DuplicatePitch(u8),
    #[error("key '{0}' is declared more than once")]
    DuplicateKey(String),
    #[error("too many keys declared: {0} (max 256)")]
    TooManyKeys(usize),
    #[error("depth {depth} for pitch {pitch} is outside 0.0..=1.0")]
    DepthOutOfRange { pitch: u8, depth: f32 },
    #[error("playable range {low}..={high} is empty")]
    EmptyRange { low: u8, high: u8 },
    #[error("pitch {pitch} lies outside the declared range {low}..={high}")]
    OutsideRange { pitch: u8, low: u8, high: u8 },
}

/// Problems loading an instrument family descriptor.
#[derive(Error, Debug)]
pub enum FamilyError {
    #[error("failed to read family descriptor: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse family descriptor: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("family '{family}' has an invalid fingering table: {source}")]
    Fingering {
        family: String,
        #[source]
        source: FingeringError,
    },
    #[error("family '{0}' needs a clone capacity of at least 1")]
    ZeroCapacity(String),
    #[error("unknown bundled family '{0}'")]
    UnknownBundled(String),
}

/// Problems loading the engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Contract violations on the clone pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("slot {index} out of range (capacity {capacity})")]
    SlotOutOfRange { index: usize, capacity: usize },
    #[error("slot {index} is already occupied by note {occupant}")]
    SlotBusy { index: usize, occupant: u32 },
    #[error("note {note} is already live in slot {slot}")]
    AlreadyAssigned { note: u32, slot: usize },
}

/// Umbrella error for callers that drive the whole pipeline.
#[derive(Error, Debug)]
pub enum JamError {
    #[error(transparent)]
    Timeline(#[from] MalformedTimelineError),
    #[error(transparent)]
    Family(#[from] FamilyError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("failed to parse event list: {0}")]
    Events(#[from] serde_json::Error),
}
