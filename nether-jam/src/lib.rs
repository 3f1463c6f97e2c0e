//! Nether-Jam: polyphony-to-clone allocation for instrument visualizers
//!
//! Monophonic instrument models can only show one note at a time. This crate
//! shows a chord by spawning clones of the instrument, one per sounding note,
//! and drives each clone's keys, bell and tilt from the note it plays.
//!
//! # Pipeline
//!
//! ```text
//!   MidiRecord stream (one part, channel-filtered)
//!            │
//!     TimelineBuilder / EventTimeline::from_records
//!            │
//!            ▼
//!      EventTimeline ───────────────┐
//!            │                      │
//!     Allocator::allocate     InstrumentFamily
//!            │              (fingering, capacity,
//!            ▼               stagger, envelope)
//!       Assignment                  │
//!            │                      │
//!            └──────► Animator ◄────┘
//!                         │
//!                  frame_at(t) -> AnimationFrame
//! ```
//!
//! Allocation runs once ahead of playback; frame evaluation is a pure
//! function of time, so seeking and scrubbing need no replay.

pub mod allocator;
pub mod animator;
pub mod config;
pub mod envelope;
pub mod error;
pub mod family;
pub mod fingering;
pub mod performance;
pub mod pool;
pub mod timeline;

pub use allocator::{
    Allocator, AllocatorConfig, Assignment, CapacityOverflow, NoteFate, OverflowOutcome,
    OverflowPolicy, StealReason, Tenancy,
};
pub use animator::{AnimationFrame, Animator, FingeringStatus, SlotFrame};
pub use config::{AnimationConfig, EngineConfig};
pub use envelope::{EnvelopeConfig, Motion};
pub use error::{
    ConfigError, FamilyError, FingeringError, JamError, MalformedTimelineError, PoolError,
    UnsupportedPitchError,
};
pub use family::{
    EnvelopeOverride, FamilyDescriptor, InstrumentFamily, Placement, StaggerGeometry, StaggerMode,
    BUNDLED_FAMILIES,
};
pub use fingering::{FingeringTable, KeyId, KeyPress, Pose};
pub use performance::{Part, PartFrame, PartInput, PartState, Performance};
pub use pool::{ClonePool, CloneSlot, Occupant};
pub use timeline::{EventTimeline, MidiRecord, NoteEvent, NoteId, TimelineBuilder, TimelineCursor};
