//! Multi-part performances
//!
//! A performance is every instrument part of one piece. Parts are prepared
//! (timeline, allocation, animator) in parallel ahead of playback. A part
//! whose input is malformed is kept as a failed part that renders silent
//! frames, so one bad track never takes the others down.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::allocator::Allocator;
use crate::animator::{AnimationFrame, Animator};
use crate::config::EngineConfig;
use crate::error::JamError;
use crate::family::{EnvelopeOverride, InstrumentFamily};
use crate::timeline::{EventTimeline, MidiRecord};

/// Input for one instrument part
#[derive(Clone)]
pub struct PartInput {
    pub name: String,
    pub family: Arc<dyn InstrumentFamily>,
    /// Channel-filtered note records in time order
    pub records: Vec<MidiRecord>,
    /// End of the input stream; notes still sounding there end with it
    pub stream_end: Option<f64>,
}

impl PartInput {
    pub fn new(
        name: impl Into<String>,
        family: Arc<dyn InstrumentFamily>,
        records: Vec<MidiRecord>,
    ) -> Self {
        Self {
            name: name.into(),
            family,
            records,
            stream_end: None,
        }
    }

    pub fn with_stream_end(mut self, end: f64) -> Self {
        self.stream_end = Some(end);
        self
    }
}

/// Outcome of preparing a part
pub enum PartState {
    Ready(Animator),
    Failed(JamError),
}

/// One prepared instrument part
pub struct Part {
    name: String,
    family: Arc<dyn InstrumentFamily>,
    state: PartState,
}

impl Part {
    fn prepare(input: PartInput, config: &EngineConfig) -> Self {
        let PartInput {
            name,
            family,
            records,
            stream_end,
        } = input;
        let family: Arc<dyn InstrumentFamily> = match config.animation.envelope {
            Some(envelope) => Arc::new(EnvelopeOverride::new(family, envelope)),
            None => family,
        };

        let state = match Self::build(&family, &records, stream_end, config) {
            Ok(animator) => {
                tracing::info!(
                    "Prepared part '{}' ({}, {} notes, {} overflows)",
                    name,
                    family.name(),
                    animator.assignment().fates().len(),
                    animator.assignment().overflows().len()
                );
                PartState::Ready(animator)
            }
            Err(e) => {
                tracing::warn!("Part '{}' disabled: {}", name, e);
                PartState::Failed(e)
            }
        };

        Self {
            name,
            family,
            state,
        }
    }

    fn build(
        family: &Arc<dyn InstrumentFamily>,
        records: &[MidiRecord],
        stream_end: Option<f64>,
        config: &EngineConfig,
    ) -> Result<Animator, JamError> {
        let timeline = EventTimeline::from_records_until(records, stream_end)?;
        let assignment = Allocator::new(config.allocation).allocate(&timeline, family.as_ref())?;
        Ok(Animator::new(
            family.clone(),
            Arc::new(assignment),
            config.animation.presence_margin,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> &dyn InstrumentFamily {
        self.family.as_ref()
    }

    pub fn state(&self) -> &PartState {
        &self.state
    }

    pub fn animator(&self) -> Option<&Animator> {
        match &self.state {
            PartState::Ready(animator) => Some(animator),
            PartState::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&JamError> {
        match &self.state {
            PartState::Failed(e) => Some(e),
            PartState::Ready(_) => None,
        }
    }

    /// Render state at `t`; failed parts are silent
    pub fn frame_at(&self, t: f64) -> AnimationFrame {
        match &self.state {
            PartState::Ready(animator) => animator.frame_at(t),
            PartState::Failed(_) => AnimationFrame::silent(t, self.family.as_ref()),
        }
    }
}

/// Frame of one named part
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartFrame {
    pub part: String,
    pub failed: bool,
    #[serde(flatten)]
    pub frame: AnimationFrame,
}

/// Every part of one piece
pub struct Performance {
    parts: Vec<Part>,
}

impl Performance {
    /// Prepare parts in parallel; input order is kept
    pub fn prepare(inputs: Vec<PartInput>, config: &EngineConfig) -> Self {
        let parts: Vec<Part> = inputs
            .into_par_iter()
            .map(|input| Part::prepare(input, config))
            .collect();

        let failed = parts.iter().filter(|part| part.error().is_some()).count();
        tracing::info!(
            "Performance ready: {} parts ({} failed)",
            parts.len(),
            failed
        );

        Self { parts }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|part| part.name == name)
    }

    /// One frame per part, in part order
    pub fn frame_at(&self, t: f64) -> Vec<PartFrame> {
        self.parts
            .iter()
            .map(|part| PartFrame {
                part: part.name.clone(),
                failed: part.error().is_some(),
                frame: part.frame_at(t),
            })
            .collect()
    }

    /// Parts that could not be prepared
    pub fn failures(&self) -> Vec<(&str, &JamError)> {
        self.parts
            .iter()
            .filter_map(|part| part.error().map(|e| (part.name(), e)))
            .collect()
    }

    /// Capacity overflows across all ready parts
    pub fn overflow_count(&self) -> usize {
        self.parts
            .iter()
            .filter_map(Part::animator)
            .map(|animator| animator.assignment().overflows().len())
            .sum()
    }
}
