//! Per-tick frame evaluation
//!
//! [`Animator::frame_at`] is a pure function of time: it reads the immutable
//! [`Assignment`] and the family's fingering table, and emits a declarative
//! [`AnimationFrame`] for the renderer. Seeking backwards, repeating a time or
//! skipping ahead all cost the same O(N log m) binary searches.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::allocator::{Assignment, Tenancy};
use crate::envelope::Motion;
use crate::family::{InstrumentFamily, Placement, StaggerMode};
use crate::fingering::Pose;
use crate::timeline::NoteId;

/// Whether a slot's pose came from the fingering table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FingeringStatus {
    /// Pose looked up for the sounding pitch
    Supported,
    /// Sounding pitch has no fingering; rest pose shown
    Unsupported,
    /// Nothing sounding
    Idle,
}

/// Render state of one clone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotFrame {
    pub slot: usize,
    pub note: Option<NoteId>,
    pub pitch: Option<u8>,
    pub visible: bool,
    pub fingering: FingeringStatus,
    pub pose: Pose,
    pub placement: Placement,
    pub motion: Motion,
}

impl SlotFrame {
    fn idle(slot: usize, placement: Placement) -> Self {
        Self {
            slot,
            note: None,
            pitch: None,
            visible: false,
            fingering: FingeringStatus::Idle,
            pose: Pose::rest(),
            placement,
            motion: Motion::REST,
        }
    }
}

/// Render state of one instrument part at one time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationFrame {
    pub time: f64,
    /// Whether the instrument model is shown at all
    pub instrument_visible: bool,
    pub slots: Vec<SlotFrame>,
}

impl AnimationFrame {
    /// Hidden instrument with every clone at rest
    pub fn silent<F: InstrumentFamily + ?Sized>(time: f64, family: &F) -> Self {
        Self {
            time,
            instrument_visible: false,
            slots: (0..family.clone_capacity())
                .map(|slot| SlotFrame::idle(slot, family.placement_offset(slot)))
                .collect(),
        }
    }

    pub fn visible_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.visible).count()
    }

    /// Visible slot showing `note`
    pub fn slot_for(&self, note: NoteId) -> Option<&SlotFrame> {
        self.slots
            .iter()
            .find(|slot| slot.visible && slot.note == Some(note))
    }
}

/// Frame evaluator for one allocated part
pub struct Animator {
    family: Arc<dyn InstrumentFamily>,
    assignment: Arc<Assignment>,
    /// Merged `[start - margin, end + margin)` intervals, sorted
    presence: Vec<(f64, f64)>,
}

impl Animator {
    pub fn new(
        family: Arc<dyn InstrumentFamily>,
        assignment: Arc<Assignment>,
        presence_margin: f64,
    ) -> Self {
        let unsupported: BTreeSet<u8> = assignment
            .iter_tenancies()
            .map(|(_, tenancy)| tenancy.pitch)
            .filter(|&pitch| !family.fingering().supports(pitch))
            .collect();
        if !unsupported.is_empty() {
            tracing::warn!(
                "{}: no fingering for pitches {:?}, showing rest pose",
                family.name(),
                unsupported
            );
        }

        let presence = presence_intervals(&assignment, presence_margin.max(0.0));

        Self {
            family,
            assignment,
            presence,
        }
    }

    pub fn family(&self) -> &dyn InstrumentFamily {
        self.family.as_ref()
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Whether `t` lies within the presence margin of any tenancy
    pub fn instrument_visible(&self, t: f64) -> bool {
        let after = self.presence.partition_point(|&(start, _)| start <= t);
        after
            .checked_sub(1)
            .is_some_and(|i| t < self.presence[i].1)
    }

    /// Render state at `t`
    pub fn frame_at(&self, t: f64) -> AnimationFrame {
        let capacity = self.assignment.capacity();
        let live: Vec<Option<&Tenancy>> = (0..capacity)
            .map(|slot| self.assignment.tenancy_at(slot, t))
            .collect();

        let compact = self.family.stagger_mode() == StaggerMode::Compact;
        let mut rank = 0;
        let slots = live
            .iter()
            .enumerate()
            .map(|(slot, tenancy)| match tenancy {
                Some(tenancy) => {
                    let placement_index = if compact { rank } else { slot };
                    rank += 1;
                    self.slot_frame(slot, tenancy, self.placement(placement_index), t)
                }
                None => SlotFrame::idle(slot, self.placement(slot)),
            })
            .collect();

        AnimationFrame {
            time: t,
            instrument_visible: self.instrument_visible(t),
            slots,
        }
    }

    fn placement(&self, index: usize) -> Placement {
        self.assignment
            .placement(index)
            .unwrap_or_else(|| self.family.placement_offset(index))
    }

    fn slot_frame(&self, slot: usize, tenancy: &Tenancy, placement: Placement, t: f64) -> SlotFrame {
        // Unsupported pitches were reported once in `new`
        let (pose, fingering) = match self.family.fingering().lookup(tenancy.pitch) {
            Some(pose) => (pose.clone(), FingeringStatus::Supported),
            None => (Pose::rest(), FingeringStatus::Unsupported),
        };

        SlotFrame {
            slot,
            note: Some(tenancy.note),
            pitch: Some(tenancy.pitch),
            visible: true,
            fingering,
            pose,
            placement,
            motion: self
                .family
                .envelope()
                .motion(tenancy.start, tenancy.visible_end(), t),
        }
    }
}

fn presence_intervals(assignment: &Assignment, margin: f64) -> Vec<(f64, f64)> {
    let mut intervals: Vec<(f64, f64)> = assignment
        .iter_tenancies()
        .map(|(_, tenancy)| (tenancy.start - margin, tenancy.visible_end() + margin))
        .collect();
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}
