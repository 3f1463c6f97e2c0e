//! Note-to-clone allocation
//!
//! A single greedy sweep over the timeline in identity order. Before each
//! note-on the pool frees every slot whose release time has passed; the note
//! then takes the lowest free slot. When every slot is busy the overflow
//! policy decides between stealing an occupant and dropping the newcomer.
//!
//! The sweep runs once per part ahead of playback. Its output, an
//! [`Assignment`], is immutable and answers "which note is in slot i at
//! time t" with a binary search.
//!
//! # Stealing order
//!
//! 1. The occupant releasing soonest, if it releases within `steal_lookahead`
//!    of the incoming start (ties: lower slot index).
//! 2. Otherwise the occupant that started earliest (ties: earlier note id).

use serde::{Deserialize, Serialize};

use crate::error::{JamError, PoolError};
use crate::family::{InstrumentFamily, Placement};
use crate::pool::{ClonePool, Occupant};
use crate::timeline::{EventTimeline, MidiRecord, NoteEvent, NoteId};

/// What happens when a note arrives and every slot is busy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Truncate an occupant and give its slot to the new note
    #[default]
    Steal,
    /// Keep every occupant; the new note is never shown
    DropNewest,
}

/// Allocation settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Window in which an about-to-end occupant is preferred as steal victim (default: 0.25)
    #[serde(default = "default_steal_lookahead")]
    pub steal_lookahead: f64,
    /// Shortest time a note keeps its slot (default: one 60 Hz tick)
    ///
    /// Set this to at least one frame period of the renderer, or notes
    /// shorter than a frame can fall between two frames and never show.
    /// [`AllocatorConfig::for_frame_rate`] does that.
    #[serde(default = "default_min_hold")]
    pub min_hold: f64,
    #[serde(default)]
    pub policy: OverflowPolicy,
}

fn default_steal_lookahead() -> f64 {
    0.25
}
fn default_min_hold() -> f64 {
    1.0 / 60.0
}

impl AllocatorConfig {
    /// Raise `min_hold` to one frame at `fps` frames per timeline unit
    pub fn for_frame_rate(mut self, fps: f64) -> Self {
        if fps.is_finite() && fps > 0.0 {
            self.min_hold = self.min_hold.max(1.0 / fps);
        }
        self
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            steal_lookahead: default_steal_lookahead(),
            min_hold: default_min_hold(),
            policy: OverflowPolicy::default(),
        }
    }
}

/// Why a particular occupant was stolen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StealReason {
    /// It was about to release anyway
    EndingSoon,
    /// Nothing was about to release; it had been sounding longest
    Oldest,
}

/// How an overflow was resolved
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OverflowOutcome {
    Stolen {
        slot: usize,
        victim: NoteId,
        reason: StealReason,
    },
    Dropped,
}

/// Record of a note arriving with every slot busy
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapacityOverflow {
    pub time: f64,
    pub incoming: NoteId,
    #[serde(flatten)]
    pub outcome: OverflowOutcome,
}

/// Final outcome for one note
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "fate", rename_all = "snake_case")]
pub enum NoteFate {
    /// Held its slot until release
    Assigned { slot: usize },
    /// Lost its slot at `at`
    Stolen { slot: usize, at: f64 },
    /// Never shown
    Dropped,
}

impl NoteFate {
    pub fn slot(&self) -> Option<usize> {
        match *self {
            NoteFate::Assigned { slot } | NoteFate::Stolen { slot, .. } => Some(slot),
            NoteFate::Dropped => None,
        }
    }
}

/// Contiguous interval during which one note occupies one slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tenancy {
    pub note: NoteId,
    pub pitch: u8,
    pub velocity: u8,
    pub start: f64,
    /// End of visibility; None while the note holds the slot forever
    pub end: Option<f64>,
    /// End of the note itself, before any hold or truncation
    pub natural_end: Option<f64>,
    pub stolen: bool,
}

impl Tenancy {
    /// End of visibility, infinite for unbounded tenancies
    #[inline]
    pub fn visible_end(&self) -> f64 {
        self.end.unwrap_or(f64::INFINITY)
    }

    /// Half-open test: `start <= t < end`
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.visible_end()
    }

    /// Stolen at its own start; never visible
    pub fn is_empty(&self) -> bool {
        self.visible_end() <= self.start
    }
}

/// Immutable result of allocating one part
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    placements: Vec<Placement>,
    /// Per slot, sorted by start, non-overlapping
    tenancies: Vec<Vec<Tenancy>>,
    /// Indexed by note id
    fates: Vec<NoteFate>,
    overflows: Vec<CapacityOverflow>,
}

impl Assignment {
    pub fn capacity(&self) -> usize {
        self.tenancies.len()
    }

    /// Static placement of slot `index`
    pub fn placement(&self, index: usize) -> Option<Placement> {
        self.placements.get(index).copied()
    }

    pub fn tenancies(&self, slot: usize) -> &[Tenancy] {
        self.tenancies.get(slot).map_or(&[], Vec::as_slice)
    }

    pub fn fate(&self, note: NoteId) -> Option<NoteFate> {
        self.fates.get(note.index()).copied()
    }

    pub fn fates(&self) -> &[NoteFate] {
        &self.fates
    }

    pub fn overflows(&self) -> &[CapacityOverflow] {
        &self.overflows
    }

    pub fn stolen_count(&self) -> usize {
        self.fates
            .iter()
            .filter(|fate| matches!(fate, NoteFate::Stolen { .. }))
            .count()
    }

    pub fn dropped_count(&self) -> usize {
        self.fates
            .iter()
            .filter(|fate| matches!(fate, NoteFate::Dropped))
            .count()
    }

    /// Tenancy of `slot` visible at `t`, O(log m)
    pub fn tenancy_at(&self, slot: usize, t: f64) -> Option<&Tenancy> {
        let tenancies = self.tenancies(slot);
        let after = tenancies.partition_point(|tenancy| tenancy.start <= t);
        let candidate = tenancies.get(after.checked_sub(1)?)?;
        candidate.contains(t).then_some(candidate)
    }

    /// Every non-empty tenancy across all slots
    pub fn iter_tenancies(&self) -> impl Iterator<Item = (usize, &Tenancy)> {
        self.tenancies.iter().enumerate().flat_map(|(slot, list)| {
            list.iter()
                .filter(|tenancy| !tenancy.is_empty())
                .map(move |tenancy| (slot, tenancy))
        })
    }
}

/// Greedy note-to-slot allocator
#[derive(Debug, Clone, Copy, Default)]
pub struct Allocator {
    config: AllocatorConfig,
}

impl Allocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Allocate `timeline` onto a fresh pool for `family`
    pub fn allocate<F: InstrumentFamily + ?Sized>(
        &self,
        timeline: &EventTimeline,
        family: &F,
    ) -> Result<Assignment, PoolError> {
        let mut pool = ClonePool::new(family);
        self.allocate_into(timeline, &mut pool)
    }

    /// Validate raw records and allocate them
    pub fn allocate_records<F: InstrumentFamily + ?Sized>(
        &self,
        records: &[MidiRecord],
        family: &F,
    ) -> Result<Assignment, JamError> {
        let timeline = EventTimeline::from_records(records)?;
        Ok(self.allocate(&timeline, family)?)
    }

    /// Allocate `timeline` onto `pool`, which is emptied first
    pub fn allocate_into(
        &self,
        timeline: &EventTimeline,
        pool: &mut ClonePool,
    ) -> Result<Assignment, PoolError> {
        pool.clear();

        let capacity = pool.capacity();
        let mut tenancies: Vec<Vec<Tenancy>> = vec![Vec::new(); capacity];
        // Index into tenancies[slot] of each slot's live tenancy
        let mut live: Vec<Option<usize>> = vec![None; capacity];
        let mut fates = vec![NoteFate::Dropped; timeline.len()];
        let mut overflows = Vec::new();

        for event in timeline.iter() {
            for (slot, _) in pool.release_due(event.start) {
                live[slot] = None;
            }

            let slot = match pool.lowest_free() {
                Some(slot) => slot,
                None => match self.config.policy {
                    OverflowPolicy::DropNewest => {
                        overflows.push(CapacityOverflow {
                            time: event.start,
                            incoming: event.id,
                            outcome: OverflowOutcome::Dropped,
                        });
                        continue;
                    }
                    OverflowPolicy::Steal => {
                        let Some((slot, reason)) = self.pick_victim(pool, event.start) else {
                            // Empty pool
                            overflows.push(CapacityOverflow {
                                time: event.start,
                                incoming: event.id,
                                outcome: OverflowOutcome::Dropped,
                            });
                            continue;
                        };
                        if let Some(victim) = pool.release(slot)? {
                            fates[victim.note.index()] = NoteFate::Stolen {
                                slot,
                                at: event.start,
                            };
                            if let Some(current) = live[slot].take() {
                                let tenancy = &mut tenancies[slot][current];
                                tenancy.end = Some(event.start);
                                tenancy.stolen = true;
                            }
                            overflows.push(CapacityOverflow {
                                time: event.start,
                                incoming: event.id,
                                outcome: OverflowOutcome::Stolen {
                                    slot,
                                    victim: victim.note,
                                    reason,
                                },
                            });
                        }
                        slot
                    }
                },
            };

            let release_at = self.release_time(event);
            pool.assign(slot, event, release_at)?;
            live[slot] = Some(tenancies[slot].len());
            tenancies[slot].push(Tenancy {
                note: event.id,
                pitch: event.pitch,
                velocity: event.velocity,
                start: event.start,
                end: release_at.is_finite().then_some(release_at),
                natural_end: event.end,
                stolen: false,
            });
            fates[event.id.index()] = NoteFate::Assigned { slot };
        }

        let placements = pool.slots().iter().map(|slot| slot.placement).collect();
        let assignment = Assignment {
            placements,
            tenancies,
            fates,
            overflows,
        };

        tracing::debug!(
            "Allocated {} notes onto {} clones ({} stolen, {} dropped, peak polyphony {})",
            timeline.len(),
            capacity,
            assignment.stolen_count(),
            assignment.dropped_count(),
            timeline.peak_polyphony()
        );
        if !assignment.overflows.is_empty() {
            tracing::warn!(
                "{} notes arrived with all {} clones busy",
                assignment.overflows.len(),
                capacity
            );
        }

        Ok(assignment)
    }

    /// `max(end, start + min_hold)`, infinite for unbounded notes
    fn release_time(&self, event: &NoteEvent) -> f64 {
        let held = event.start + self.config.min_hold.max(0.0);
        event.end.map_or(f64::INFINITY, |end| end.max(held))
    }

    fn pick_victim(&self, pool: &ClonePool, now: f64) -> Option<(usize, StealReason)> {
        let horizon = now + self.config.steal_lookahead.max(0.0);

        let mut soonest: Option<(usize, &Occupant)> = None;
        for (slot, occupant) in pool.occupied() {
            if occupant.release_at > horizon {
                continue;
            }
            if soonest.is_none_or(|(_, best)| occupant.release_at < best.release_at) {
                soonest = Some((slot, occupant));
            }
        }
        if let Some((slot, _)) = soonest {
            return Some((slot, StealReason::EndingSoon));
        }

        let mut oldest: Option<(usize, &Occupant)> = None;
        for (slot, occupant) in pool.occupied() {
            let older = oldest.is_none_or(|(_, best)| {
                occupant.start < best.start
                    || (occupant.start == best.start && occupant.note < best.note)
            });
            if older {
                oldest = Some((slot, occupant));
            }
        }
        oldest.map(|(slot, _)| (slot, StealReason::Oldest))
    }
}
