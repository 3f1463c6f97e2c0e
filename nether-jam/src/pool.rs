//! Fixed-capacity pool of instrument clones
//!
//! A pool owns N slots for one instrument part. Each slot has a static
//! placement taken from the family and holds at most one live note. The pool
//! tracks live notes by id so a note can never occupy two slots at once.

use hashbrown::HashMap;
use serde::Serialize;

use crate::error::PoolError;
use crate::family::{InstrumentFamily, Placement};
use crate::timeline::{NoteEvent, NoteId};

/// Note currently held by a slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Occupant {
    pub note: NoteId,
    pub pitch: u8,
    pub start: f64,
    /// When the slot frees up on its own (infinite for unbounded notes)
    pub release_at: f64,
}

/// One clone of the instrument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloneSlot {
    pub index: usize,
    pub placement: Placement,
    pub occupant: Option<Occupant>,
}

impl CloneSlot {
    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Clone slots for one instrument part
#[derive(Debug, Clone)]
pub struct ClonePool {
    slots: Vec<CloneSlot>,
    /// Live note -> slot index
    live: HashMap<NoteId, usize>,
}

impl ClonePool {
    /// One slot per clone the family may show
    pub fn new<F: InstrumentFamily + ?Sized>(family: &F) -> Self {
        let slots = (0..family.clone_capacity())
            .map(|index| CloneSlot {
                index,
                placement: family.placement_offset(index),
                occupant: None,
            })
            .collect();

        Self {
            slots,
            live: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Result<&CloneSlot, PoolError> {
        self.slots.get(index).ok_or(PoolError::SlotOutOfRange {
            index,
            capacity: self.slots.len(),
        })
    }

    pub fn slots(&self) -> &[CloneSlot] {
        &self.slots
    }

    /// Static placement of slot `index`
    pub fn offset(&self, index: usize) -> Result<Placement, PoolError> {
        self.slot(index).map(|slot| slot.placement)
    }

    pub fn is_free(&self, index: usize) -> Result<bool, PoolError> {
        self.slot(index).map(CloneSlot::is_free)
    }

    /// Lowest-index free slot
    pub fn lowest_free(&self) -> Option<usize> {
        self.slots.iter().position(CloneSlot::is_free)
    }

    /// Occupied slots in index order
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &Occupant)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.occupant.as_ref().map(|occupant| (slot.index, occupant)))
    }

    pub fn occupied_count(&self) -> usize {
        self.live.len()
    }

    /// Slot currently holding `note`
    pub fn slot_of(&self, note: NoteId) -> Option<usize> {
        self.live.get(&note).copied()
    }

    /// Put `event` into slot `index` until `release_at`
    pub fn assign(
        &mut self,
        index: usize,
        event: &NoteEvent,
        release_at: f64,
    ) -> Result<(), PoolError> {
        let capacity = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(PoolError::SlotOutOfRange { index, capacity })?;

        if let Some(current) = &slot.occupant {
            return Err(PoolError::SlotBusy {
                index,
                occupant: current.note.0,
            });
        }
        if let Some(&other) = self.live.get(&event.id) {
            return Err(PoolError::AlreadyAssigned {
                note: event.id.0,
                slot: other,
            });
        }

        slot.occupant = Some(Occupant {
            note: event.id,
            pitch: event.pitch,
            start: event.start,
            release_at,
        });
        self.live.insert(event.id, index);
        Ok(())
    }

    /// Empty slot `index`, returning what it held
    pub fn release(&mut self, index: usize) -> Result<Option<Occupant>, PoolError> {
        let capacity = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(PoolError::SlotOutOfRange { index, capacity })?;

        let occupant = slot.occupant.take();
        if let Some(occupant) = &occupant {
            self.live.remove(&occupant.note);
        }
        Ok(occupant)
    }

    /// Free every slot whose release time is `<= t`
    pub fn release_due(&mut self, t: f64) -> Vec<(usize, Occupant)> {
        let mut released = Vec::new();
        for slot in &mut self.slots {
            let due = slot
                .occupant
                .as_ref()
                .is_some_and(|occupant| occupant.release_at <= t);
            if due {
                if let Some(occupant) = slot.occupant.take() {
                    self.live.remove(&occupant.note);
                    released.push((slot.index, occupant));
                }
            }
        }
        released
    }

    /// Empty every slot
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.occupant = None;
        }
        self.live.clear();
    }
}
