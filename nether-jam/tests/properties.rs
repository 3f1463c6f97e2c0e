//! Invariants checked over generated dense passages.

use std::sync::Arc;

use nether_jam::*;

/// Small deterministic generator so passages are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

/// Dense passage on a 1/48 grid: chords, repeated pitches and a few hanging notes
fn passage(seed: u64, notes: usize) -> Vec<MidiRecord> {
    let mut rng = Lcg(seed);
    let mut events: Vec<(f64, bool, u8, u8)> = Vec::new();
    let mut open: Vec<(u8, f64)> = Vec::new();
    let mut tick = 0u64;

    for _ in 0..notes {
        tick += rng.below(6);
        let start = tick as f64 / 48.0;
        let pitch = 55 + rng.below(30) as u8;
        let length = (1 + rng.below(60)) as f64 / 48.0;
        events.push((start, true, pitch, 64 + rng.below(60) as u8));
        if rng.below(25) == 0 {
            // Never released
            continue;
        }
        open.push((pitch, start + length));
    }
    for (pitch, end) in open {
        events.push((end, false, pitch, 0));
    }

    // Offs before ons at equal times keep same-pitch repeats well formed
    events.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    events
        .into_iter()
        .map(|(time, on, pitch, velocity)| {
            if on {
                MidiRecord::on(time, pitch, velocity)
            } else {
                MidiRecord::off(time, pitch)
            }
        })
        .collect()
}

fn animator(records: &[MidiRecord], policy: OverflowPolicy) -> Animator {
    let family = Arc::new(FamilyDescriptor::bundled("tenor_sax").unwrap());
    let allocator = Allocator::new(AllocatorConfig {
        policy,
        ..Default::default()
    });
    let assignment = allocator.allocate_records(records, family.as_ref()).unwrap();
    Animator::new(family, Arc::new(assignment), 1.0)
}

fn sample_times() -> impl Iterator<Item = f64> {
    (0..2_000).map(|i| i as f64 / 97.0)
}

// ============================================================================
// Capacity and uniqueness
// ============================================================================

#[test]
fn test_visible_clones_never_exceed_capacity() {
    for seed in 1..6 {
        let animator = animator(&passage(seed, 300), OverflowPolicy::Steal);
        let capacity = animator.family().clone_capacity();
        for t in sample_times() {
            let frame = animator.frame_at(t);
            assert_eq!(frame.slots.len(), capacity);
            assert!(frame.visible_count() <= capacity, "seed {seed}, t = {t}");
        }
    }
}

#[test]
fn test_no_note_in_two_slots() {
    for policy in [OverflowPolicy::Steal, OverflowPolicy::DropNewest] {
        let animator = animator(&passage(7, 300), policy);
        for t in sample_times() {
            let frame = animator.frame_at(t);
            let mut notes: Vec<NoteId> = frame.slots.iter().filter_map(|s| s.note).collect();
            let count = notes.len();
            notes.sort();
            notes.dedup();
            assert_eq!(notes.len(), count, "t = {t}");
        }
    }
}

#[test]
fn test_visible_note_is_sounding() {
    let records = passage(11, 200);
    let timeline = EventTimeline::from_records(&records).unwrap();
    let animator = animator(&records, OverflowPolicy::Steal);
    let hold = AllocatorConfig::default().min_hold;

    for t in sample_times() {
        for slot in animator.frame_at(t).slots.iter().filter(|s| s.visible) {
            let Some(id) = slot.note else {
                panic!("visible slot {} without a note", slot.slot);
            };
            let event = timeline.get(id).unwrap();
            let held_until = event.end.map(|end| end.max(event.start + hold));
            assert!(event.start <= t, "{id} shown before it starts");
            assert!(held_until.is_none_or(|end| t < end), "{id} shown after release");
        }
    }
}

// ============================================================================
// Release and re-use
// ============================================================================

#[test]
fn test_slots_reused_only_after_release() {
    let records = passage(3, 400);
    let animator = animator(&records, OverflowPolicy::Steal);
    let assignment = animator.assignment();

    for slot in 0..assignment.capacity() {
        for pair in assignment.tenancies(slot).windows(2) {
            // Either released on time or truncated at the newcomer's start
            assert!(pair[0].visible_end() <= pair[1].start, "slot {slot}: {pair:?}");
            if !pair[0].stolen {
                let natural = pair[0].natural_end.unwrap_or(f64::INFINITY);
                assert!(natural <= pair[1].start, "slot {slot} reused early: {pair:?}");
            } else {
                assert_eq!(pair[0].visible_end(), pair[1].start);
            }
        }
    }
}

#[test]
fn test_every_note_has_a_fate() {
    let records = passage(5, 300);
    let timeline = EventTimeline::from_records(&records).unwrap();
    for policy in [OverflowPolicy::Steal, OverflowPolicy::DropNewest] {
        let animator = animator(&records, policy);
        let assignment = animator.assignment();
        assert_eq!(assignment.fates().len(), timeline.len());

        let overflowing = assignment.stolen_count() + assignment.dropped_count();
        assert_eq!(overflowing, assignment.overflows().len());
        if policy == OverflowPolicy::DropNewest {
            assert_eq!(assignment.stolen_count(), 0);
        }
    }
}

#[test]
fn test_enough_capacity_means_no_overflow() {
    let records = passage(9, 120);
    let timeline = EventTimeline::from_records(&records).unwrap();
    let peak = timeline.peak_polyphony();

    let source = format!(
        "name = \"wide\"\nclone_capacity = {}\n[fingering]\nkeys = []\n",
        peak.max(1)
    );
    let family = FamilyDescriptor::from_toml_str(&source).unwrap();
    let assignment = Allocator::new(AllocatorConfig {
        min_hold: 0.0,
        ..Default::default()
    })
    .allocate(&timeline, &family)
    .unwrap();

    assert!(assignment.overflows().is_empty(), "peak {peak}");
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_frame_at_is_deterministic() {
    let animator = animator(&passage(13, 300), OverflowPolicy::Steal);
    for t in sample_times().step_by(37) {
        assert_eq!(animator.frame_at(t), animator.frame_at(t));
    }
}

#[test]
fn test_reseek_is_idempotent() {
    let animator = animator(&passage(17, 300), OverflowPolicy::Steal);
    let (t0, t1) = (1.25, 7.5);

    let forward = animator.frame_at(t1);
    let _ = animator.frame_at(t0);
    assert_eq!(animator.frame_at(t1), forward);
}

#[test]
fn test_allocation_is_reproducible() {
    let records = passage(19, 300);
    let a = animator(&records, OverflowPolicy::Steal);
    let b = animator(&records, OverflowPolicy::Steal);
    assert_eq!(a.assignment().fates(), b.assignment().fates());
    assert_eq!(a.assignment().overflows(), b.assignment().overflows());
}
