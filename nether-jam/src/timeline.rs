//! Event timeline for one instrument part
//!
//! Turns a flat, channel-filtered stream of note-on/note-off records into an
//! immutable list of [`NoteEvent`]s sorted by `(start, pitch, input order)`.
//! That order is also the identity order: a note's [`NoteId`] is its index.
//!
//! # Queries
//!
//! - [`EventTimeline::events_in_range`] - binary search on start time
//! - [`EventTimeline::events_sounding_at`] - binary search plus a backward
//!   window bounded by the longest finite note
//! - [`TimelineCursor`] - streaming sounding set, amortized O(1) per event
//!   moving forward, full rescan on backward seeks

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::MalformedTimelineError;

/// Highest valid MIDI pitch and velocity
pub const MIDI_MAX: u8 = 127;

const WINDOW_SLACK: f64 = 1e-6;

/// Stable identity of a note within its timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u32);

impl NoteId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One record from the upstream MIDI parser (already channel-filtered)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MidiRecord {
    /// Time in timeline units
    pub time: f64,
    /// MIDI pitch (0-127)
    pub pitch: u8,
    /// MIDI velocity (0-127)
    pub velocity: u8,
    /// Note-on (true) or note-off (false)
    #[serde(alias = "isNoteOn")]
    pub is_note_on: bool,
}

impl MidiRecord {
    pub fn on(time: f64, pitch: u8, velocity: u8) -> Self {
        Self {
            time,
            pitch,
            velocity,
            is_note_on: true,
        }
    }

    pub fn off(time: f64, pitch: u8) -> Self {
        Self {
            time,
            pitch,
            velocity: 0,
            is_note_on: false,
        }
    }
}

/// A note with its resolved duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub id: NoteId,
    pub start: f64,
    /// None while no note-off (or all-notes-off) terminated the note
    pub end: Option<f64>,
    pub pitch: u8,
    pub velocity: u8,
}

impl NoteEvent {
    /// Whether no note-off ever terminated this note
    pub fn is_unbounded(&self) -> bool {
        self.end.is_none()
    }

    /// Half-open test: `start <= t < end`, or `start <= t` when unbounded
    pub fn sounds_at(&self, t: f64) -> bool {
        self.start <= t && self.end.is_none_or(|end| t < end)
    }

    /// Length of the note, None when unbounded
    pub fn duration(&self) -> Option<f64> {
        self.end.map(|end| end - self.start)
    }
}

/// A note-on waiting for its note-off, in input order
#[derive(Debug, Clone, Copy)]
struct PendingNote {
    start: f64,
    end: Option<f64>,
    pitch: u8,
    velocity: u8,
}

/// Incremental timeline construction with input validation
///
/// Note-offs close the oldest open note of the same pitch. A note-on with
/// velocity 0 is a note-off.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    notes: Vec<PendingNote>,
    open: HashMap<u8, VecDeque<usize>>,
    last_time: Option<f64>,
    records: usize,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the time of the next record and advance the record counter
    fn accept_time(&mut self, time: f64) -> Result<usize, MalformedTimelineError> {
        let index = self.records;
        if !time.is_finite() {
            return Err(MalformedTimelineError::NonFiniteTime { index });
        }
        if let Some(previous) = self.last_time {
            if time < previous {
                return Err(MalformedTimelineError::NonMonotonic {
                    index,
                    time,
                    previous,
                });
            }
        }
        self.last_time = Some(time);
        self.records += 1;
        Ok(index)
    }

    /// Start a note
    pub fn note_on(
        &mut self,
        time: f64,
        pitch: u8,
        velocity: u8,
    ) -> Result<&mut Self, MalformedTimelineError> {
        if velocity == 0 {
            return self.note_off(time, pitch);
        }
        let index = self.accept_time(time)?;
        if pitch > MIDI_MAX {
            return Err(MalformedTimelineError::PitchOutOfRange { index, pitch });
        }
        if velocity > MIDI_MAX {
            return Err(MalformedTimelineError::VelocityOutOfRange { index, velocity });
        }

        self.open.entry(pitch).or_default().push_back(self.notes.len());
        self.notes.push(PendingNote {
            start: time,
            end: None,
            pitch,
            velocity,
        });
        Ok(self)
    }

    /// End the oldest sounding note of `pitch`
    pub fn note_off(&mut self, time: f64, pitch: u8) -> Result<&mut Self, MalformedTimelineError> {
        let index = self.accept_time(time)?;
        if pitch > MIDI_MAX {
            return Err(MalformedTimelineError::PitchOutOfRange { index, pitch });
        }

        let Some(pending) = self.open.get_mut(&pitch).and_then(|queue| queue.pop_front()) else {
            return Err(MalformedTimelineError::UnmatchedNoteOff { index, pitch, time });
        };
        self.notes[pending].end = Some(time);
        Ok(self)
    }

    /// End every sounding note
    pub fn all_notes_off(&mut self, time: f64) -> Result<&mut Self, MalformedTimelineError> {
        self.accept_time(time)?;
        for (_, queue) in self.open.iter_mut() {
            for pending in queue.drain(..) {
                self.notes[pending].end = Some(time);
            }
        }
        Ok(self)
    }

    /// Apply one upstream record
    pub fn push(&mut self, record: &MidiRecord) -> Result<&mut Self, MalformedTimelineError> {
        if record.is_note_on {
            self.note_on(record.time, record.pitch, record.velocity)
        } else {
            self.note_off(record.time, record.pitch)
        }
    }

    /// Close every still-sounding note at `end` and freeze
    ///
    /// `end` is the end of the input stream and may not precede the last
    /// record.
    pub fn build_until(mut self, end: f64) -> Result<EventTimeline, MalformedTimelineError> {
        self.all_notes_off(end)?;
        Ok(self.build())
    }

    /// Sort, assign identities and freeze
    ///
    /// Notes without a note-off stay unbounded; use [`Self::build_until`]
    /// when the stream end is known.
    pub fn build(self) -> EventTimeline {
        let mut notes = self.notes;
        // Stable: equal (start, pitch) keep input order
        notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));

        let events: Vec<NoteEvent> = notes
            .into_iter()
            .enumerate()
            .map(|(i, note)| NoteEvent {
                id: NoteId(i as u32),
                start: note.start,
                end: note.end,
                pitch: note.pitch,
                velocity: note.velocity,
            })
            .collect();

        EventTimeline::from_sorted(events)
    }
}

/// Immutable, sorted note list for one instrument part
#[derive(Debug, Clone, Default)]
pub struct EventTimeline {
    events: Vec<NoteEvent>,
    /// Notes without a terminating note-off, ascending id
    unbounded: Vec<NoteId>,
    /// Longest finite duration, bounds the backward search window
    longest: f64,
}

impl EventTimeline {
    fn from_sorted(events: Vec<NoteEvent>) -> Self {
        let unbounded = events
            .iter()
            .filter(|e| e.is_unbounded())
            .map(|e| e.id)
            .collect();
        let longest = events
            .iter()
            .filter_map(NoteEvent::duration)
            .fold(0.0_f64, f64::max);

        Self {
            events,
            unbounded,
            longest,
        }
    }

    /// Build from upstream records, rejecting malformed input
    pub fn from_records(records: &[MidiRecord]) -> Result<Self, MalformedTimelineError> {
        Self::from_records_until(records, None)
    }

    /// Build from upstream records; notes still open at `stream_end` end there
    pub fn from_records_until(
        records: &[MidiRecord],
        stream_end: Option<f64>,
    ) -> Result<Self, MalformedTimelineError> {
        let mut builder = TimelineBuilder::new();
        for record in records {
            builder.push(record)?;
        }
        match stream_end {
            Some(end) => builder.build_until(end),
            None => Ok(builder.build()),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: NoteId) -> Option<&NoteEvent> {
        self.events.get(id.index())
    }

    /// All events in identity order
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &NoteEvent> {
        self.events.iter()
    }

    /// Notes that never received a note-off
    pub fn unbounded(&self) -> &[NoteId] {
        &self.unbounded
    }

    /// Start of the first note
    pub fn start_time(&self) -> Option<f64> {
        self.events.first().map(|e| e.start)
    }

    /// Latest start or finite end
    pub fn end_time(&self) -> Option<f64> {
        self.events
            .iter()
            .map(|e| e.end.unwrap_or(e.start))
            .reduce(f64::max)
    }

    /// Events with `t0 <= start < t1`, sorted
    pub fn events_in_range(&self, t0: f64, t1: f64) -> &[NoteEvent] {
        let lo = self.events.partition_point(|e| e.start < t0);
        let hi = self.events.partition_point(|e| e.start < t1);
        if hi <= lo {
            return &[];
        }
        &self.events[lo..hi]
    }

    /// Index of the first event starting after `t`
    fn started_by(&self, t: f64) -> usize {
        self.events.partition_point(|e| e.start <= t)
    }

    /// Events sounding at `t`, sorted by id
    pub fn events_sounding_at(&self, t: f64) -> Vec<&NoteEvent> {
        let hi = self.started_by(t);
        // Slack covers rounding in `end - start`
        let horizon = t - self.longest - WINDOW_SLACK;
        let lo = self.events.partition_point(|e| e.start < horizon);
        let lo = lo.min(hi);

        // Unbounded notes that started before the window are still sounding
        let mut sounding: Vec<&NoteEvent> = self
            .unbounded
            .iter()
            .take_while(|id| id.index() < lo)
            .map(|id| &self.events[id.index()])
            .collect();

        sounding.extend(self.events[lo..hi].iter().filter(|e| e.sounds_at(t)));
        sounding
    }

    /// Least number of clones that shows every note without stealing
    ///
    /// Zero-length notes count for the instant they start.
    pub fn peak_polyphony(&self) -> usize {
        // (time, order): ends before starts at equal times, zero-length ends last
        let mut edges: Vec<(f64, u8, i32)> = Vec::with_capacity(self.events.len() * 2);
        for event in &self.events {
            edges.push((event.start, 1, 1));
            match event.end {
                Some(end) if end > event.start => edges.push((end, 0, -1)),
                Some(end) => edges.push((end, 2, -1)),
                None => {}
            }
        }
        edges.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut current = 0i32;
        let mut peak = 0i32;
        for (_, _, delta) in edges {
            current += delta;
            peak = peak.max(current);
        }
        peak as usize
    }

    /// Streaming cursor positioned before the first note
    pub fn cursor(&self) -> TimelineCursor<'_> {
        TimelineCursor::new(self)
    }
}

/// Streaming view of the sounding set as playback time moves
#[derive(Debug)]
pub struct TimelineCursor<'a> {
    timeline: &'a EventTimeline,
    position: f64,
    /// First event not yet scanned (start > position)
    next: usize,
    /// Sounding at `position`, ascending id
    active: Vec<NoteId>,
}

impl<'a> TimelineCursor<'a> {
    fn new(timeline: &'a EventTimeline) -> Self {
        Self {
            timeline,
            position: f64::NEG_INFINITY,
            next: 0,
            active: Vec::new(),
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Notes sounding at the current position
    pub fn active(&self) -> &[NoteId] {
        &self.active
    }

    /// Move to `t` and return the notes sounding there
    pub fn seek(&mut self, t: f64) -> &[NoteId] {
        let events = &self.timeline.events;

        if t < self.position {
            self.active = self
                .timeline
                .events_sounding_at(t)
                .into_iter()
                .map(|e| e.id)
                .collect();
            self.next = self.timeline.started_by(t);
        } else {
            self.active.retain(|id| events[id.index()].sounds_at(t));
            while let Some(event) = events.get(self.next) {
                if event.start > t {
                    break;
                }
                if event.sounds_at(t) {
                    self.active.push(event.id);
                }
                self.next += 1;
            }
        }

        self.position = t;
        &self.active
    }
}
