//! # Scale Module
//!
//! Builds note-label to frequency tables covering the audible range from a
//! base note and a step pattern, and answers selection and lookup queries
//! against them.
//!
//! ## Construction
//! The table is filled by two sweeps. The ascending sweep applies the step
//! pattern to a running semitone offset until a full pass ends at or above
//! 20 kHz; the descending sweep walks the reversed pattern down from the
//! base note until a full pass ends at or below 20 Hz. Passes always run to
//! completion, so a table may overshoot the audible range by up to one
//! pattern application in either direction.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::note::{Note, SEMITONES_PER_OCTAVE};
use crate::rng::{Clock, XorShift};

/// Lower edge of the audible range in Hz.
pub const AUDIBLE_MIN_HZ: f64 = 20.0;
/// Upper edge of the audible range in Hz.
pub const AUDIBLE_MAX_HZ: f64 = 20_000.0;
/// Largest total span, in semitones, accepted for one pass of a step pattern.
pub const MAX_PATTERN_SPAN: u64 = 1_200;

/// An ordered mapping from note label to frequency.
///
/// The first insertion of a label fixes its position; inserting the same
/// label again replaces the frequency in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteTable {
    entries: Vec<(String, f64)>,
    positions: HashMap<String, usize>,
}

impl NoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `label`, returning the previous frequency.
    pub fn insert(&mut self, label: impl Into<String>, frequency: f64) -> Option<f64> {
        let label = label.into();
        match self.positions.get(&label) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, frequency)),
            None => {
                self.positions.insert(label.clone(), self.entries.len());
                self.entries.push((label, frequency));
                None
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.positions.get(label).map(|&pos| self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at insertion position `index`.
    pub fn entry(&self, index: usize) -> Option<(&str, f64)> {
        self.entries
            .get(index)
            .map(|(label, freq)| (label.as_str(), *freq))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(label, freq)| (label.as_str(), *freq))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub fn frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, freq)| *freq)
    }

    /// The first label whose frequency equals `frequency` exactly.
    pub fn label_of(&self, frequency: f64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, freq)| *freq == frequency)
            .map(|(label, _)| label.as_str())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for NoteTable {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut table = NoteTable::new();
        for (label, freq) in iter {
            table.insert(label, freq);
        }
        table
    }
}

// Serialized as a JSON object in insertion order.
impl Serialize for NoteTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, freq) in &self.entries {
            map.serialize_entry(label, freq)?;
        }
        map.end()
    }
}

impl fmt::Display for NoteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (label, freq)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{label}: {freq}")?;
        }
        f.write_str("}")
    }
}

/// Named step patterns. Each starts with a zero step so the base note is
/// the first table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    #[serde(alias = "myxolodian")]
    Mixolydian,
    Aeolian,
    Locrian,
    #[default]
    Chromatic,
}

impl Mode {
    pub const ALL: [Mode; 8] = [
        Self::Ionian,
        Self::Dorian,
        Self::Phrygian,
        Self::Lydian,
        Self::Mixolydian,
        Self::Aeolian,
        Self::Locrian,
        Self::Chromatic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ionian => "ionian",
            Self::Dorian => "dorian",
            Self::Phrygian => "phrygian",
            Self::Lydian => "lydian",
            Self::Mixolydian => "mixolydian",
            Self::Aeolian => "aeolian",
            Self::Locrian => "locrian",
            Self::Chromatic => "chromatic",
        }
    }

    /// Semitone increments applied in order to build one pass of the scale.
    pub fn steps(self) -> &'static [u32] {
        match self {
            Self::Ionian => &[0, 2, 2, 1, 2, 2, 2, 1],
            Self::Dorian => &[0, 2, 1, 2, 2, 2, 1, 2],
            Self::Phrygian => &[0, 1, 2, 2, 2, 1, 2, 2],
            Self::Lydian => &[0, 2, 2, 2, 1, 2, 2, 1],
            Self::Mixolydian => &[0, 2, 2, 1, 2, 2, 1, 2],
            Self::Aeolian => &[0, 2, 1, 2, 2, 1, 2, 2],
            Self::Locrian => &[0, 1, 2, 2, 1, 2, 2, 2],
            Self::Chromatic => &[0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "myxolodian" {
            return Ok(Self::Mixolydian);
        }
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == wanted)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown mode {s:?}")))
    }
}

/// Which projection of a random selection to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    /// Labels together with frequencies.
    #[default]
    All,
    Names,
    Pitches,
}

impl FromStr for SelectionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "names" => Ok(Self::Names),
            "pitches" => Ok(Self::Pitches),
            other => Err(Error::InvalidArgument(format!(
                "unknown selection kind {other:?}, expected all, names or pitches"
            ))),
        }
    }
}

/// The result of [`Scale::random_select`], shaped by its [`SelectionKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Selection {
    All(NoteTable),
    Names(Vec<String>),
    Pitches(Vec<f64>),
}

impl Selection {
    fn project(table: NoteTable, kind: SelectionKind) -> Self {
        match kind {
            SelectionKind::All => Self::All(table),
            SelectionKind::Names => Self::Names(table.labels().map(str::to_string).collect()),
            SelectionKind::Pitches => Self::Pitches(table.frequencies().collect()),
        }
    }
}

/// A musical scale expanded over the audible range.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    name: String,
    base: Note,
    steps: Vec<u32>,
    members: NoteTable,
}

impl Scale {
    /// Builds the scale table from `base` and `steps`.
    ///
    /// # Errors
    /// * [`Error::InvalidArgument`] if `steps` is empty or one pass spans more
    ///   than [`MAX_PATTERN_SPAN`] semitones
    /// * [`Error::InvalidArgument`] if a sweep moves the base note out of the
    ///   representable octave range
    pub fn new(name: impl Into<String>, base: Note, steps: impl Into<Vec<u32>>) -> Result<Self> {
        let name = name.into();
        let steps = steps.into();
        if steps.is_empty() {
            return Err(Error::InvalidArgument("step pattern is empty".to_string()));
        }
        let span: u64 = steps.iter().map(|&s| s as u64).sum();
        if span > MAX_PATTERN_SPAN {
            return Err(Error::InvalidArgument(format!(
                "step pattern spans {span} semitones, limit is {MAX_PATTERN_SPAN}"
            )));
        }

        let mut members = NoteTable::new();
        let mut current = base.pitch();

        // Ascending sweep.
        let mut offset: i32 = 0;
        let limit = pass_limit(current, AUDIBLE_MAX_HZ, span);
        let mut passes = 0;
        while current < AUDIBLE_MAX_HZ {
            if passes == limit {
                warn!("[SCALE] {name}: ascending sweep stopped after {passes} passes at {current} Hz");
                break;
            }
            for &step in &steps {
                offset += step as i32;
                let (label, freq) = base.transpose(offset)?;
                members.insert(label, freq);
                current = freq;
            }
            passes += 1;
        }

        // Descending sweep, starting again from the base note.
        offset = 0;
        let limit = pass_limit(current, AUDIBLE_MIN_HZ, span);
        passes = 0;
        while current > AUDIBLE_MIN_HZ {
            if passes == limit {
                warn!("[SCALE] {name}: descending sweep stopped after {passes} passes at {current} Hz");
                break;
            }
            for &step in steps.iter().rev() {
                offset -= step as i32;
                let (label, freq) = base.transpose(offset)?;
                members.insert(label, freq);
                current = freq;
            }
            passes += 1;
        }

        debug!(
            "[SCALE] Built {name} from {} with {} notes",
            base.label(),
            members.len()
        );

        Ok(Self {
            name,
            base,
            steps,
            members,
        })
    }

    /// Builds a scale from one of the named step patterns.
    pub fn from_mode(base: Note, mode: Mode) -> Result<Self> {
        Self::new(format!("{} {mode}", base.name()), base, mode.steps())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &Note {
        &self.base
    }

    pub fn steps(&self) -> &[u32] {
        &self.steps
    }

    pub fn members(&self) -> &NoteTable {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Labels in generation order: the ascending block, then the descending one.
    pub fn note_names(&self) -> impl Iterator<Item = &str> {
        self.members.labels()
    }

    /// Picks notes by position in [`Scale::note_names`].
    ///
    /// Indices wrap modulo the table size, negative ones included. Repeated
    /// picks of the same note collapse into one entry.
    pub fn select_notes(&self, indices: &[i64]) -> NoteTable {
        let len = self.members.len() as i64;
        let mut selection = NoteTable::new();
        if len == 0 {
            return selection;
        }
        for &i in indices {
            if let Some((label, freq)) = self.members.entry(i.rem_euclid(len) as usize) {
                selection.insert(label, freq);
            }
        }
        selection
    }

    /// Draws `count` random positions and selects the notes found there.
    pub fn random_select<C: Clock>(
        &self,
        count: usize,
        kind: SelectionKind,
        rng: &XorShift<C>,
    ) -> Result<Selection> {
        let indices = (0..count)
            .map(|_| rng.next_index(self.members.len()).map(|i| i as i64))
            .collect::<Result<Vec<_>>>()?;
        Ok(Selection::project(self.select_notes(&indices), kind))
    }

    /// Every frequency in the table, in generation order.
    pub fn frequencies(&self) -> Vec<f64> {
        self.members.frequencies().collect()
    }

    /// The label stored for exactly `frequency`.
    ///
    /// No tolerance is applied; use [`crate::matcher::closest_note`] for
    /// measured frequencies.
    ///
    /// # Errors
    /// * [`Error::NotFound`] if no stored value equals `frequency`
    pub fn note_by_frequency(&self, frequency: f64) -> Result<&str> {
        self.members
            .label_of(frequency)
            .ok_or(Error::NotFound(frequency))
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.name, self.members)
    }
}

/// Upper bound on full pattern passes needed to move from `from` Hz past
/// `bound` Hz when each pass advances `span` semitones.
fn pass_limit(from: f64, bound: f64, span: u64) -> usize {
    if span == 0 {
        return 1;
    }
    let semitones = SEMITONES_PER_OCTAVE as f64 * (bound / from).log2().abs();
    ((semitones / span as f64).ceil() as usize).saturating_add(1)
}
