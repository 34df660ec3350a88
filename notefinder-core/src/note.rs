//! # Note Module
//!
//! Pitch classes, notes, and equal-temperament transposition.
//!
//! ## Features
//! - The 12 canonical pitch classes in cyclic order starting at C
//! - Scientific pitch notation labels such as `"A4"` or `"C♯5"`
//! - Transposition by any number of semitones with octave wraparound

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of semitones in an octave.
pub const SEMITONES_PER_OCTAVE: i32 = 12;

/// One of the 12 note names within an octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    #[serde(rename = "C♯")]
    CSharp,
    D,
    #[serde(rename = "D♯")]
    DSharp,
    E,
    F,
    #[serde(rename = "F♯")]
    FSharp,
    G,
    #[serde(rename = "G♯")]
    GSharp,
    A,
    #[serde(rename = "A♯")]
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in cyclic order.
    pub const ALL: [PitchClass; 12] = [
        Self::C,
        Self::CSharp,
        Self::D,
        Self::DSharp,
        Self::E,
        Self::F,
        Self::FSharp,
        Self::G,
        Self::GSharp,
        Self::A,
        Self::ASharp,
        Self::B,
    ];

    /// Canonical labels, index-aligned with [`PitchClass::ALL`].
    pub const LABELS: [&'static str; 12] = [
        "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B",
    ];

    /// Position in the cycle, 0 for C through 11 for B.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The pitch class at `index`, wrapping in both directions.
    pub fn from_index(index: i64) -> Self {
        Self::ALL[index.rem_euclid(SEMITONES_PER_OCTAVE as i64) as usize]
    }

    pub fn label(self) -> &'static str {
        Self::LABELS[self.index()]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PitchClass {
    type Err = Error;

    /// Parses a canonical label. `#` is accepted in place of `♯`.
    ///
    /// The label must match exactly one canonical name; anything else is
    /// [`Error::InvalidNoteName`].
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('#', "♯");
        let mut matches = Self::LABELS
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == normalized)
            .map(|(i, _)| Self::ALL[i]);

        match (matches.next(), matches.next()) {
            (Some(class), None) => Ok(class),
            _ => Err(Error::InvalidNoteName(s.to_string())),
        }
    }
}

/// A pitch class at a given octave, tuned to a concrete frequency.
///
/// Notes are values: transposition builds a new note and leaves the
/// original untouched. Fields are only reachable through the accessors so
/// every note carries a positive, finite pitch:
///
/// ```compile_fail
/// use notefinder_core::{Note, PitchClass};
/// let note = Note { name: PitchClass::A, octave: 4, pitch: -440.0 };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Note {
    name: PitchClass,
    octave: i32,
    /// Frequency in Hz.
    pitch: f64,
}

impl Note {
    /// Builds a note from a label such as `"A"` or `"C♯"`.
    ///
    /// # Errors
    /// * [`Error::InvalidNoteName`] for an unknown label
    /// * [`Error::InvalidArgument`] if `pitch` is not a positive finite number
    pub fn new(name: &str, pitch: f64, octave: i32) -> Result<Self> {
        Self::from_class(name.parse()?, pitch, octave)
    }

    pub fn from_class(name: PitchClass, pitch: f64, octave: i32) -> Result<Self> {
        if !pitch.is_finite() || pitch <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "pitch must be a positive frequency, got {pitch}"
            )));
        }
        Ok(Self { name, octave, pitch })
    }

    /// The A4 reference note tuned to `frequency`.
    pub fn reference_a4(frequency: f64) -> Result<Self> {
        Self::from_class(PitchClass::A, frequency, 4)
    }

    pub fn name(&self) -> PitchClass {
        self.name
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// Frequency in Hz.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Scientific pitch notation label, e.g. `"A4"`.
    pub fn label(&self) -> String {
        format!("{}{}", self.name, self.octave)
    }

    /// Transposes by `semitones` and returns the new label and frequency.
    ///
    /// # Errors
    /// Same as [`Note::shifted`].
    pub fn transpose(&self, semitones: i32) -> Result<(String, f64)> {
        let shifted = self.shifted(semitones)?;
        Ok((shifted.label(), shifted.pitch))
    }

    /// Transposes by `semitones` using equal temperament.
    ///
    /// The octave number changes whenever the shift crosses B->C going up
    /// or C->B going down, once per full octave beyond the first crossing.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if the octave number leaves the `i32`
    /// range or the frequency stops being a positive finite number.
    pub fn shifted(&self, semitones: i32) -> Result<Note> {
        let pitch = self.pitch * 2f64.powf(f64::from(semitones) / f64::from(SEMITONES_PER_OCTAVE));
        if !pitch.is_finite() || pitch <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "{} shifted by {semitones} semitones has no representable frequency",
                self.label()
            )));
        }

        let index = self.name.index() as i64;
        let steps = i64::from(semitones);
        let name = PitchClass::from_index(index + steps);

        let octaves = i64::from(SEMITONES_PER_OCTAVE);
        let up_crossing = octaves - index;
        let down_crossing = index + 1;
        let octave = if steps > 0 && steps >= up_crossing {
            i64::from(self.octave) + 1 + (steps - up_crossing) / octaves
        } else if steps < 0 && -steps >= down_crossing {
            i64::from(self.octave) - 1 - (-steps - down_crossing) / octaves
        } else {
            i64::from(self.octave)
        };
        let octave = i32::try_from(octave).map_err(|_| {
            Error::InvalidArgument(format!(
                "{} shifted by {semitones} semitones leaves the octave range",
                self.label()
            ))
        })?;

        Ok(Note { name, octave, pitch })
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} :: {}", self.name, self.octave, self.pitch)
    }
}
