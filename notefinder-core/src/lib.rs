// notefinder-core/src/lib.rs

//! The core logic for the note finder.
//! This crate is responsible for the pitch and scale model, random note
//! sampling, and matching detected frequencies to scale notes. It is
//! completely headless; the only I/O is reading config files.

pub mod config;
pub mod error;
pub mod matcher;
pub mod note;
pub mod rng;
pub mod scale;
pub mod spectrum;

pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use matcher::{NoteMatcher, closest_note};
pub use note::{Note, PitchClass};
pub use rng::{Clock, FixedClock, SystemClock, XorShift};
pub use scale::{Mode, NoteTable, Scale, Selection, SelectionKind};

use serde::Serialize;
use tracing::debug;

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameAnalysis {
    /// Frequencies of the detected spectral peaks in Hz, ascending.
    pub peaks: Vec<f64>,
    /// Closest scale note to the first peak.
    pub note_name: Option<String>,
    /// Magnitude spectrum up to the Nyquist bin.
    #[serde(skip)]
    pub magnitudes: Vec<f32>,
}

/// Runs one frame through the spectrum and matches its first peak.
///
/// An empty or silent frame produces no peaks and no note.
pub fn analyze_frame(
    samples: &[f32],
    config: &AnalysisConfig,
    matcher: &NoteMatcher<'_>,
) -> Result<FrameAnalysis> {
    let magnitudes = spectrum::magnitude_spectrum(samples);
    let peaks = spectrum::peak_frequencies(
        &magnitudes,
        samples.len(),
        config.sample_rate,
        config.peak_threshold,
        config.peak_distance,
    );
    let note_name = matcher.match_first(&peaks).transpose()?;

    debug!(
        "[ANALYSIS] {} samples, {} peaks, note {:?}",
        samples.len(),
        peaks.len(),
        note_name
    );

    Ok(FrameAnalysis {
        peaks,
        note_name,
        magnitudes,
    })
}
