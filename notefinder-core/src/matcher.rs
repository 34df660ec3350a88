//! # Note Matching Module
//!
//! Turns detected spectral peaks into note labels by snapping each peak to
//! the nearest frequency in a scale table.

use crate::error::{Error, Result};
use crate::scale::Scale;

/// Finds the candidate closest to `peak` and returns its label in `scale`.
///
/// Ties go to the earliest candidate. `candidates` must come from
/// `scale.frequencies()`: the final lookup is exact, so a candidate the
/// scale does not store yields [`Error::NotFound`]. An empty candidate list
/// is also [`Error::NotFound`]. A NaN or infinite `peak` is
/// [`Error::InvalidArgument`].
pub fn closest_note(peak: f64, candidates: &[f64], scale: &Scale) -> Result<String> {
    if !peak.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "peak frequency must be finite, got {peak}"
        )));
    }
    let nearest = nearest_frequency(peak, candidates).ok_or(Error::NotFound(peak))?;
    scale.note_by_frequency(nearest).map(str::to_string)
}

/// The stable minimum of `|candidate - peak|`.
fn nearest_frequency(peak: f64, candidates: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for &candidate in candidates {
        let distance = (candidate - peak).abs();
        // NaN distances never win.
        match best {
            Some((_, best_distance)) if !(distance < best_distance) => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Matches peaks against one scale, reusing its frequency list.
#[derive(Debug, Clone)]
pub struct NoteMatcher<'a> {
    scale: &'a Scale,
    candidates: Vec<f64>,
}

impl<'a> NoteMatcher<'a> {
    pub fn new(scale: &'a Scale) -> Self {
        Self {
            scale,
            candidates: scale.frequencies(),
        }
    }

    pub fn scale(&self) -> &'a Scale {
        self.scale
    }

    /// Closest scale note to a single peak frequency.
    pub fn match_peak(&self, peak: f64) -> Result<String> {
        closest_note(peak, &self.candidates, self.scale)
    }

    /// Closest note to the first detected peak, or `None` without peaks.
    ///
    /// This is the default per-frame behaviour: only the lowest-bin peak is
    /// reported.
    pub fn match_first(&self, peaks: &[f64]) -> Option<Result<String>> {
        peaks.first().map(|&peak| self.match_peak(peak))
    }

    /// Closest note for every peak, in peak order.
    pub fn match_each(&self, peaks: &[f64]) -> Vec<Result<String>> {
        peaks.iter().map(|&peak| self.match_peak(peak)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;
    use crate::scale::Mode;
    use pretty_assertions::assert_eq;

    fn chromatic() -> Scale {
        Scale::from_mode(Note::reference_a4(440.0).unwrap(), Mode::Chromatic).unwrap()
    }

    #[test]
    fn test_picks_smallest_distance() {
        assert_eq!(nearest_frequency(1000.0, &[990.0, 1010.0, 500.0]), Some(990.0));
        assert_eq!(nearest_frequency(1000.0, &[500.0, 1004.0, 990.0]), Some(1004.0));
    }

    #[test]
    fn test_ties_go_to_first() {
        assert_eq!(nearest_frequency(1000.0, &[1010.0, 990.0]), Some(1010.0));
        assert_eq!(nearest_frequency(1000.0, &[990.0, 1010.0]), Some(990.0));
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(nearest_frequency(1.0, &[]), None);
        let scale = chromatic();
        assert!(matches!(
            closest_note(440.0, &[], &scale),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_closest_note_in_custom_table() {
        // One-note table at 990 Hz; 1010 and 500 are never stored.
        let base = Note::from_class(crate::note::PitchClass::A, 990.0, 5).unwrap();
        let scale = Scale::new("pair", base, vec![0u32]).unwrap();
        assert_eq!(scale.members().get("A5"), Some(990.0));
        assert_eq!(closest_note(1000.0, &[990.0, 1010.0, 500.0], &scale).unwrap(), "A5");
    }

    #[test]
    fn test_foreign_candidate_is_not_found() {
        let scale = chromatic();
        assert!(matches!(
            closest_note(1000.0, &[990.0, 1010.0, 500.0], &scale),
            Err(Error::NotFound(f)) if f == 990.0
        ));
    }

    #[test]
    fn test_non_finite_peak_is_rejected() {
        let scale = chromatic();
        let matcher = NoteMatcher::new(&scale);
        for peak in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(
                matches!(matcher.match_peak(peak), Err(Error::InvalidArgument(_))),
                "{peak} should be rejected"
            );
        }
    }

    #[test]
    fn test_matcher_snaps_to_scale() {
        let scale = chromatic();
        let matcher = NoteMatcher::new(&scale);
        assert_eq!(matcher.match_peak(445.0).unwrap(), "A4");
        assert_eq!(matcher.match_peak(262.0).unwrap(), "C4");
        assert_eq!(matcher.match_peak(1000.0).unwrap(), "B5");
        assert_eq!(matcher.match_peak(5.0).unwrap(), "A-1");
        assert_eq!(matcher.match_peak(90_000.0).unwrap(), "A10");
    }

    #[test]
    fn test_first_peak_is_the_default() {
        let scale = chromatic();
        let matcher = NoteMatcher::new(&scale);
        assert!(matcher.match_first(&[]).is_none());
        let first = matcher.match_first(&[330.0, 440.0]).unwrap().unwrap();
        assert_eq!(first, "E4");

        let each: Vec<String> = matcher
            .match_each(&[330.0, 440.0])
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(each, vec!["E4".to_string(), "A4".to_string()]);
    }
}
