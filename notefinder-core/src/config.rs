//! Analysis settings shared by the library and its front ends.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```json
//! { "reference_a4": 432.0, "mode": "dorian" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::note::Note;
use crate::rng::XorShift;
use crate::scale::{Mode, Scale};

/// Default audio frame length in samples.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Frequency of A4 in Hz.
    pub reference_a4: f64,
    /// Seed for random note sampling.
    pub seed: i64,
    /// Step pattern used to build the scale.
    pub mode: Mode,
    pub sample_rate: u32,
    /// Samples per analysis frame.
    pub chunk_size: usize,
    /// Minimum distance between spectral peaks, in bins.
    pub peak_distance: usize,
    /// Peak floor as a fraction of the tallest bin.
    pub peak_threshold: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_a4: 440.0,
            seed: 1,
            mode: Mode::Chromatic,
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            peak_distance: 20,
            peak_threshold: 0.1,
        }
    }
}

impl AnalysisConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    ///
    /// # Errors
    /// * [`Error::Io`] if the file cannot be read
    /// * [`Error::Config`] if it is not a valid config document
    /// * [`Error::InvalidArgument`] if a value fails [`AnalysisConfig::validate`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        debug!("[CONFIG] Loaded {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.reference_a4.is_finite() || self.reference_a4 <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "reference_a4 must be a positive frequency, got {}",
                self.reference_a4
            )));
        }
        if self.sample_rate == 0 {
            return Err(Error::InvalidArgument("sample_rate must be non-zero".into()));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidArgument("chunk_size must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&self.peak_threshold) {
            return Err(Error::InvalidArgument(format!(
                "peak_threshold must lie in [0, 1], got {}",
                self.peak_threshold
            )));
        }
        Ok(())
    }

    /// The A4 note at the configured reference pitch.
    pub fn reference_note(&self) -> Result<Note> {
        Note::reference_a4(self.reference_a4)
    }

    /// Builds the configured scale anchored at A4.
    pub fn build_scale(&self) -> Result<Scale> {
        Scale::from_mode(self.reference_note()?, self.mode)
    }

    /// A wall-clock-perturbed generator seeded from the config.
    pub fn rng(&self) -> XorShift {
        XorShift::new(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = AnalysisConfig::from_json_str(r#"{"reference_a4": 432.0, "mode": "dorian"}"#)
            .unwrap();
        assert_eq!(
            config,
            AnalysisConfig {
                reference_a4: 432.0,
                mode: Mode::Dorian,
                ..AnalysisConfig::default()
            }
        );
    }

    #[test]
    fn test_mode_alias_in_config() {
        let config = AnalysisConfig::from_json_str(r#"{"mode": "myxolodian"}"#).unwrap();
        assert_eq!(config.mode, Mode::Mixolydian);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            AnalysisConfig::from_json_str(r#"{"reference_a4": -1.0}"#),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_json_str(r#"{"chunk_size": 0}"#),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_json_str(r#"{"peak_threshold": 2.0}"#),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_json_str(r#"{"mode": "bebop"}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_json_str("not json"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notefinder.json");
        fs::write(&path, r#"{"seed": -3, "mode": "locrian"}"#).unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.seed, -3);
        assert_eq!(config.mode, Mode::Locrian);
        assert_eq!(config.reference_a4, 440.0);
    }

    #[test]
    fn test_load_reports_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AnalysisConfig::load(dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));

        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"sample_rate": 0}"#).unwrap();
        assert!(matches!(AnalysisConfig::load(&path), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_builds_reference_scale() {
        let scale = AnalysisConfig::default().build_scale().unwrap();
        assert_eq!(scale.members().get("A4"), Some(440.0));
        assert_eq!(scale.steps(), Mode::Chromatic.steps());
    }
}
