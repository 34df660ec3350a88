//! # notefinder - command-line front end
//!
//! Builds an equal-temperament scale from a reference A4 and a mode, then
//! prints its table, draws random notes from it, or snaps frequencies to the
//! closest scale note.
//!
//! ## Output
//! - **stdout**: results only, plain text or JSON with `--json`
//! - **stderr**: `tracing` logs, filtered by `RUST_LOG` (default `info`,
//!   `-v` for `debug`)

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use notefinder_core::{
    AnalysisConfig, Mode, NoteMatcher, Scale, Selection, SelectionKind, analyze_frame, spectrum,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "notefinder",
    version,
    about = "Equal-temperament scales, random notes and nearest-note matching"
)]
struct Cli {
    /// JSON config file. Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference pitch of A4 in Hz.
    #[arg(long = "a4", global = true)]
    reference_a4: Option<f64>,

    /// Seed for random note sampling.
    #[arg(long, global = true, allow_negative_numbers = true)]
    seed: Option<i64>,

    /// Step pattern: ionian, dorian, phrygian, lydian, mixolydian, aeolian,
    /// locrian or chromatic.
    #[arg(long, global = true)]
    mode: Option<Mode>,

    /// Log at debug level.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the scale table in generation order.
    Table {
        #[arg(long)]
        json: bool,
    },
    /// Draw random notes from the scale.
    Random {
        #[arg(short, long, default_value_t = 1)]
        count: usize,
        /// What to print: all, names or pitches.
        #[arg(short, long, default_value = "all")]
        kind: SelectionKind,
        #[arg(long)]
        json: bool,
    },
    /// Snap detected peak frequencies to the closest scale notes.
    Match {
        /// Report every peak instead of only the first.
        #[arg(long)]
        all_peaks: bool,
        #[arg(required = true)]
        peaks: Vec<f64>,
    },
    /// Analyse one frame of a synthetic sine tone.
    Tone {
        frequency: f64,
        #[arg(long, default_value_t = 0.5)]
        amplitude: f32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let scale = config.build_scale().context("building scale")?;
    info!("[MAIN] Built {} with {} notes", scale.name(), scale.len());

    match cli.command {
        Command::Table { json } => print_table(&scale, json),
        Command::Random { count, kind, json } => {
            let rng = config.rng();
            let selection = scale.random_select(count, kind, &rng)?;
            print_selection(&selection, json)
        }
        Command::Match { all_peaks, peaks } => {
            let matcher = NoteMatcher::new(&scale);
            if all_peaks {
                for (peak, note) in peaks.iter().zip(matcher.match_each(&peaks)) {
                    println!("{peak} {}", note?);
                }
            } else if let Some(note) = matcher.match_first(&peaks) {
                println!("{}", note?);
            }
            Ok(())
        }
        Command::Tone {
            frequency,
            amplitude,
        } => {
            if !frequency.is_finite() || frequency <= 0.0 {
                bail!("tone frequency must be positive, got {frequency}");
            }
            let matcher = NoteMatcher::new(&scale);
            let samples =
                spectrum::sine_wave(frequency, amplitude, config.sample_rate, config.chunk_size);
            let frame = analyze_frame(&samples, &config, &matcher)?;
            info!("[MAIN] Peaks: {:?}", frame.peaks);
            match frame.note_name {
                Some(note) => println!("{note}"),
                None => warn!("[MAIN] No peak detected for a {frequency} Hz tone"),
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = if verbose > 0 { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads the config file, if any, then applies command-line overrides.
fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if let Some(reference_a4) = cli.reference_a4 {
        config.reference_a4 = reference_a4;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    config.validate()?;
    Ok(config)
}

fn print_table(scale: &Scale, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(scale.members())?);
    } else {
        for (label, freq) in scale.members().iter() {
            println!("{label:<6}{freq:.3}");
        }
    }
    Ok(())
}

fn print_selection(selection: &Selection, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(selection)?);
        return Ok(());
    }
    match selection {
        Selection::All(table) => {
            for (label, freq) in table.iter() {
                println!("{label:<6}{freq:.3}");
            }
        }
        Selection::Names(names) => names.iter().for_each(|name| println!("{name}")),
        Selection::Pitches(pitches) => pitches.iter().for_each(|freq| println!("{freq:.3}")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "notefinder", "--a4", "432", "--mode", "Lydian", "--seed", "-9", "table",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.reference_a4, 432.0);
        assert_eq!(config.mode, Mode::Lydian);
        assert_eq!(config.seed, -9);
        assert_eq!(config.chunk_size, AnalysisConfig::default().chunk_size);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"reference_a4": 415.0, "seed": 5, "mode": "dorian"}"#).unwrap();

        let cli = Cli::try_parse_from([
            "notefinder",
            "--config",
            path.to_str().unwrap(),
            "--seed",
            "8",
            "table",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.reference_a4, 415.0);
        assert_eq!(config.mode, Mode::Dorian);
        assert_eq!(config.seed, 8);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from([
            "notefinder",
            "--config",
            "/nonexistent/notefinder.json",
            "table",
        ])
        .unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("loading config"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let parsed = Cli::try_parse_from(["notefinder", "random", "--kind", "invalid"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_bad_reference_pitch_is_rejected() {
        let cli = Cli::try_parse_from(["notefinder", "--a4", "0", "table"]).unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_match_requires_peaks() {
        assert!(Cli::try_parse_from(["notefinder", "match"]).is_err());
        let cli = Cli::try_parse_from(["notefinder", "match", "--all-peaks", "440", "330.5"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Match { all_peaks: true, ref peaks } if peaks == &vec![440.0, 330.5]
        ));
    }
}
