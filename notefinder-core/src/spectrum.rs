//! # Spectrum Module
//!
//! Supplies the spectral peaks that note matching consumes. It turns a
//! decoded sample buffer into a magnitude spectrum and picks out the local
//! maxima that stand clear of the noise floor.
//!
//! ## Features
//! - Forward FFT using RustFFT, sized to the buffer
//! - DC offset removal and Hann windowing before the transform
//! - Peak picking with a relative height floor and a minimum bin distance

use rustfft::{FftPlanner, num_complex::Complex};

/// Computes the magnitude spectrum of `signal` up to the Nyquist bin.
///
/// The frame is centred on zero and tapered with a Hann window before the
/// transform. The returned vector has `signal.len() / 2` entries; bin `k`
/// sits at [`bin_frequency`]`(k, signal.len(), sample_rate)`.
pub fn magnitude_spectrum(signal: &[f32]) -> Vec<f32> {
    let len = signal.len();
    if len == 0 {
        return Vec::new();
    }

    let mean = signal.iter().sum::<f32>() / len as f32;
    // A single sample has no window shape; keep it at full weight.
    let taper = |i: usize| -> f32 {
        if len < 2 {
            return 1.0;
        }
        let phase = std::f32::consts::TAU * i as f32 / (len - 1) as f32;
        0.5 * (1.0 - phase.cos())
    };

    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .enumerate()
        .map(|(i, &sample)| Complex {
            re: (sample - mean) * taper(i),
            im: 0.0,
        })
        .collect();

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(len).process(&mut buffer);

    buffer.iter().take(len / 2).map(|c| c.norm()).collect()
}

/// Centre frequency in Hz of FFT bin `bin`.
pub fn bin_frequency(bin: usize, fft_len: usize, sample_rate: u32) -> f64 {
    if fft_len == 0 {
        return 0.0;
    }
    bin as f64 * sample_rate as f64 / fft_len as f64
}

/// Finds peak bins in `magnitudes`, ascending.
///
/// A peak is a sample strictly greater than its left neighbour and greater
/// than the first differing sample to its right; a flat top reports its
/// middle sample. Peaks below `min_height` are discarded. Of any two peaks
/// closer than `distance` bins, the taller one survives.
pub fn find_peaks(magnitudes: &[f32], min_height: f32, distance: usize) -> Vec<usize> {
    let mut peaks = local_maxima(magnitudes);
    peaks.retain(|&p| magnitudes[p] >= min_height);
    if distance > 1 {
        peaks = select_by_distance(&peaks, magnitudes, distance);
    }
    peaks
}

fn local_maxima(x: &[f32]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && x[i_ahead] == x[i] {
                i_ahead += 1;
            }
            if x[i_ahead] < x[i] {
                let left = i;
                let right = i_ahead - 1;
                peaks.push((left + right) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(peaks: &[usize], x: &[f32], distance: usize) -> Vec<usize> {
    let mut by_height: Vec<usize> = (0..peaks.len()).collect();
    by_height.sort_by(|&a, &b| {
        x[peaks[a]]
            .partial_cmp(&x[peaks[b]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = vec![true; peaks.len()];
    for &j in by_height.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Peak frequencies in Hz from one frame's magnitude spectrum.
///
/// `threshold` is relative to the tallest bin in the frame, so a value of
/// `0.1` drops everything more than 20 dB below the strongest component.
pub fn peak_frequencies(
    magnitudes: &[f32],
    fft_len: usize,
    sample_rate: u32,
    threshold: f32,
    distance: usize,
) -> Vec<f64> {
    let max = magnitudes.iter().copied().fold(0.0_f32, f32::max);
    if max <= 0.0 {
        return Vec::new();
    }
    find_peaks(magnitudes, max * threshold, distance)
        .into_iter()
        .map(|bin| bin_frequency(bin, fft_len, sample_rate))
        .collect()
}

/// Generates `len` samples of a sine tone.
pub fn sine_wave(frequency: f64, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    let step = 2.0 * std::f64::consts::PI * frequency / sample_rate as f64;
    (0..len)
        .map(|i| amplitude * (step * i as f64).sin() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_local_maxima_and_plateaus() {
        assert_eq!(find_peaks(&[0.0, 1.0, 0.0, 3.0, 0.0, 2.0, 0.0], 0.0, 1), vec![1, 3, 5]);
        assert_eq!(find_peaks(&[0.0, 2.0, 2.0, 2.0, 0.0], 0.0, 1), vec![2]);
        // A plateau that rises again is not a peak.
        assert_eq!(find_peaks(&[0.0, 2.0, 2.0, 3.0, 0.0], 0.0, 1), vec![3]);
        // Edges are never peaks.
        assert_eq!(find_peaks(&[5.0, 1.0, 5.0], 0.0, 1), Vec::<usize>::new());
        assert!(find_peaks(&[1.0, 2.0], 0.0, 1).is_empty());
    }

    #[test]
    fn test_height_floor() {
        assert_eq!(find_peaks(&[0.0, 1.0, 0.0, 3.0, 0.0, 2.0, 0.0], 1.5, 1), vec![3, 5]);
    }

    #[test]
    fn test_distance_keeps_tallest() {
        let x = [0.0, 1.0, 0.0, 3.0, 0.0, 2.0, 0.0];
        assert_eq!(find_peaks(&x, 0.0, 3), vec![3]);
        assert_eq!(find_peaks(&x, 0.0, 2), vec![1, 3, 5]);

        let y = [0.0, 4.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        assert_eq!(find_peaks(&y, 0.0, 4), vec![1, 7]);
    }

    #[test]
    fn test_bin_frequency() {
        assert_eq!(bin_frequency(0, 4096, 44_100), 0.0);
        assert_eq!(bin_frequency(2048, 4096, 44_100), 22_050.0);
        assert_eq!(bin_frequency(3, 0, 44_100), 0.0);
    }

    #[test]
    fn test_magnitude_spectrum_len() {
        assert!(magnitude_spectrum(&[]).is_empty());
        assert_eq!(magnitude_spectrum(&[0.0; 4096]).len(), 2048);
    }

    #[test]
    fn test_sine_peak_lands_on_its_bin() {
        let samples = sine_wave(440.0, 0.8, 44_100, 4096);
        let mags = magnitude_spectrum(&samples);
        let peaks = peak_frequencies(&mags, samples.len(), 44_100, 0.1, 20);
        assert_eq!(peaks.len(), 1);
        let bin_width = 44_100.0 / 4096.0;
        assert!((peaks[0] - 440.0).abs() <= bin_width, "peak at {}", peaks[0]);
    }

    #[test]
    fn test_silence_has_no_peaks() {
        let mags = magnitude_spectrum(&[0.0; 1024]);
        assert!(peak_frequencies(&mags, 1024, 44_100, 0.1, 20).is_empty());
    }

    #[test]
    fn test_dc_offset_does_not_move_the_peak() {
        let centred = sine_wave(440.0, 0.5, 44_100, 4096);
        let shifted: Vec<f32> = centred.iter().map(|x| x + 0.25).collect();
        let a = peak_frequencies(&magnitude_spectrum(&centred), 4096, 44_100, 0.1, 20);
        let b = peak_frequencies(&magnitude_spectrum(&shifted), 4096, 44_100, 0.1, 20);
        assert_eq!(a, b);

        let flat = magnitude_spectrum(&[0.75; 512]);
        assert!(flat.iter().all(|m| *m < 1e-3), "constant input left energy");
    }

    #[test]
    fn test_single_sample_frame() {
        assert!(magnitude_spectrum(&[1.0]).is_empty());
        assert_eq!(magnitude_spectrum(&[1.0, -1.0]).len(), 1);
    }
}
