// ─────────────────────────────────────────────────────────────────────
// Resonance — Short-Time Fourier Transform
// ─────────────────────────────────────────────────────────────────────
//! Windowed magnitude spectra over event series (naive DFT; windows are
//! short and bins fixed at 16).

use serde::{Deserialize, Serialize};

/// Frequency bins per frame.
pub const STFT_BINS: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectrogram {
    /// One magnitude vector per time window.
    pub magnitudes: Vec<Vec<f64>>,
    pub time_windows: usize,
    pub frequency_bins: usize,
}

/// STFT of `samples` with window `win` and hop `hop`.
///
/// A zero hop or window yields an empty spectrogram.
pub fn stft(samples: &[f64], win: usize, hop: usize) -> Spectrogram {
    if win == 0 || hop == 0 {
        return Spectrogram::default();
    }
    let magnitudes: Vec<Vec<f64>> = (0..)
        .map(|k| k * hop)
        .take_while(|&start| start + win <= samples.len())
        .map(|start| dft_magnitude(&samples[start..start + win], STFT_BINS))
        .collect();
    let frequency_bins = magnitudes.first().map_or(0, Vec::len);
    Spectrogram {
        time_windows: magnitudes.len(),
        frequency_bins,
        magnitudes,
    }
}

fn dft_magnitude(x: &[f64], bins: usize) -> Vec<f64> {
    let len = x.len() as f64;
    (0..bins)
        .map(|k| {
            let (re, im) = x.iter().enumerate().fold((0.0, 0.0), |(re, im), (n, &v)| {
                let ang = -std::f64::consts::TAU * k as f64 * n as f64 / len;
                (re + v * ang.cos(), im + v * ang.sin())
            });
            re.hypot(im)
        })
        .collect()
}

/// Dominant bins as `(bin, mean magnitude)`, strongest first.
pub fn find_peaks(spectrogram: &Spectrogram, top_k: usize) -> Vec<(usize, f64)> {
    if spectrogram.time_windows == 0 {
        return Vec::new();
    }
    let mut avg = vec![0.0; spectrogram.frequency_bins];
    for frame in &spectrogram.magnitudes {
        for (acc, &m) in avg.iter_mut().zip(frame) {
            *acc += m;
        }
    }
    let windows = spectrogram.time_windows as f64;
    let mut indexed: Vec<(usize, f64)> = avg
        .into_iter()
        .map(|m| m / windows)
        .enumerate()
        .collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed.truncate(top_k);
    indexed
}
