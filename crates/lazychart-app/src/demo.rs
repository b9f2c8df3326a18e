//! Synthetic demo datasets

use std::f64::consts::TAU;
use std::sync::Arc;

use lazychart_views::PlotSample;

/// Deterministic waveform: a couple of sine harmonics plus hash-style
/// pseudo-noise, so runs are reproducible without a RNG.
pub fn waveform(samples: usize, frequency: f64, noise: f64) -> Arc<[PlotSample]> {
    (0..samples)
        .map(|i| {
            let x = i as f64 / 100.0;
            let wobble = ((i as f64 * 12.9898).sin() * 43_758.545).fract() - 0.5;
            let y = (x * frequency * TAU / 10.0).sin()
                + 0.3 * (x * frequency * 0.37 * TAU).cos()
                + noise * wobble;
            (x, y)
        })
        .collect::<Vec<_>>()
        .into()
}

/// Dataset with no points, for regions whose source is offline.
pub fn empty() -> Arc<[PlotSample]> {
    Vec::new().into()
}
