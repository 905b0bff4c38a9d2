//! Synthetic test signals.

use crate::error::{CoreError, CoreResult};
use rand::Rng;

/// Largest number of samples [`pink_noise`] generates.
pub const MAX_GENERATED_SAMPLES: usize = 20_000_000;

/// Default number of random sources for [`voss`].
pub const DEFAULT_SOURCES: usize = 32;

/// Draws from a geometric distribution with success probability 1/2,
/// counting trials (so the result is at least 1).
fn geometric_half<R: Rng + ?Sized>(rng: &mut R) -> usize {
    let mut trials = 1;
    while !rng.gen_bool(0.5) {
        trials += 1;
    }
    trials
}

/// Voss-McCartney pink noise: the sum of `sources` random sources, each
/// held until it is redrawn.
///
/// Source 0 is redrawn at every sample. The other sources keep their value
/// across samples, and `rows` redraws are spread over random samples with
/// source `k` chosen with probability `2^-k`.
pub fn voss<R: Rng + ?Sized>(rows: usize, sources: usize, rng: &mut R) -> Vec<f64> {
    if rows == 0 || sources == 0 {
        return Vec::new();
    }

    let mut updates: Vec<(usize, usize, f64)> = (0..rows)
        .map(|_| {
            let mut source = geometric_half(rng);
            if source >= sources {
                source = 0;
            }
            (rng.gen_range(0..rows), source, rng.gen::<f64>())
        })
        .collect();
    // stable: a later redraw of the same cell wins
    updates.sort_by_key(|&(row, _, _)| row);

    let mut current: Vec<f64> = (0..sources).map(|_| rng.gen::<f64>()).collect();
    let mut pending = updates.into_iter().peekable();
    let mut out = Vec::with_capacity(rows);
    for row in 0..rows {
        current[0] = rng.gen::<f64>();
        while let Some((_, source, value)) = pending.next_if(|&(r, _, _)| r == row) {
            current[source] = value;
        }
        out.push(current.iter().sum());
    }
    out
}

/// Linearly maps `data` onto `[low, high]`: the minimum becomes `low` and
/// the maximum `high`. A constant signal maps to `low`.
#[must_use]
pub fn scale_signal(data: &[f64], low: f64, high: f64) -> Vec<f64> {
    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 || !range.is_finite() {
        return vec![low; data.len()];
    }
    data.iter()
        .map(|x| (x - min) / range * (high - low) + low)
        .collect()
}

/// Generates `seconds` of pink noise at `sampling_frequency`, scaled to
/// `[low, high]`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidOperation`] if more than
/// [`MAX_GENERATED_SAMPLES`] samples would be generated.
pub fn pink_noise<R: Rng + ?Sized>(
    sampling_frequency: f64,
    seconds: f64,
    low: f64,
    high: f64,
    rng: &mut R,
) -> CoreResult<Vec<f64>> {
    let samples = sampling_frequency * seconds;
    if samples.is_nan() || samples > MAX_GENERATED_SAMPLES as f64 {
        return Err(CoreError::invalid_operation(format!(
            "too many samples to generate: {samples}"
        )));
    }
    let data = voss(samples as usize, DEFAULT_SOURCES, rng);
    Ok(scale_signal(&data, low, high))
}
