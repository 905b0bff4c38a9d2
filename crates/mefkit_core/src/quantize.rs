//! Float to fixed-point sample conversion.
//!
//! Samples are stored as `i32` scaled by `10^precision`. The scale factor
//! written to segment metadata is `10^-precision`, so a stored integer times
//! the scale factor gives the physical value back.
//!
//! Gaps are non-finite samples (NaN, ±inf). They are zero-filled before
//! conversion; carving them out of the stored data is the job of
//! [`crate::intervals`].

use tracing::warn;

/// Mean absolute sample-to-sample difference that precision inference
/// scales up to.
pub const PRECISION_TARGET: f64 = 1000.0;

/// Result of [`infer_precision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferredPrecision {
    /// Number of decimal digits to keep.
    pub precision: u32,
    /// How many times precision was lowered to keep the range inside `i32`.
    /// Non-zero means the write proceeds at reduced fidelity.
    pub saturation_steps: u32,
}

impl InferredPrecision {
    /// Returns true if the dynamic range forced a lower precision.
    #[must_use]
    pub const fn saturated(&self) -> bool {
        self.saturation_steps > 0
    }
}

/// A sample buffer converted to fixed point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedBuffer {
    /// Scaled samples; gap positions hold 0.
    pub samples: Vec<i32>,
    /// Decimal digits the samples were scaled by.
    pub precision: u32,
}

impl QuantizedBuffer {
    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the buffer holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Scale factor matching this buffer's precision.
    #[must_use]
    pub fn scale_factor(&self) -> f64 {
        scale_factor(self.precision)
    }

    /// Checks this buffer against the samples it was produced from.
    #[must_use]
    pub fn matches(&self, original: &[f64]) -> bool {
        verify_roundtrip(original, &self.samples, self.precision)
    }
}

/// Returns true if `x` marks a missing sample.
#[inline]
#[must_use]
pub fn is_gap(x: f64) -> bool {
    !x.is_finite()
}

/// `10^precision` as a float.
fn pow10(precision: u32) -> f64 {
    10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX))
}

/// Mean of |x[i+1] - x[i]| over pairs where neither sample is a gap.
/// NaN when no such pair exists.
fn mean_abs_diff(buffer: &[f64]) -> f64 {
    let (sum, count) = buffer
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| d.is_finite())
        .fold((0.0, 0usize), |(sum, count), d| (sum + d.abs(), count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Minimum and maximum over non-gap samples.
fn finite_bounds(buffer: &[f64]) -> Option<(f64, f64)> {
    buffer
        .iter()
        .copied()
        .filter(|x| !is_gap(*x))
        .fold(None, |acc, x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })
}

/// Fixed-point divisor for a precision: `10^-precision`.
#[must_use]
pub fn scale_factor(precision: u32) -> f64 {
    1.0 / pow10(precision)
}

/// Recovers the precision encoded by a stored scale factor.
///
/// Stale or nonsensical factors (non-finite, or implying a negative
/// precision) fall back to 0 with a warning.
#[must_use]
pub fn precision_from_scale_factor(scale_factor: f64) -> u32 {
    let raw = (-scale_factor.log10()).round();
    if !raw.is_finite() || raw < 0.0 {
        warn!(scale_factor, "scale factor does not encode a precision, using 0");
        return 0;
    }
    raw as u32
}

/// Clamps a caller-supplied precision to the valid range.
///
/// Negative values are not an error: they fall back to 0, i.e. conversion
/// without scaling.
#[must_use]
pub fn normalize_precision(precision: i64) -> u32 {
    if precision < 0 {
        warn!(precision, "negative precision, converting without scaling");
        return 0;
    }
    u32::try_from(precision).unwrap_or(u32::MAX)
}

/// Returns false only if the scaled minimum underflows `i32::MIN` *and* the
/// scaled maximum overflows `i32::MAX`.
///
/// A one-sided overflow passes this check.
#[must_use]
pub fn check_dynamic_range(min: f64, max: f64, alpha: f64) -> bool {
    !(min * alpha < f64::from(i32::MIN) && max * alpha > f64::from(i32::MAX))
}

/// Estimates how many decimal digits to keep for `buffer`.
///
/// The mean absolute first difference is multiplied by 10 until it reaches
/// [`PRECISION_TARGET`]; the number of multiplications is the precision.
/// The precision is then lowered while the buffer's extremes do not fit
/// (see [`check_dynamic_range`]), down to 0 at most.
#[must_use]
pub fn infer_precision(buffer: &[f64]) -> InferredPrecision {
    let mut mean = mean_abs_diff(buffer);
    let mut precision = 0u32;
    while mean < PRECISION_TARGET && mean != 0.0 {
        precision += 1;
        mean *= 10.0;
    }

    let mut saturation_steps = 0;
    if let Some((min, max)) = finite_bounds(buffer) {
        while precision != 0 && !check_dynamic_range(min, max, pow10(precision)) {
            precision -= 1;
            saturation_steps += 1;
            warn!(precision, "dynamic range saturated, precision decreased");
        }
    }

    InferredPrecision {
        precision,
        saturation_steps,
    }
}

/// Converts `buffer` to `i32` at `precision` decimal digits.
///
/// Values are scaled by `10^precision` and rounded half to even. Gaps
/// become 0. Values outside the `i32` range saturate; keeping them in range
/// is the contract of [`infer_precision`].
#[must_use]
pub fn quantize(buffer: &[f64], precision: i64) -> QuantizedBuffer {
    let precision = normalize_precision(precision);
    let alpha = pow10(precision);
    let samples = buffer
        .iter()
        .map(|&x| {
            let x = if is_gap(x) { 0.0 } else { x };
            (x * alpha).round_ties_even() as i32
        })
        .collect();
    QuantizedBuffer { samples, precision }
}

/// Checks that `quantized / 10^precision` reproduces `original` within an
/// absolute tolerance of `10^-(precision-1)`, ignoring gap positions.
#[must_use]
pub fn verify_roundtrip(original: &[f64], quantized: &[i32], precision: u32) -> bool {
    if original.len() != quantized.len() {
        return false;
    }
    let alpha = pow10(precision);
    let tolerance = 10.0 / alpha;
    original
        .iter()
        .zip(quantized)
        .filter(|(x, _)| !is_gap(**x))
        .all(|(&x, &q)| (f64::from(q) / alpha - x).abs() <= tolerance)
}
