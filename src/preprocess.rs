//! Optional value transforms applied before the value codec.
//!
//! Encoding runs counter-delta first, then decimal scaling, so that scale
//! detection sees delta magnitudes. Decoding undoes them in reverse.

use crate::header::Flags;
use crate::options::{EncodeOptions, ScaleDecimals, MAX_AUTO_SCALE};

/// Significant digits used when inspecting a value's decimal form.
const DETECT_PRECISION: usize = 10;

/// Transforms applied to a value column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Preprocessing {
    pub flags: Flags,
    /// Decimal places the values were scaled by (0 when unscaled).
    pub scale_decimals: u32,
}

/// Applies the transforms selected by `options` in place.
///
/// Nothing happens unless `victoria_metrics` is set.
pub fn apply(values: &mut [f64], options: &EncodeOptions) -> Preprocessing {
    let mut applied = Preprocessing::default();
    if !options.victoria_metrics {
        return applied;
    }

    applied.flags.insert(Flags::PREPROCESSED);
    if options.is_counter {
        applied.flags.insert(Flags::COUNTER_DELTA);
        counter_delta(values);
    }

    applied.scale_decimals = match options.scale_decimals {
        ScaleDecimals::Auto => detect_scale(values),
        ScaleDecimals::Fixed(n) => n,
    };
    scale(values, applied.scale_decimals);

    log::trace!(
        "preprocessed {} values: flags={:#x} scale={}",
        values.len(),
        applied.flags.bits(),
        applied.scale_decimals
    );
    applied
}

/// Reverses [`apply`] according to the flags and scale stored in a header.
pub fn restore(values: &mut [f64], flags: Flags, scale_decimals: u32) {
    if !flags.contains(Flags::PREPROCESSED) {
        return;
    }
    if scale_decimals > 0 {
        unscale(values, scale_decimals);
    }
    if flags.contains(Flags::COUNTER_DELTA) {
        counter_restore(values);
    }
}

/// Replaces every value after the first with its difference to the previous one.
pub fn counter_delta(values: &mut [f64]) {
    for i in (1..values.len()).rev() {
        values[i] -= values[i - 1];
    }
}

/// Prefix sum starting at the first value; inverse of [`counter_delta`].
pub fn counter_restore(values: &mut [f64]) {
    for i in 1..values.len() {
        values[i] += values[i - 1];
    }
}

/// Largest number of fractional digits across `values`, capped at 6.
pub fn detect_scale(values: &[f64]) -> u32 {
    values
        .iter()
        .map(|&v| fraction_digits(v))
        .max()
        .unwrap_or(0)
        .min(MAX_AUTO_SCALE)
}

/// Multiplies by `10^decimals` and rounds each value to the nearest integer.
///
/// Rounding stays in `f64`, so magnitudes beyond the i64 range and
/// non-finite values pass through unclamped.
pub fn scale(values: &mut [f64], decimals: u32) {
    if decimals == 0 {
        return;
    }
    let factor = power_of_ten(decimals);
    for v in values.iter_mut() {
        *v = (*v * factor).round();
    }
}

/// Divides by `10^decimals`; inverse of [`scale`] up to its rounding.
pub fn unscale(values: &mut [f64], decimals: u32) {
    let factor = power_of_ten(decimals);
    for v in values.iter_mut() {
        *v /= factor;
    }
}

fn power_of_ten(decimals: u32) -> f64 {
    match 10i64.checked_pow(decimals) {
        Some(p) => p as f64,
        None => 10f64.powi(decimals.min(i32::MAX as u32) as i32),
    }
}

fn fraction_digits(v: f64) -> u32 {
    let text = format_general(v, DETECT_PRECISION);
    match text.split_once('.') {
        Some((_, fraction)) => fraction.trim_end_matches('0').len() as u32,
        None => 0,
    }
}

/// Formats `v` the way C's `%.{precision}g` does: `precision` significant
/// digits, scientific notation for very small or large exponents, and no
/// trailing zeros.
fn format_general(v: f64, precision: usize) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sci = format!("{:.*e}", precision - 1, v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= precision as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (precision as i32 - 1 - exp) as usize;
        trim_fraction(&format!("{v:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
