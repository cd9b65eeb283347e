//! Canonical string form for IEEE-754 values.
//!
//! The output is an exact base-2 rendering: `<sign><exponent>:<mantissa bits>`, where the
//! magnitude is scaled into `(0.5, 1]`. Since every `f32` widens to `f64` exactly, a single
//! and a double holding the same real number normalize identically.

use thiserror::Error;

/// Upper bound on the length of a normalized float string.
const MAX_NORMALIZED_LEN: usize = 1000;

/// Returned when the mantissa expansion leaves its expected range or does not terminate.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("could not normalize float: {0}")]
pub struct NormalizeError(pub f64);

/// Normalizes any `f64`, including the non-finite values.
pub fn normalize(value: f64) -> Result<String, NormalizeError> {
    if value.is_nan() {
        return Ok("NaN".to_string());
    }
    if value.is_infinite() {
        let s = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return Ok(s.to_string());
    }
    normalize_finite(value)
}

/// Normalizes a finite, non-NaN value.
fn normalize_finite(original: f64) -> Result<String, NormalizeError> {
    // Covers -0.0 as well.
    if original == 0.0 {
        return Ok("+0:".to_string());
    }

    let mut f = original;
    let mut out = String::new();
    if f < 0.0 {
        out.push('-');
        f = -f;
    } else {
        out.push('+');
    }

    let mut exponent: i32 = 0;
    while f > 1.0 {
        f /= 2.0;
        exponent += 1;
    }
    while f <= 0.5 {
        f *= 2.0;
        exponent -= 1;
    }
    out.push_str(&exponent.to_string());
    out.push(':');

    if f > 1.0 || f <= 0.5 {
        return Err(NormalizeError(original));
    }
    while f != 0.0 {
        if f >= 1.0 {
            out.push('1');
            f -= 1.0;
        } else {
            out.push('0');
        }
        if f >= 1.0 || out.len() >= MAX_NORMALIZED_LEN {
            return Err(NormalizeError(original));
        }
        f *= 2.0;
    }
    Ok(out)
}
