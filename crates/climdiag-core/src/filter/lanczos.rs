//! Lanczos FIR kernels (Duchon 1979).
//!
//! Cutoffs are in cycles per time step (0 < fc < 0.5). A `window` of `2m+1`
//! samples yields `m` non-zero weights either side of the centre.

use crate::error::{DiagError, Result};

/// Low-pass Lanczos weights of odd length `window`, normalised to unit sum.
pub fn lanczos_weights(window: usize, cutoff: f64) -> Result<Vec<f64>> {
    validate(window, cutoff)?;

    let order = (window - 1) / 2 + 1;
    let centre = window / 2;
    let mut w = vec![0.0; window];
    w[centre] = 2.0 * cutoff;

    for k in 1..order {
        let kf = k as f64;
        let pi_k = std::f64::consts::PI * kf;
        let sigma = (pi_k / order as f64).sin() * order as f64 / pi_k;
        let first = (2.0 * std::f64::consts::PI * cutoff * kf).sin() / pi_k;
        w[centre - k] = first * sigma;
        w[centre + k] = first * sigma;
    }

    let sum: f64 = w.iter().sum();
    if sum.abs() < 1e-12 {
        return Err(DiagError::InvalidConfig(format!(
            "lanczos kernel (window {window}, cutoff {cutoff}) sums to zero"
        )));
    }
    Ok(w.into_iter().map(|v| v / sum).collect())
}

/// Band-pass kernel keeping periods between `1/high` and `1/low` steps:
/// the difference of two low-pass kernels.
pub fn lanczos_bandpass_weights(window: usize, low: f64, high: f64) -> Result<Vec<f64>> {
    if low >= high {
        return Err(DiagError::InvalidConfig(format!(
            "band-pass low cutoff {low} must be below high cutoff {high}"
        )));
    }
    let hi = lanczos_weights(window, high)?;
    let lo = lanczos_weights(window, low)?;
    Ok(hi.iter().zip(&lo).map(|(h, l)| h - l).collect())
}

fn validate(window: usize, cutoff: f64) -> Result<()> {
    if window < 3 || window % 2 == 0 {
        return Err(DiagError::InvalidConfig(format!(
            "lanczos window must be odd and >= 3, got {window}"
        )));
    }
    if !(cutoff > 0.0 && cutoff < 0.5) {
        return Err(DiagError::InvalidConfig(format!(
            "lanczos cutoff must lie in (0, 0.5) cycles per step, got {cutoff}"
        )));
    }
    Ok(())
}
