//! FIR filtering along the time dimension.
//!
//! The kernel is applied to every time lane of the series independently with
//! "same"-length output: the full zero-padded convolution is cropped so that
//! output sample `i` is centred on input sample `i`.

pub mod lanczos;

use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};
use crate::series::{Dimension, GriddedSeries};

pub use lanczos::{lanczos_bandpass_weights, lanczos_weights};

/// A fixed real-valued convolution kernel applied along time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalFilter {
    weights: Vec<f64>,
}

impl TemporalFilter {
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(DiagError::ShapeMismatch("filter kernel is empty".into()));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(DiagError::InvalidConfig("filter kernel has non-finite weights".into()));
        }
        Ok(Self { weights })
    }

    /// The kernel `[1.0]`.
    pub fn identity() -> Self {
        Self { weights: vec![1.0] }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Filter every time lane of `series`. Output has the input's shape,
    /// dims and coordinates.
    pub fn apply(&self, series: &GriddedSeries) -> Result<GriddedSeries> {
        let axis = series.require_axis(&Dimension::Time)?;
        let extent = series.shape()[axis];
        if self.weights.len() > extent {
            return Err(DiagError::ShapeMismatch(format!(
                "kernel of length {} exceeds time extent {extent} of `{}`",
                self.weights.len(),
                series.name()
            )));
        }

        tracing::debug!(
            series = series.name(),
            kernel = self.weights.len(),
            steps = extent,
            "filtering along time"
        );

        let values = series.map_lanes(axis, extent, |lane| Ok(convolve_same(lane, &self.weights)))?;
        series.with_values(values)
    }
}

/// Discrete convolution of `x` with `w`, cropped to `x.len()` samples.
///
/// `y[i] = Σ_j x[i + (K-1)/2 - j] · w[j]`, terms outside `x` taken as zero.
pub fn convolve_same(x: &[f64], w: &[f64]) -> Vec<f64> {
    let n = x.len();
    let k = w.len();
    if n == 0 || k == 0 {
        return vec![0.0; n];
    }
    let offset = (k - 1) / 2;
    (0..n)
        .map(|i| {
            let centre = i + offset;
            // j must satisfy 0 <= centre - j < n.
            let j_lo = (centre + 1).saturating_sub(n);
            let j_hi = centre.min(k - 1);
            (j_lo..=j_hi).map(|j| x[centre - j] * w[j]).sum()
        })
        .collect()
}
