//! Histogram and Gaussian kernel density estimate of one season's samples.
//!
//! Histogram edges start at `floor(min) - bin_width/2` and step by
//! `bin_width` until an edge passes `max`, so bins are centred on whole
//! multiples of the anchor. The KDE uses Silverman's factor
//! `(3n/4)^(-1/5)` times the sample standard deviation (ddof = 1), further
//! scaled by `bandwidth_scale`, and is evaluated on `n_points` evenly spaced
//! points spanning the histogram edges.

use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};

pub const DEFAULT_BIN_WIDTH: f64 = 2.5;
pub const DEFAULT_BANDWIDTH_SCALE: f64 = 1.06;
pub const DEFAULT_KDE_POINTS: usize = 100;
/// Upper bound on histogram bins for one sample set.
pub const MAX_HISTOGRAM_BINS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityEstimator {
    pub bin_width: f64,
    /// Multiplier on the Silverman bandwidth.
    pub bandwidth_scale: f64,
    /// KDE evaluation points.
    pub n_points: usize,
}

impl Default for DensityEstimator {
    fn default() -> Self {
        Self {
            bin_width: DEFAULT_BIN_WIDTH,
            bandwidth_scale: DEFAULT_BANDWIDTH_SCALE,
            n_points: DEFAULT_KDE_POINTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub centers: Vec<f64>,
    pub counts: Vec<usize>,
    /// `count / (n · bin_width)`; sums to 1 when multiplied by the bin width.
    pub density: Vec<f64>,
}

/// A fitted Gaussian KDE.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKde {
    samples: Vec<f64>,
    /// Kernel standard deviation in sample units.
    bandwidth: f64,
}

impl GaussianKde {
    /// Fit with Silverman's rule scaled by `scale`.
    pub fn silverman(samples: &[f64], scale: f64) -> Result<Self> {
        let n = samples.len();
        if n < 2 {
            return Err(DiagError::InsufficientData(format!(
                "kernel density needs at least 2 samples, got {n}"
            )));
        }
        let nf = n as f64;
        let mean = samples.iter().sum::<f64>() / nf;
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (nf - 1.0);
        if !(var > 0.0) {
            return Err(DiagError::InsufficientData("samples have zero variance".into()));
        }
        let factor = (nf * 3.0 / 4.0).powf(-1.0 / 5.0) * scale;
        Ok(Self {
            samples: samples.to_vec(),
            bandwidth: factor * var.sqrt(),
        })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let norm = 1.0 / (self.bandwidth * (2.0 * std::f64::consts::PI).sqrt() * self.samples.len() as f64);
        self.samples
            .iter()
            .map(|&s| {
                let z = (x - s) / self.bandwidth;
                (-0.5 * z * z).exp()
            })
            .sum::<f64>()
            * norm
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KdeCurve {
    pub bandwidth: f64,
    pub points: Vec<f64>,
    pub density: Vec<f64>,
}

/// Histogram plus KDE for one sample set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityEstimate {
    pub n_samples: usize,
    pub mean: f64,
    pub histogram: Histogram,
    pub kde: KdeCurve,
}

impl DensityEstimator {
    pub fn validate(&self) -> Result<()> {
        if !(self.bin_width > 0.0 && self.bin_width.is_finite()) {
            return Err(DiagError::InvalidConfig(format!("bin width must be positive, got {}", self.bin_width)));
        }
        if !(self.bandwidth_scale > 0.0 && self.bandwidth_scale.is_finite()) {
            return Err(DiagError::InvalidConfig(format!(
                "bandwidth scale must be positive, got {}",
                self.bandwidth_scale
            )));
        }
        if self.n_points < 2 {
            return Err(DiagError::InvalidConfig(format!("need at least 2 KDE points, got {}", self.n_points)));
        }
        Ok(())
    }

    /// Histogram and KDE of the finite values in `samples`.
    pub fn estimate(&self, samples: &[f64]) -> Result<DensityEstimate> {
        self.validate()?;
        let finite: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        let dropped = samples.len() - finite.len();
        if dropped > 0 {
            tracing::warn!(dropped, "non-finite samples dropped before density estimation");
        }
        if finite.len() < 2 {
            return Err(DiagError::InsufficientData(format!(
                "density estimate needs at least 2 finite samples, got {}",
                finite.len()
            )));
        }

        let histogram = self.histogram(&finite)?;
        let lo = histogram.edges[0];
        let hi = histogram.edges[histogram.edges.len() - 1];
        let kde = GaussianKde::silverman(&finite, self.bandwidth_scale)?;
        let points = linspace(lo, hi, self.n_points);
        let density = points.iter().map(|&x| kde.evaluate(x)).collect();

        Ok(DensityEstimate {
            n_samples: finite.len(),
            mean: finite.iter().sum::<f64>() / finite.len() as f64,
            histogram,
            kde: KdeCurve {
                bandwidth: kde.bandwidth(),
                points,
                density,
            },
        })
    }

    /// Fixed-width histogram normalised to a density.
    pub fn histogram(&self, samples: &[f64]) -> Result<Histogram> {
        if samples.is_empty() {
            return Err(DiagError::InsufficientData("histogram of an empty sample set".into()));
        }
        let w = self.bin_width;
        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let start = min.floor() - w / 2.0;

        // Last edge is the first one strictly above `max`.
        let span = ((max - start) / w).floor();
        if !(span.is_finite() && span < MAX_HISTOGRAM_BINS as f64) {
            return Err(DiagError::InvalidConfig(format!(
                "bin width {w} over range {min}..{max} needs more than {MAX_HISTOGRAM_BINS} bins"
            )));
        }
        let mut n_bins = span as usize + 1;
        if start + n_bins as f64 * w <= max {
            n_bins += 1;
        }
        let edges: Vec<f64> = (0..=n_bins).map(|k| start + k as f64 * w).collect();

        let mut counts = vec![0usize; n_bins];
        for &v in samples {
            let b = ((v - start) / w).floor().max(0.0) as usize;
            counts[b.min(n_bins - 1)] += 1;
        }

        let norm = samples.len() as f64 * w;
        Ok(Histogram {
            centers: edges.windows(2).map(|p| 0.5 * (p[0] + p[1])).collect(),
            density: counts.iter().map(|&c| c as f64 / norm).collect(),
            counts,
            edges,
        })
    }
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::synthetic::standard_normal;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn normal_samples(n: usize, mean: f64, sd: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| mean + sd * standard_normal(&mut rng)).collect()
    }

    #[test]
    fn edges_are_anchored_below_the_minimum() {
        let h = DensityEstimator::default().histogram(&[40.3, 41.0, 47.9]).unwrap();
        assert_abs_diff_eq!(h.edges[0], 38.75, epsilon = 1e-12);
        assert!(*h.edges.last().unwrap() > 47.9);
        assert!(h.edges[h.edges.len() - 2] <= 47.9);
        assert_eq!(h.counts.iter().sum::<usize>(), 3);
        assert_abs_diff_eq!(h.centers[0], 40.0, epsilon = 1e-12);
    }

    #[test]
    fn tiny_bin_width_is_rejected_before_allocating() {
        let est = DensityEstimator { bin_width: 1e-9, ..Default::default() };
        let err = est.histogram(&[0.0, 1000.0]).unwrap_err();
        assert!(matches!(err, DiagError::InvalidConfig(_)), "{err:?}");
    }

    #[test]
    fn max_on_an_edge_gets_its_own_bin() {
        // Edges -0.25, 2.25, 4.75, 7.25: 4.75 is not above max.
        let h = DensityEstimator::default().histogram(&[1.0, 4.75]).unwrap();
        assert_eq!(h.edges.len(), 4);
        assert_abs_diff_eq!(*h.edges.last().unwrap(), 7.25, epsilon = 1e-12);
        assert_eq!(h.counts, vec![1, 0, 1]);
        assert_eq!(h.counts.len(), h.edges.len() - 1);
        assert_eq!(h.counts.iter().sum::<usize>(), 2);
    }

    #[test]
    fn histogram_density_integrates_to_one() {
        let samples = normal_samples(800, 45.0, 4.0, 7);
        let est = DensityEstimator::default();
        let h = est.histogram(&samples).unwrap();
        let integral: f64 = h.density.iter().map(|d| d * est.bin_width).sum();
        assert_abs_diff_eq!(integral, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn kde_integrates_to_about_one() {
        let samples = normal_samples(500, 45.0, 3.0, 11);
        let e = DensityEstimator::default().estimate(&samples).unwrap();
        assert_eq!(e.kde.points.len(), 100);
        let dx = e.kde.points[1] - e.kde.points[0];
        let d = &e.kde.density;
        // Trapezoid rule.
        let integral = dx * (d.iter().sum::<f64>() - 0.5 * (d[0] + d[d.len() - 1]));
        assert_abs_diff_eq!(integral, 1.0, epsilon = 0.02);
        assert!(d.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn kde_is_non_negative_at_samples() {
        let samples = [42.5, 45.0, 45.0, 50.0];
        let kde = GaussianKde::silverman(&samples, 1.06).unwrap();
        for &s in &samples {
            assert!(kde.evaluate(s) >= 0.0);
        }
    }

    #[test]
    fn silverman_bandwidth_matches_formula() {
        let samples = [1.0, 2.0, 3.0, 4.0];
        let kde = GaussianKde::silverman(&samples, 1.06).unwrap();
        let sd = (5.0f64 / 3.0).sqrt();
        let expected = 3.0f64.powf(-0.2) * 1.06 * sd;
        assert_abs_diff_eq!(kde.bandwidth(), expected, epsilon = 1e-12);
    }

    #[test]
    fn fewer_than_two_samples_is_insufficient() {
        let est = DensityEstimator::default();
        assert!(matches!(est.estimate(&[1.0]), Err(DiagError::InsufficientData(_))));
        assert!(matches!(est.estimate(&[1.0, f64::NAN]), Err(DiagError::InsufficientData(_))));
        assert!(matches!(est.estimate(&[]), Err(DiagError::InsufficientData(_))));
    }

    #[test]
    fn identical_samples_are_insufficient() {
        let est = DensityEstimator::default();
        assert!(matches!(est.estimate(&[3.0, 3.0, 3.0]), Err(DiagError::InsufficientData(_))));
    }
}
