//! Synthetic zonal-wind fields with a meandering jet.
//!
//! Used by the CLI `synth` command and the integration tests. Each day the jet
//! axis sits at
//!   mean_latitude + seasonal_amplitude · cos(2π (doy − 15) / 365.25) + wobble
//! where the wobble is a seeded AR(1) process, and the wind profile across
//! latitude is a Gaussian of width `jet_width` plus white noise.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::calendar::daily_axis;
use crate::error::{DiagError, Result};
use crate::series::{Coordinate, Dimension, GriddedSeries};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticJet {
    pub seed: u64,
    pub start: NaiveDate,
    pub n_days: usize,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lat_step: f64,
    pub n_lon: usize,
    /// Annual-mean jet latitude (°N).
    pub mean_latitude: f64,
    /// Half the annual swing of the jet latitude (°). Poleward in boreal summer.
    pub seasonal_amplitude: f64,
    /// Standard deviation of the day-to-day jet displacement (°).
    pub wobble: f64,
    /// Lag-one autocorrelation of the displacement.
    pub persistence: f64,
    pub peak_speed: f64,
    pub jet_width: f64,
    /// White-noise standard deviation added to every wind value (m s-1).
    pub noise: f64,
}

impl Default for SyntheticJet {
    fn default() -> Self {
        Self {
            seed: 42,
            start: NaiveDate::from_ymd_opt(1979, 1, 1).unwrap_or_default(),
            n_days: 4 * 365 + 1,
            lat_min: 15.0,
            lat_max: 75.0,
            lat_step: 2.5,
            n_lon: 4,
            mean_latitude: 45.0,
            seasonal_amplitude: -5.0,
            wobble: 4.0,
            persistence: 0.8,
            peak_speed: 25.0,
            jet_width: 8.0,
            noise: 1.0,
        }
    }
}

impl SyntheticJet {
    pub fn latitudes(&self) -> Vec<f64> {
        let n = ((self.lat_max - self.lat_min) / self.lat_step).floor() as usize + 1;
        (0..n).map(|i| self.lat_min + i as f64 * self.lat_step).collect()
    }

    /// Jet-axis latitude for every day and longitude, time-major.
    pub fn jet_axis(&self) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let innovation = self.wobble * (1.0 - self.persistence * self.persistence).max(0.0).sqrt();
        let mut wobble = vec![0.0; self.n_lon];
        let mut out = Vec::with_capacity(self.n_days * self.n_lon);
        for t in daily_axis(self.start, self.n_days) {
            let phase = 2.0 * std::f64::consts::PI * (f64::from(t.ordinal()) - 15.0) / 365.25;
            let seasonal = self.mean_latitude + self.seasonal_amplitude * phase.cos();
            for w in wobble.iter_mut() {
                *w = self.persistence * *w + innovation * standard_normal(&mut rng);
                out.push(seasonal + *w);
            }
        }
        out
    }

    /// time × latitude × longitude wind field.
    pub fn generate(&self) -> Result<GriddedSeries> {
        if self.n_days == 0 || self.n_lon == 0 || !(self.lat_step > 0.0) || self.lat_max <= self.lat_min {
            return Err(DiagError::InvalidConfig(format!(
                "synthetic grid is empty: {} days, {} longitudes, latitudes {}..{} step {}",
                self.n_days, self.n_lon, self.lat_min, self.lat_max, self.lat_step
            )));
        }
        if !(self.jet_width > 0.0) {
            return Err(DiagError::InvalidConfig("jet width must be positive".into()));
        }

        let lats = self.latitudes();
        let axis = self.jet_axis();
        let mut rng = StdRng::seed_from_u64(self.seed ^ 0x5A5A);

        let mut values = Vec::with_capacity(self.n_days * lats.len() * self.n_lon);
        for t in 0..self.n_days {
            for &lat in &lats {
                for k in 0..self.n_lon {
                    let centre = axis[t * self.n_lon + k];
                    let z = (lat - centre) / self.jet_width;
                    values.push(self.peak_speed * (-z * z).exp() + self.noise * standard_normal(&mut rng));
                }
            }
        }

        let lons = (0..self.n_lon).map(|k| k as f64 * 360.0 / self.n_lon as f64).collect();
        GriddedSeries::new(
            "ua",
            "m s-1",
            vec![
                (Dimension::Time, Coordinate::Time(daily_axis(self.start, self.n_days))),
                (Dimension::Latitude, Coordinate::Numeric(lats)),
                (Dimension::Longitude, Coordinate::Numeric(lons)),
            ],
            values,
        )
    }
}

/// Box–Muller draw from N(0, 1).
pub fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_field() {
        let cfg = SyntheticJet { n_days: 30, ..Default::default() };
        assert_eq!(cfg.generate().unwrap(), cfg.generate().unwrap());
    }

    #[test]
    fn shape_follows_parameters() {
        let cfg = SyntheticJet { n_days: 10, n_lon: 3, ..Default::default() };
        let s = cfg.generate().unwrap();
        assert_eq!(s.shape(), vec![10, 25, 3]);
        assert_eq!(s.dims(), &[Dimension::Time, Dimension::Latitude, Dimension::Longitude]);
    }

    #[test]
    fn noiseless_jet_peaks_near_its_axis() {
        let cfg = SyntheticJet {
            n_days: 5,
            n_lon: 1,
            noise: 0.0,
            wobble: 0.0,
            ..Default::default()
        };
        let s = cfg.generate().unwrap();
        let axis = cfg.jet_axis();
        let lats = cfg.latitudes();
        for t in 0..5 {
            let lane = &s.values()[t * lats.len()..(t + 1) * lats.len()];
            let best = lane
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |b, (i, &v)| if v > b.1 { (i, v) } else { b });
            assert!((lats[best.0] - axis[t]).abs() <= cfg.lat_step / 2.0 + 1e-9);
        }
    }

    #[test]
    fn empty_grid_rejected() {
        let cfg = SyntheticJet { n_days: 0, ..Default::default() };
        assert!(matches!(cfg.generate(), Err(DiagError::InvalidConfig(_))));
    }
}
