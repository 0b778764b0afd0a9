//! Day-of-year and seasonal climatologies.
//!
//! Pipeline:
//!   group by day_of_year → mean → harmonic smoothing (truncated real DFT)
//!   → group smoothed days by season → mean.
//!
//! The day-of-year axis takes the place of the time axis; every other
//! dimension of the input is carried through unchanged.

use std::collections::HashMap;

use num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarLabels, Season};
use crate::error::{DiagError, Result};
use crate::series::{Coordinate, Dimension, GriddedSeries};

/// Number of Fourier coefficients kept by default: the mean plus the first
/// two harmonics of the annual cycle.
pub const DEFAULT_HARMONICS: usize = 3;

// ── Climatology types ─────────────────────────────────────────────────────────

/// Climatology indexed by day of year (1..=365, or 1..=366 with leap days).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayOfYearClimatology {
    pub series: GriddedSeries,
    days: Vec<u16>,
}

impl DayOfYearClimatology {
    /// Wrap a series whose day-of-year axis holds whole day numbers.
    pub fn from_series(series: GriddedSeries) -> Result<Self> {
        let axis = series.require_axis(&Dimension::DayOfYear)?;
        let points = series.coords()[axis].as_numeric().ok_or_else(|| {
            DiagError::Dimension("day_of_year coordinate is not numeric".into())
        })?;
        let days = points
            .iter()
            .map(|&d| {
                if d >= 1.0 && d <= 366.0 && d.fract() == 0.0 {
                    Ok(d as u16)
                } else {
                    Err(DiagError::KeyMismatch(format!("invalid day_of_year {d}")))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { series, days })
    }

    pub fn axis(&self) -> usize {
        // Guaranteed by construction.
        self.series.axis_of(&Dimension::DayOfYear).unwrap_or(0)
    }

    pub fn days(&self) -> &[u16] {
        &self.days
    }

    /// day_of_year → position along the climatology axis.
    pub fn index(&self) -> HashMap<u16, usize> {
        self.days.iter().enumerate().map(|(i, &d)| (d, i)).collect()
    }
}

/// Climatology indexed by season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalClimatology {
    pub series: GriddedSeries,
    seasons: Vec<Season>,
}

impl SeasonalClimatology {
    pub fn axis(&self) -> usize {
        self.series.axis_of(&Dimension::Season).unwrap_or(0)
    }

    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    pub fn index(&self) -> HashMap<Season, usize> {
        self.seasons.iter().enumerate().map(|(i, &s)| (s, i)).collect()
    }

    /// The climatological value of `season` at every grid point.
    pub fn values_for(&self, season: Season) -> Result<Vec<f64>> {
        let pos = self
            .seasons
            .iter()
            .position(|&s| s == season)
            .ok_or_else(|| DiagError::KeyMismatch(format!("season `{season}` not in climatology")))?;
        let axis = self.axis();
        let (starts, stride) = self.series.lanes(axis);
        Ok(starts
            .iter()
            .map(|&s| self.series.values()[s + pos * stride])
            .collect())
    }
}

/// Smoothed day-of-year climatology plus its seasonal means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Climatology {
    pub day_of_year: DayOfYearClimatology,
    pub seasonal: SeasonalClimatology,
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimatologyBuilder {
    /// Fourier coefficients retained by [`ClimatologyBuilder::smooth`].
    pub n_harmonics: usize,
}

impl Default for ClimatologyBuilder {
    fn default() -> Self {
        Self { n_harmonics: DEFAULT_HARMONICS }
    }
}

impl ClimatologyBuilder {
    pub fn new(n_harmonics: usize) -> Result<Self> {
        if n_harmonics == 0 {
            return Err(DiagError::InvalidConfig("at least one harmonic must be retained".into()));
        }
        Ok(Self { n_harmonics })
    }

    /// Full chain: day-of-year mean, harmonic smoothing, seasonal mean.
    pub fn build(&self, series: &GriddedSeries) -> Result<Climatology> {
        let raw = self.day_of_year_climatology(series)?;
        let day_of_year = self.smooth(&raw)?;
        let seasonal = self.seasonal_climatology(&day_of_year)?;
        tracing::debug!(
            series = series.name(),
            days = day_of_year.days().len(),
            harmonics = self.n_harmonics,
            "climatology built"
        );
        Ok(Climatology { day_of_year, seasonal })
    }

    /// Mean of all samples sharing a day of year, per grid point.
    ///
    /// The output covers days 1..=365 (1..=366 if any sample falls on day
    /// 366). NaN samples are ignored in the mean, but a day with no finite
    /// sample at any grid point is an error.
    pub fn day_of_year_climatology(&self, series: &GriddedSeries) -> Result<DayOfYearClimatology> {
        let axis = series.require_axis(&Dimension::Time)?;
        let labels = CalendarLabels::from_times(series.time_points()?);

        let n_days = if labels.day_of_year.contains(&366) { 366 } else { 365 };
        let mut counts = vec![0usize; n_days];
        for &d in &labels.day_of_year {
            counts[usize::from(d) - 1] += 1;
        }
        let missing: Vec<usize> = counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == 0)
            .map(|(i, _)| i + 1)
            .collect();
        if !missing.is_empty() {
            return Err(DiagError::InsufficientData(format!(
                "series `{}`: {} day-of-year buckets have no samples (first: {})",
                series.name(),
                missing.len(),
                missing[0]
            )));
        }

        let values = series.map_lanes(axis, n_days, |lane| {
            let mut sums = vec![0.0; n_days];
            let mut finite = vec![0usize; n_days];
            for (&v, &d) in lane.iter().zip(&labels.day_of_year) {
                if v.is_finite() {
                    let b = usize::from(d) - 1;
                    sums[b] += v;
                    finite[b] += 1;
                }
            }
            if let Some(b) = finite.iter().position(|&n| n == 0) {
                return Err(DiagError::InsufficientData(format!(
                    "series `{}`: day_of_year {} has no finite samples at some grid point",
                    series.name(),
                    b + 1
                )));
            }
            Ok(sums.iter().zip(&finite).map(|(&s, &n)| s / n as f64).collect())
        })?;

        let days: Vec<f64> = (1..=n_days).map(|d| d as f64).collect();
        let clim = series.replace_axis(axis, Dimension::DayOfYear, Coordinate::Numeric(days), values)?;
        DayOfYearClimatology::from_series(clim)
    }

    /// Low-pass the climatology by keeping the first `n_harmonics` Fourier
    /// coefficients along the day-of-year axis. Length is preserved.
    pub fn smooth(&self, clim: &DayOfYearClimatology) -> Result<DayOfYearClimatology> {
        let axis = clim.axis();
        let n = clim.days().len();
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);
        let keep = self.n_harmonics;

        let values = clim.series.map_lanes(axis, n, |lane| {
            let mut buf: Vec<Complex<f64>> = lane.iter().map(|&v| Complex::new(v, 0.0)).collect();
            forward.process(&mut buf);
            for (k, c) in buf.iter_mut().enumerate() {
                // Frequency index of bin k, folding the negative half.
                if k.min(n - k) >= keep {
                    *c = Complex::new(0.0, 0.0);
                }
            }
            inverse.process(&mut buf);
            Ok(buf.iter().map(|c| c.re / n as f64).collect())
        })?;

        Ok(DayOfYearClimatology {
            series: clim.series.with_values(values)?,
            days: clim.days.clone(),
        })
    }

    /// Average the day-of-year climatology within each season.
    pub fn seasonal_climatology(&self, clim: &DayOfYearClimatology) -> Result<SeasonalClimatology> {
        let axis = clim.axis();
        let day_seasons: Vec<Season> = clim.days().iter().map(|&d| Season::from_day_of_year(d)).collect();
        let seasons: Vec<Season> = Season::ALL
            .into_iter()
            .filter(|s| day_seasons.contains(s))
            .collect();
        if seasons.is_empty() {
            return Err(DiagError::InsufficientData("day-of-year climatology is empty".into()));
        }

        let values = clim.series.map_lanes(axis, seasons.len(), |lane| {
            Ok(seasons
                .iter()
                .map(|season| {
                    let (sum, n) = lane
                        .iter()
                        .zip(&day_seasons)
                        .filter(|(v, s)| *s == season && v.is_finite())
                        .fold((0.0, 0usize), |(sum, n), (v, _)| (sum + v, n + 1));
                    if n > 0 { sum / n as f64 } else { f64::NAN }
                })
                .collect())
        })?;

        let labels = seasons.iter().map(|s| s.label().to_string()).collect();
        let series = clim
            .series
            .replace_axis(axis, Dimension::Season, Coordinate::Categorical(labels), values)?;
        Ok(SeasonalClimatology { series, seasons })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::daily_axis;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn daily(start: (i32, u32, u32), values: Vec<f64>) -> GriddedSeries {
        let start = NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap();
        let times = daily_axis(start, values.len());
        GriddedSeries::new("x", "1", vec![(Dimension::Time, Coordinate::Time(times))], values).unwrap()
    }

    #[test]
    fn groups_samples_from_several_years() {
        // Two non-leap years; second year offset by +2 everywhere.
        let mut values: Vec<f64> = (0..365).map(|d| d as f64).collect();
        values.extend((0..365).map(|d| d as f64 + 2.0));
        let s = daily((2001, 1, 1), values);
        let clim = ClimatologyBuilder::default().day_of_year_climatology(&s).unwrap();
        assert_eq!(clim.days().len(), 365);
        assert_eq!(clim.series.values()[0], 1.0);
        assert_eq!(clim.series.values()[364], 365.0);
        assert_eq!(clim.series.dims(), &[Dimension::DayOfYear]);
    }

    #[test]
    fn leap_day_adds_bucket_366() {
        let s = daily((2000, 1, 1), vec![1.0; 366]);
        let clim = ClimatologyBuilder::default().day_of_year_climatology(&s).unwrap();
        assert_eq!(clim.days().len(), 366);
        assert_eq!(*clim.days().last().unwrap(), 366);
    }

    #[test]
    fn missing_days_are_insufficient_data() {
        let s = daily((2001, 1, 1), vec![1.0; 200]);
        let err = ClimatologyBuilder::default().day_of_year_climatology(&s).unwrap_err();
        assert!(matches!(err, DiagError::InsufficientData(_)));
    }

    #[test]
    fn all_nan_day_is_insufficient_data() {
        let mut values = vec![1.0; 2 * 365];
        values[99] = f64::NAN;
        values[365 + 99] = f64::NAN;
        let s = daily((2001, 1, 1), values);
        let err = ClimatologyBuilder::default().build(&s).unwrap_err();
        match err {
            DiagError::InsufficientData(msg) => assert!(msg.contains("day_of_year 100"), "{msg}"),
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn partial_nan_day_uses_finite_samples() {
        let mut values = vec![1.0; 2 * 365];
        values[99] = f64::NAN;
        values[365 + 99] = 3.0;
        let s = daily((2001, 1, 1), values);
        let clim = ClimatologyBuilder::default().day_of_year_climatology(&s).unwrap();
        assert_eq!(clim.series.values()[99], 3.0);
    }

    #[test]
    fn smoothing_keeps_a_constant() {
        let s = daily((2001, 1, 1), vec![7.5; 365]);
        let b = ClimatologyBuilder::default();
        let smooth = b.smooth(&b.day_of_year_climatology(&s).unwrap()).unwrap();
        assert_eq!(smooth.days().len(), 365);
        for &v in smooth.series.values() {
            assert_abs_diff_eq!(v, 7.5, epsilon = 1e-10);
        }
    }

    #[test]
    fn smoothing_removes_high_harmonics_only() {
        let n = 365;
        let tau = 2.0 * std::f64::consts::PI;
        let annual: Vec<f64> = (0..n)
            .map(|d| 10.0 + 3.0 * (tau * d as f64 / n as f64).cos() + (tau * 2.0 * d as f64 / n as f64).sin())
            .collect();
        let noisy: Vec<f64> = annual
            .iter()
            .enumerate()
            .map(|(d, v)| v + 0.5 * (tau * 20.0 * d as f64 / n as f64).cos())
            .collect();
        let b = ClimatologyBuilder::default();
        let smooth = b.smooth(&b.day_of_year_climatology(&daily((2001, 1, 1), noisy)).unwrap()).unwrap();
        for (got, want) in smooth.series.values().iter().zip(&annual) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn seasonal_means_follow_day_seasons() {
        // Value = season index, so each seasonal mean is exact.
        let values: Vec<f64> = (1..=365u16)
            .map(|d| Season::ALL.iter().position(|&s| s == Season::from_day_of_year(d)).unwrap() as f64)
            .collect();
        let b = ClimatologyBuilder::default();
        let clim = b.day_of_year_climatology(&daily((2001, 1, 1), values)).unwrap();
        let seasonal = b.seasonal_climatology(&clim).unwrap();
        assert_eq!(seasonal.seasons(), &Season::ALL);
        assert_eq!(seasonal.series.values(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(seasonal.values_for(Season::Jja).unwrap(), vec![2.0]);
    }

    #[test]
    fn zero_harmonics_rejected() {
        assert!(matches!(ClimatologyBuilder::new(0), Err(DiagError::InvalidConfig(_))));
    }
}
