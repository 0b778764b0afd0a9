//! Anomalies against day-of-year and seasonal climatologies.
//!
//! Both joins are keyed on the calendar label of each time sample (looked up
//! in an explicit map), never on position: several years of samples land on
//! the same climatology entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarLabels, Season};
use crate::climatology::{DayOfYearClimatology, SeasonalClimatology};
use crate::error::{DiagError, Result};
use crate::series::{Coordinate, Dimension, GriddedSeries};

/// Subtract the day-of-year climatology from every sample of `series`.
pub fn day_of_year_anomaly(series: &GriddedSeries, clim: &DayOfYearClimatology) -> Result<GriddedSeries> {
    combine_day_of_year(series, clim, -1.0)
}

/// Add the day-of-year climatology back onto an anomaly series.
pub fn restore_day_of_year(anomaly: &GriddedSeries, clim: &DayOfYearClimatology) -> Result<GriddedSeries> {
    combine_day_of_year(anomaly, clim, 1.0)
}

fn combine_day_of_year(series: &GriddedSeries, clim: &DayOfYearClimatology, sign: f64) -> Result<GriddedSeries> {
    let axis = series.require_axis(&Dimension::Time)?;
    let clim_axis = clim.axis();
    check_same_grid(series, axis, &clim.series, clim_axis)?;

    let labels = CalendarLabels::from_times(series.time_points()?);
    let index = clim.index();
    let positions = labels
        .day_of_year
        .iter()
        .map(|d| {
            index.get(d).copied().ok_or_else(|| {
                DiagError::KeyMismatch(format!(
                    "day_of_year {d} of `{}` has no climatology entry",
                    series.name()
                ))
            })
        })
        .collect::<Result<Vec<usize>>>()?;

    let (starts, stride) = series.lanes(axis);
    let (clim_starts, clim_stride) = clim.series.lanes(clim_axis);
    let src = series.values();
    let base = clim.series.values();
    let mut out = src.to_vec();

    for (&s, &c) in starts.iter().zip(&clim_starts) {
        for (t, &p) in positions.iter().enumerate() {
            let i = s + t * stride;
            out[i] = src[i] + sign * base[c + p * clim_stride];
        }
    }

    series.with_values(out)
}

/// Every dim other than the joined axis must match in name, position and
/// coordinate points.
fn check_same_grid(series: &GriddedSeries, axis: usize, clim: &GriddedSeries, clim_axis: usize) -> Result<()> {
    let strip = |s: &GriddedSeries, a: usize| -> Vec<(Dimension, Coordinate)> {
        s.dims()
            .iter()
            .cloned()
            .zip(s.coords().iter().cloned())
            .enumerate()
            .filter(|(i, _)| *i != a)
            .map(|(_, p)| p)
            .collect()
    };
    if axis != clim_axis || strip(series, axis) != strip(clim, clim_axis) {
        return Err(DiagError::ShapeMismatch(format!(
            "series `{}` {:?} and climatology {:?} disagree on the grid",
            series.name(),
            series.shape(),
            clim.shape()
        )));
    }
    Ok(())
}

// ── Seasonal residuals ────────────────────────────────────────────────────────

/// Samples of one season, pooled over time and grid points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonSamples {
    /// Sample minus the seasonal climatology at its grid point.
    pub residual: Vec<f64>,
    /// The sample itself.
    pub absolute: Vec<f64>,
}

/// Per-season residual samples feeding the density estimates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonalResiduals {
    pub seasons: BTreeMap<Season, SeasonSamples>,
}

/// Bin every sample of `series` by the season of its time stamp and subtract
/// that season's climatology at the same grid point.
pub fn seasonal_residuals(series: &GriddedSeries, clim: &SeasonalClimatology) -> Result<SeasonalResiduals> {
    let axis = series.require_axis(&Dimension::Time)?;
    let clim_axis = clim.axis();
    check_same_grid(series, axis, &clim.series, clim_axis)?;

    let labels = CalendarLabels::from_times(series.time_points()?);
    let index = clim.index();
    let positions = labels
        .season
        .iter()
        .map(|s| {
            index.get(s).copied().ok_or_else(|| {
                DiagError::KeyMismatch(format!("season `{s}` of `{}` has no climatology entry", series.name()))
            })
        })
        .collect::<Result<Vec<usize>>>()?;

    let (starts, stride) = series.lanes(axis);
    let (clim_starts, clim_stride) = clim.series.lanes(clim_axis);
    let src = series.values();
    let base = clim.series.values();

    let mut out = SeasonalResiduals::default();
    for (t, (&season, &p)) in labels.season.iter().zip(&positions).enumerate() {
        let bucket = out.seasons.entry(season).or_default();
        for (&s, &c) in starts.iter().zip(&clim_starts) {
            let v = src[s + t * stride];
            bucket.absolute.push(v);
            bucket.residual.push(v - base[c + p * clim_stride]);
        }
    }

    Ok(out)
}
