//! Jet extraction: collapse the latitude dimension of a zonal-wind field into
//! the peak wind speed and the latitude at which it occurs.

use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};
use crate::series::{Dimension, GriddedSeries};

/// The two series produced by [`extract_jet`]. Neither has a latitude dim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JetSeries {
    /// Maximum wind over latitude.
    pub wind: GriddedSeries,
    /// Latitude coordinate value (degrees north) of that maximum.
    pub latitude: GriddedSeries,
}

/// Reduce `ua` over latitude.
///
/// Ties resolve to the lowest latitude index. NaN values never win; a lane
/// with no finite value yields NaN in both outputs.
pub fn extract_jet(ua: &GriddedSeries) -> Result<JetSeries> {
    let axis = ua.require_axis(&Dimension::Latitude)?;
    let lats = ua.coords()[axis].as_numeric().ok_or_else(|| {
        DiagError::Dimension(format!("series `{}`: latitude coordinate is not numeric", ua.name()))
    })?;

    let (starts, stride) = ua.lanes(axis);
    let mut wind = Vec::with_capacity(starts.len());
    let mut latitude = Vec::with_capacity(starts.len());
    let mut empty_lanes = 0usize;

    for &start in &starts {
        match argmax(&ua.lane(axis, start, stride)) {
            Some((idx, peak)) => {
                wind.push(peak);
                latitude.push(lats[idx]);
            }
            None => {
                wind.push(f64::NAN);
                latitude.push(f64::NAN);
                empty_lanes += 1;
            }
        }
    }

    if empty_lanes > 0 {
        tracing::warn!(series = ua.name(), empty_lanes, "lanes without finite wind values");
    }

    let wind = ua.remove_axis(axis, wind)?.renamed("ua_max", ua.units().to_string());
    let latitude = ua.remove_axis(axis, latitude)?.renamed("jet_lat", "degrees_north");

    tracing::debug!(wind = %wind.summary(), latitude = %latitude.summary(), "jet extracted");

    Ok(JetSeries { wind, latitude })
}

/// First index of the largest finite value.
fn argmax(lane: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in lane.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::daily_axis;
    use crate::series::Coordinate;
    use chrono::NaiveDate;

    const LATS: [f64; 5] = [20.0, 30.0, 40.0, 50.0, 60.0];

    /// time × latitude × longitude with a single peak at `LATS[peak]`.
    fn field(n_time: usize, peak: usize) -> GriddedSeries {
        let n_lon = 3;
        let mut values = Vec::new();
        for t in 0..n_time {
            for (j, _) in LATS.iter().enumerate() {
                for k in 0..n_lon {
                    let base = if j == peak { 30.0 } else { 10.0 };
                    values.push(base + (t + k) as f64 * 0.1);
                }
            }
        }
        GriddedSeries::new(
            "ua",
            "m s-1",
            vec![
                (
                    Dimension::Time,
                    Coordinate::Time(daily_axis(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(), n_time)),
                ),
                (Dimension::Latitude, Coordinate::Numeric(LATS.to_vec())),
                (Dimension::Longitude, Coordinate::Numeric(vec![0.0, 120.0, 240.0])),
            ],
            values,
        )
        .unwrap()
    }

    #[test]
    fn single_peak_reports_its_latitude_everywhere() {
        let jet = extract_jet(&field(6, 3)).unwrap();
        assert_eq!(jet.latitude.dims(), &[Dimension::Time, Dimension::Longitude]);
        assert!(jet.latitude.values().iter().all(|&l| l == 50.0));
        assert_eq!(jet.wind.values()[0], 30.0);
        assert_eq!(jet.latitude.units(), "degrees_north");
    }

    #[test]
    fn ties_pick_the_first_latitude() {
        assert_eq!(argmax(&[1.0, 5.0, 5.0, 2.0]), Some((1, 5.0)));
    }

    #[test]
    fn nan_is_skipped_and_all_nan_lane_is_nan() {
        assert_eq!(argmax(&[f64::NAN, 2.0, 1.0]), Some((1, 2.0)));
        assert_eq!(argmax(&[f64::NAN, f64::NAN]), None);

        let s = GriddedSeries::new(
            "ua",
            "m s-1",
            vec![(Dimension::Latitude, Coordinate::Numeric(vec![10.0, 20.0]))],
            vec![f64::NAN, f64::NAN],
        )
        .unwrap();
        let jet = extract_jet(&s).unwrap();
        assert!(jet.wind.values()[0].is_nan());
        assert!(jet.latitude.values()[0].is_nan());
    }

    #[test]
    fn missing_latitude_fails() {
        let s = GriddedSeries::new(
            "ua",
            "m s-1",
            vec![(Dimension::Longitude, Coordinate::Numeric(vec![0.0]))],
            vec![1.0],
        )
        .unwrap();
        assert!(matches!(extract_jet(&s), Err(DiagError::Dimension(_))));
    }
}
