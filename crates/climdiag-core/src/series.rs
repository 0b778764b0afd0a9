//! Named-dimension gridded series: the data model shared by every stage.
//!
//! Values are stored row-major over `dims` (last dimension varies fastest).
//! Each dimension carries one coordinate vector of matching length. Transforms
//! never mutate a series; they build a new one that keeps the untouched
//! dimensions and replaces only the affected ones.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};

// ── Dimensions and coordinates ────────────────────────────────────────────────

/// A named dimension of a [`GriddedSeries`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Time,
    Latitude,
    Longitude,
    Season,
    DayOfYear,
    /// Any other axis (pressure level, ensemble member, ...).
    Other(String),
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Time => f.write_str("time"),
            Dimension::Latitude => f.write_str("latitude"),
            Dimension::Longitude => f.write_str("longitude"),
            Dimension::Season => f.write_str("season"),
            Dimension::DayOfYear => f.write_str("day_of_year"),
            Dimension::Other(name) => f.write_str(name),
        }
    }
}

/// Coordinate points attached to one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum Coordinate {
    Numeric(Vec<f64>),
    Time(Vec<NaiveDateTime>),
    Categorical(Vec<String>),
}

impl Coordinate {
    pub fn len(&self) -> usize {
        match self {
            Coordinate::Numeric(v) => v.len(),
            Coordinate::Time(v) => v.len(),
            Coordinate::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Coordinate::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&[NaiveDateTime]> {
        match self {
            Coordinate::Time(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&[String]> {
        match self {
            Coordinate::Categorical(v) => Some(v),
            _ => None,
        }
    }
}

// ── Series ────────────────────────────────────────────────────────────────────

/// An N-dimensional array of values with named, ordered dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct GriddedSeries {
    /// Variable name (e.g. `ua`, `jet_lat`).
    name: String,
    units: String,
    dims: Vec<Dimension>,
    /// One coordinate per entry of `dims`, same order.
    coords: Vec<Coordinate>,
    values: Vec<f64>,
}

/// Unvalidated wire form; every deserialised series goes through
/// [`GriddedSeries::new`].
#[derive(Deserialize)]
struct RawSeries {
    name: String,
    #[serde(default)]
    units: String,
    dims: Vec<Dimension>,
    coords: Vec<Coordinate>,
    #[serde(deserialize_with = "null_as_nan_vec")]
    values: Vec<f64>,
}

/// serde_json writes non-finite floats as `null`; read them back as NaN.
fn null_as_nan_vec<'de, D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Vec<f64>, D::Error> {
    let v: Vec<Option<f64>> = Vec::deserialize(d)?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
}

impl TryFrom<RawSeries> for GriddedSeries {
    type Error = DiagError;

    fn try_from(raw: RawSeries) -> Result<Self> {
        if raw.dims.len() != raw.coords.len() {
            return Err(DiagError::ShapeMismatch(format!(
                "{} dims but {} coordinates",
                raw.dims.len(),
                raw.coords.len()
            )));
        }
        let axes = raw.dims.into_iter().zip(raw.coords).collect();
        GriddedSeries::new(raw.name, raw.units, axes, raw.values)
    }
}

impl GriddedSeries {
    /// Build a series, checking that dimension names are unique and that the
    /// coordinate extents multiply out to `values.len()`.
    pub fn new(
        name: impl Into<String>,
        units: impl Into<String>,
        axes: Vec<(Dimension, Coordinate)>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let (dims, coords): (Vec<Dimension>, Vec<Coordinate>) = axes.into_iter().unzip();

        for (i, d) in dims.iter().enumerate() {
            if dims[..i].contains(d) {
                return Err(DiagError::Dimension(format!("duplicate dimension `{d}`")));
            }
        }

        let expected: usize = coords.iter().map(Coordinate::len).product();
        if expected != values.len() {
            return Err(DiagError::ShapeMismatch(format!(
                "coordinate extents {:?} imply {expected} values, got {}",
                coords.iter().map(Coordinate::len).collect::<Vec<_>>(),
                values.len()
            )));
        }

        Ok(Self {
            name: name.into(),
            units: units.into(),
            dims,
            coords,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn coords(&self) -> &[Coordinate] {
        &self.coords
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn shape(&self) -> Vec<usize> {
        self.coords.iter().map(Coordinate::len).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn axis_of(&self, dim: &Dimension) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Position of `dim`, or `DimensionError` naming the series.
    pub fn require_axis(&self, dim: &Dimension) -> Result<usize> {
        self.axis_of(dim).ok_or_else(|| {
            DiagError::Dimension(format!("series `{}` has no `{dim}` dimension", self.name))
        })
    }

    pub fn coord(&self, dim: &Dimension) -> Option<&Coordinate> {
        self.axis_of(dim).map(|a| &self.coords[a])
    }

    /// The time coordinate points; `DimensionError` if absent or not a time axis.
    pub fn time_points(&self) -> Result<&[NaiveDateTime]> {
        let axis = self.require_axis(&Dimension::Time)?;
        self.coords[axis].as_time().ok_or_else(|| {
            DiagError::Dimension(format!("series `{}`: time coordinate is not datetime", self.name))
        })
    }

    /// Rename the variable, keeping data and coordinates.
    pub fn renamed(mut self, name: impl Into<String>, units: impl Into<String>) -> Self {
        self.name = name.into();
        self.units = units.into();
        self
    }

    /// Same dims and coordinates, new values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.values.len() {
            return Err(DiagError::ShapeMismatch(format!(
                "series `{}` holds {} values, replacement has {}",
                self.name,
                self.values.len(),
                values.len()
            )));
        }
        Ok(Self {
            values,
            ..self.clone()
        })
    }

    /// Lane geometry along `axis`: the flat offset of every lane's first
    /// element, in row-major order of the remaining dims, and the stride
    /// between consecutive elements of a lane.
    pub fn lanes(&self, axis: usize) -> (Vec<usize>, usize) {
        let shape = self.shape();
        let extent = shape[axis];
        let stride: usize = shape[axis + 1..].iter().product();
        let outer: usize = shape[..axis].iter().product();
        let mut starts = Vec::with_capacity(outer * stride);
        for o in 0..outer {
            for i in 0..stride {
                starts.push(o * extent * stride + i);
            }
        }
        (starts, stride)
    }

    /// Copy out the lane starting at `start` along `axis`.
    pub fn lane(&self, axis: usize, start: usize, stride: usize) -> Vec<f64> {
        (0..self.coords[axis].len())
            .map(|k| self.values[start + k * stride])
            .collect()
    }

    /// Apply `f` to every 1-D lane along `axis`; each call must return a lane
    /// of `new_len` values. The returned buffer is laid out with `axis`
    /// resized to `new_len`.
    pub fn map_lanes<F>(&self, axis: usize, new_len: usize, mut f: F) -> Result<Vec<f64>>
    where
        F: FnMut(&[f64]) -> Result<Vec<f64>>,
    {
        let (starts, stride) = self.lanes(axis);
        let mut out = vec![0.0; starts.len() * new_len];
        for (li, &start) in starts.iter().enumerate() {
            let lane = self.lane(axis, start, stride);
            let mapped = f(&lane)?;
            if mapped.len() != new_len {
                return Err(DiagError::ShapeMismatch(format!(
                    "lane transform returned {} values, expected {new_len}",
                    mapped.len()
                )));
            }
            // Rebase the lane start from the old extent to the new one.
            let o = li / stride;
            let i = li % stride;
            let base = o * new_len * stride + i;
            for (k, v) in mapped.into_iter().enumerate() {
                out[base + k * stride] = v;
            }
        }
        Ok(out)
    }

    /// Collapse `axis` by reducing each lane to one value.
    pub fn reduce_axis<F>(&self, axis: usize, mut f: F) -> Vec<f64>
    where
        F: FnMut(&[f64]) -> f64,
    {
        let (starts, stride) = self.lanes(axis);
        starts
            .iter()
            .map(|&s| f(&self.lane(axis, s, stride)))
            .collect()
    }

    /// New series with `axis` removed; `values` are laid out over the
    /// remaining dims.
    pub fn remove_axis(&self, axis: usize, values: Vec<f64>) -> Result<Self> {
        let axes = self
            .dims
            .iter()
            .cloned()
            .zip(self.coords.iter().cloned())
            .enumerate()
            .filter(|(a, _)| *a != axis)
            .map(|(_, pair)| pair)
            .collect();
        Self::new(self.name.clone(), self.units.clone(), axes, values)
    }

    /// New series with `axis` replaced by a different dimension.
    pub fn replace_axis(
        &self,
        axis: usize,
        dim: Dimension,
        coord: Coordinate,
        values: Vec<f64>,
    ) -> Result<Self> {
        let mut axes: Vec<(Dimension, Coordinate)> = self
            .dims
            .iter()
            .cloned()
            .zip(self.coords.iter().cloned())
            .collect();
        axes[axis] = (dim, coord);
        Self::new(self.name.clone(), self.units.clone(), axes, values)
    }

    /// Min / max / mean over the finite values.
    pub fn summary(&self) -> SeriesSummary {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut n = 0usize;
        for &v in self.values.iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            n += 1;
        }
        SeriesSummary {
            min,
            max,
            mean: if n > 0 { sum / n as f64 } else { f64::NAN },
            non_finite: self.values.len() - n,
        }
    }
}

/// Quick statistics for logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub non_finite: usize,
}

impl fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min={:.3} max={:.3} mean={:.3} non_finite={}",
            self.min, self.max, self.mean, self.non_finite
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_3x2() -> GriddedSeries {
        GriddedSeries::new(
            "t",
            "1",
            vec![
                (Dimension::Latitude, Coordinate::Numeric(vec![10.0, 20.0, 30.0])),
                (Dimension::Longitude, Coordinate::Numeric(vec![0.0, 90.0])),
            ],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap()
    }

    #[test]
    fn rejects_wrong_value_count() {
        let err = GriddedSeries::new(
            "t",
            "1",
            vec![(Dimension::Latitude, Coordinate::Numeric(vec![1.0, 2.0]))],
            vec![1.0],
        )
        .unwrap_err();
        assert!(matches!(err, DiagError::ShapeMismatch(_)));
    }

    #[test]
    fn rejects_duplicate_dimension() {
        let err = GriddedSeries::new(
            "t",
            "1",
            vec![
                (Dimension::Latitude, Coordinate::Numeric(vec![1.0])),
                (Dimension::Latitude, Coordinate::Numeric(vec![2.0])),
            ],
            vec![1.0],
        )
        .unwrap_err();
        assert!(matches!(err, DiagError::Dimension(_)));
    }

    #[test]
    fn lanes_walk_the_requested_axis() {
        let s = grid_3x2();
        let (starts, stride) = s.lanes(0);
        assert_eq!(starts, vec![0, 1]);
        assert_eq!(stride, 2);
        assert_eq!(s.lane(0, 1, stride), vec![2.0, 4.0, 6.0]);

        let (starts, stride) = s.lanes(1);
        assert_eq!(starts, vec![0, 2, 4]);
        assert_eq!(stride, 1);
    }

    #[test]
    fn reduce_axis_drops_the_dimension() {
        let s = grid_3x2();
        let sums = s.reduce_axis(0, |lane| lane.iter().sum());
        let reduced = s.remove_axis(0, sums).unwrap();
        assert_eq!(reduced.dims(), &[Dimension::Longitude]);
        assert_eq!(reduced.values(), &[9.0, 12.0]);
    }

    #[test]
    fn map_lanes_can_resize_the_axis() {
        let s = grid_3x2();
        let out = s.map_lanes(0, 2, |lane| Ok(vec![lane[0], lane[2]])).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 5.0, 6.0]);
    }

    #[test]
    fn json_round_trip_validates() {
        let s = grid_3x2();
        let json = serde_json::to_string(&s).unwrap();
        let back: GriddedSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);

        let with_gap = s.with_values(vec![1.0, f64::NAN, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let back: GriddedSeries = serde_json::from_str(&serde_json::to_string(&with_gap).unwrap()).unwrap();
        assert!(back.values()[1].is_nan());

        let broken = json.replace("[1.0,2.0,3.0,4.0,5.0,6.0]", "[1.0]");
        assert!(serde_json::from_str::<GriddedSeries>(&broken).is_err());
    }
}
