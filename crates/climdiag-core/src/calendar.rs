//! Calendar labels derived from a time coordinate.
//!
//! `day_of_year` is the chrono ordinal (1..=366), seasons are the four
//! contiguous meteorological 3-month groups with December in DJF.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};

/// Meteorological season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Djf,
    Mam,
    Jja,
    Son,
}

impl Season {
    /// Canonical order used for seasonal climatologies.
    pub const ALL: [Season; 4] = [Season::Djf, Season::Mam, Season::Jja, Season::Son];

    pub fn from_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Djf,
            3..=5 => Season::Mam,
            6..=8 => Season::Jja,
            _ => Season::Son,
        }
    }

    /// Season of a day-of-year bucket, read on a non-leap calendar.
    /// Day 366 only exists in leap years and is 31 December.
    pub fn from_day_of_year(doy: u16) -> Season {
        match NaiveDate::from_yo_opt(2001, u32::from(doy)) {
            Some(date) => Season::from_month(date.month()),
            None => Season::Djf,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Djf => "djf",
            Season::Mam => "mam",
            Season::Jja => "jja",
            Season::Son => "son",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Season {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "djf" => Ok(Season::Djf),
            "mam" => Ok(Season::Mam),
            "jja" => Ok(Season::Jja),
            "son" => Ok(Season::Son),
            other => Err(DiagError::KeyMismatch(format!("unknown season label `{other}`"))),
        }
    }
}

/// Per-sample categorical labels for one time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarLabels {
    pub day_of_year: Vec<u16>,
    pub month_number: Vec<u8>,
    pub year: Vec<i32>,
    pub season: Vec<Season>,
}

impl CalendarLabels {
    pub fn from_times(times: &[NaiveDateTime]) -> Self {
        let mut labels = Self {
            day_of_year: Vec::with_capacity(times.len()),
            month_number: Vec::with_capacity(times.len()),
            year: Vec::with_capacity(times.len()),
            season: Vec::with_capacity(times.len()),
        };
        for t in times {
            labels.day_of_year.push(t.ordinal() as u16);
            labels.month_number.push(t.month() as u8);
            labels.year.push(t.year());
            labels.season.push(Season::from_month(t.month()));
        }
        labels
    }

    pub fn len(&self) -> usize {
        self.day_of_year.len()
    }

    pub fn is_empty(&self) -> bool {
        self.day_of_year.is_empty()
    }
}

// ── CF time decoding ──────────────────────────────────────────────────────────

/// Decode CF-style numeric times (`"days since 1979-01-01"`) on the standard
/// proleptic Gregorian calendar.
pub fn decode_cf_time(values: &[f64], units: &str) -> Result<Vec<NaiveDateTime>> {
    let (step, reference) = units
        .split_once(" since ")
        .ok_or_else(|| DiagError::Calendar(format!("time units `{units}` lack `since`")))?;

    let millis_per_unit = match step.trim().to_ascii_lowercase().as_str() {
        "days" | "day" | "d" => 86_400_000.0,
        "hours" | "hour" | "h" => 3_600_000.0,
        "minutes" | "minute" | "min" => 60_000.0,
        "seconds" | "second" | "s" => 1_000.0,
        other => return Err(DiagError::Calendar(format!("unsupported time step `{other}`"))),
    };

    let origin = parse_reference(reference.trim())?;

    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return Err(DiagError::Calendar(format!("non-finite time value {v}")));
            }
            let offset = Duration::milliseconds((v * millis_per_unit).round() as i64);
            origin
                .checked_add_signed(offset)
                .ok_or_else(|| DiagError::Calendar(format!("time value {v} {units} overflows")))
        })
        .collect()
}

fn parse_reference(s: &str) -> Result<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(t);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| DiagError::Calendar(format!("unparseable reference date `{s}`")))
}

/// Daily time axis starting at `start` (midnight), `n` steps.
pub fn daily_axis(start: NaiveDate, n: usize) -> Vec<NaiveDateTime> {
    (0..n)
        .filter_map(|i| {
            start
                .checked_add_signed(Duration::days(i as i64))
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .collect()
}
