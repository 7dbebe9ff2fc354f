//! Ordered time series input type and CSV loader
//!
//! A `Series` is the single input shape every forecasting model accepts:
//! an ordered sequence of (date, value) pairs with strictly increasing
//! dates. Validation happens at construction so downstream code never has
//! to re-check ordering.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::path::Path;

use crate::error::{EngineError, Result};

/// A single observation in a time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Ordered univariate time series
///
/// Invariant: dates are strictly increasing (no duplicates) and every value
/// is finite. Enforced by [`Series::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    points: Vec<SeriesPoint>,
}

impl Series {
    /// Build a validated series from observations
    pub fn new(points: Vec<SeriesPoint>) -> Result<Self> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(EngineError::Validation(format!(
                    "series dates must be strictly increasing: {} followed by {}",
                    pair[0].date, pair[1].date
                )));
            }
        }
        if let Some(p) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(EngineError::Validation(format!(
                "series contains a non-finite value at {}",
                p.date
            )));
        }
        Ok(Self { points })
    }

    /// Build a series from parallel date/value slices
    pub fn from_pairs(pairs: &[(NaiveDate, f64)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(date, value)| SeriesPoint { date, value })
                .collect(),
        )
    }

    /// Observations in date order
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Values in date order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Date of the last observation, if any
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// First observation whose calendar year matches `year`
    pub fn first_in_year(&self, year: i32) -> Option<&SeriesPoint> {
        use chrono::Datelike;
        self.points.iter().find(|p| p.date.year() == year)
    }
}

/// Load a series from a CSV file with a `date,value` header
///
/// Dates are parsed as `YYYY-MM-DD`. Rows are validated as a whole after
/// loading, so an out-of-order file is rejected rather than reordered.
pub fn load_series_csv(path: &Path) -> std::result::Result<Series, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut points = Vec::new();
    for result in reader.records() {
        let record = result?;
        let date: NaiveDate = record[0].parse()?;
        let value: f64 = record[1].parse()?;
        points.push(SeriesPoint { date, value });
    }

    Ok(Series::new(points)?)
}
