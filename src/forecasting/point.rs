//! Uniform forecast output records
//!
//! Every model kind, whatever its internal shape, emits the same
//! `ForecastPoint` record so that the ensemble, cost projector and
//! presentation layers never have to branch on model kind.

use serde::{Deserialize, Serialize};

/// One forecast period with a point estimate and interval bounds
///
/// Invariant: `lower_bound <= point_estimate <= upper_bound`, maintained by
/// [`ForecastPoint::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// 1-based period index following the last observed timestamp
    pub period: u32,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    /// Create a point, reordering bounds around the estimate if needed
    pub fn new(period: u32, point_estimate: f64, lower_bound: f64, upper_bound: f64) -> Self {
        let lower = lower_bound.min(point_estimate);
        let upper = upper_bound.max(point_estimate);
        Self {
            period,
            point_estimate,
            lower_bound: lower,
            upper_bound: upper,
        }
    }

    /// Create a point with symmetric bounds of `half_width` around the estimate
    pub fn symmetric(period: u32, point_estimate: f64, half_width: f64) -> Self {
        let half_width = half_width.abs();
        Self {
            period,
            point_estimate,
            lower_bound: point_estimate - half_width,
            upper_bound: point_estimate + half_width,
        }
    }
}

/// Holdout validation metrics recorded on gradient-boosted model handles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub mae: f64,
    pub mse: f64,
    pub r_squared: f64,
}
