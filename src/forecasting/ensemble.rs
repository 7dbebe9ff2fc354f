//! Weighted ensemble blending of per-model forecasts
//!
//! Combines the forecasts of independently trained models into a single
//! sequence with the same linear weights applied to point estimates and to
//! both interval bounds. Blending the bounds this way is an approximation
//! carried over from the source system, not a statistically combined
//! interval; it is preserved deliberately.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, Result};
use crate::forecasting::point::ForecastPoint;

/// Tolerance for the weight-sum check
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Blends multiple models' forecasts into one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleCombiner {
    tolerance: f64,
}

impl Default for EnsembleCombiner {
    fn default() -> Self {
        Self { tolerance: WEIGHT_SUM_TOLERANCE }
    }
}

impl EnsembleCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default weighting carried over from the source system
    pub fn default_weights() -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("trend_seasonal".to_string(), 0.6),
            ("autoregressive".to_string(), 0.4),
        ])
    }

    /// Blend forecasts with the given per-model weights
    ///
    /// Weights must be non-negative and sum to 1 within tolerance. A model
    /// named in the weights whose forecast is missing or empty is excluded
    /// and the remaining weights renormalized; if every model is missing
    /// the call fails with `EnsembleFailure`. Output length is the minimum
    /// length across the included forecasts.
    pub fn combine(
        &self,
        forecasts_by_model: &BTreeMap<String, Vec<ForecastPoint>>,
        weights: &BTreeMap<String, f64>,
    ) -> Result<Vec<ForecastPoint>> {
        if weights.is_empty() {
            return Err(EngineError::Configuration(
                "ensemble weights must name at least one model".into(),
            ));
        }
        if let Some((name, &w)) = weights.iter().find(|(_, &w)| w < 0.0 || !w.is_finite()) {
            return Err(EngineError::Configuration(format!(
                "weight for model {name} must be a non-negative finite number, got {w}"
            )));
        }
        let weight_sum: f64 = weights.values().sum();
        if (weight_sum - 1.0).abs() > self.tolerance {
            return Err(EngineError::Configuration(format!(
                "ensemble weights must sum to 1, got {weight_sum:.6}"
            )));
        }

        // Recovery policy: drop missing models, keep going with the rest
        let mut included: Vec<(&str, f64, &[ForecastPoint])> = Vec::new();
        for (name, &weight) in weights {
            match forecasts_by_model.get(name) {
                Some(points) if !points.is_empty() => {
                    included.push((name, weight, points));
                }
                _ => {
                    warn!("ensemble: model {name} has no forecast, excluding and renormalizing");
                }
            }
        }
        if included.is_empty() {
            return Err(EngineError::EnsembleFailure(
                "no model produced a forecast".into(),
            ));
        }

        let included_sum: f64 = included.iter().map(|(_, w, _)| w).sum();
        if included_sum <= 0.0 {
            return Err(EngineError::EnsembleFailure(
                "remaining models carry zero total weight".into(),
            ));
        }

        let horizon = included.iter().map(|(_, _, f)| f.len()).min().expect("non-empty");

        let mut combined = Vec::with_capacity(horizon);
        for t in 0..horizon {
            let mut estimate = 0.0;
            let mut lower = 0.0;
            let mut upper = 0.0;
            for (_, weight, points) in &included {
                let w = weight / included_sum;
                estimate += w * points[t].point_estimate;
                lower += w * points[t].lower_bound;
                upper += w * points[t].upper_bound;
            }
            combined.push(ForecastPoint::new(included[0].2[t].period, estimate, lower, upper));
        }

        Ok(combined)
    }
}
