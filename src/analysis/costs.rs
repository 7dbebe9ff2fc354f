//! Per-category cost projection under a blended inflation forecast
//!
//! Each category carries a sensitivity multiplier applied to the inflation
//! *rate* at every period, so the compounding factor must be accumulated
//! sequentially: the rate varies period to period and a closed-form power
//! would be wrong.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, Result};
use crate::forecasting::ForecastPoint;

/// A spending category snapshot supplied by the budget-form collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCategory {
    pub name: String,
    /// Current monthly spend, must be non-negative
    pub current_monthly_amount: f64,
    /// Multiplier on the inflation rate, must be non-negative
    pub inflation_sensitivity: f64,
}

/// Projected costs for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostProjectionRow {
    /// 1-based period index aligned with the inflation forecast
    pub period: u32,
    pub category_costs: BTreeMap<String, f64>,
    pub total_cost: f64,
}

/// Compounds an inflation forecast into per-category cost trajectories
#[derive(Debug, Clone)]
pub struct CategoryCostProjector {
    default_sensitivity: f64,
}

impl Default for CategoryCostProjector {
    fn default() -> Self {
        Self { default_sensitivity: 1.0 }
    }
}

impl CategoryCostProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different sensitivity for categories without an explicit one
    pub fn with_default_sensitivity(default_sensitivity: f64) -> Self {
        Self { default_sensitivity }
    }

    /// Canonical category sensitivities carried over from the source system
    pub fn default_sensitivities() -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("Housing".to_string(), 1.2),
            ("Food".to_string(), 1.1),
            ("Transportation".to_string(), 1.0),
            ("Healthcare".to_string(), 1.3),
            ("Education".to_string(), 1.1),
            ("Entertainment".to_string(), 0.9),
            ("Utilities".to_string(), 1.0),
        ])
    }

    /// Project every category across the inflation forecast
    ///
    /// For category `c` with sensitivity `s`, the compounding factor folds
    /// forward as `f *= 1 + rate_t * s / 100` and the period cost is
    /// `current * f`. Totals sum the per-category costs at each period.
    pub fn project_costs(
        &self,
        current_costs: &BTreeMap<String, f64>,
        inflation_forecast: &[ForecastPoint],
        sensitivities: &BTreeMap<String, f64>,
    ) -> Result<Vec<CostProjectionRow>> {
        for (name, &cost) in current_costs {
            if !(cost >= 0.0) || !cost.is_finite() {
                return Err(EngineError::Validation(format!(
                    "current cost for {name} must be non-negative, got {cost}"
                )));
            }
        }
        for (name, &s) in sensitivities {
            if !(s >= 0.0) || !s.is_finite() {
                return Err(EngineError::Validation(format!(
                    "sensitivity for {name} must be non-negative, got {s}"
                )));
            }
        }
        if let Some(p) = inflation_forecast.iter().find(|p| !p.point_estimate.is_finite()) {
            return Err(EngineError::Validation(format!(
                "inflation forecast has a non-finite estimate at period {}",
                p.period
            )));
        }

        // One accumulator per category, advanced strictly in period order
        let mut factors: BTreeMap<&str, f64> =
            current_costs.keys().map(|name| (name.as_str(), 1.0)).collect();

        let mut rows = Vec::with_capacity(inflation_forecast.len());
        for point in inflation_forecast {
            let mut category_costs = BTreeMap::new();
            let mut total_cost = 0.0;
            for (name, &current) in current_costs {
                let sensitivity =
                    sensitivities.get(name).copied().unwrap_or(self.default_sensitivity);
                let factor = factors.get_mut(name.as_str()).expect("factor per category");
                *factor *= 1.0 + point.point_estimate * sensitivity / 100.0;
                let cost = current * *factor;
                total_cost += cost;
                category_costs.insert(name.clone(), cost);
            }
            rows.push(CostProjectionRow { period: point.period, category_costs, total_cost });
        }

        Ok(rows)
    }

    /// Project `CostCategory` snapshots, using each category's own sensitivity
    pub fn project_categories(
        &self,
        categories: &[CostCategory],
        inflation_forecast: &[ForecastPoint],
    ) -> Result<Vec<CostProjectionRow>> {
        let mut current_costs = BTreeMap::new();
        let mut sensitivities = BTreeMap::new();
        for category in categories {
            if current_costs
                .insert(category.name.clone(), category.current_monthly_amount)
                .is_some()
            {
                return Err(EngineError::Validation(format!(
                    "duplicate category name {}",
                    category.name
                )));
            }
            sensitivities.insert(category.name.clone(), category.inflation_sensitivity);
        }
        self.project_costs(&current_costs, inflation_forecast, &sensitivities)
    }

    /// Project one cost with a location adjustment applied to the result
    ///
    /// Covers the single-category path of the source system (housing with a
    /// location factor). Returns one cost per forecast period.
    pub fn project_single_cost(
        &self,
        current_cost: f64,
        inflation_forecast: &[ForecastPoint],
        sensitivity: f64,
        location_factor: f64,
    ) -> Result<Vec<f64>> {
        if !(current_cost >= 0.0) || !current_cost.is_finite() {
            return Err(EngineError::Validation(format!(
                "current cost must be non-negative, got {current_cost}"
            )));
        }
        if !(sensitivity >= 0.0) || !sensitivity.is_finite() {
            return Err(EngineError::Validation(format!(
                "sensitivity must be non-negative, got {sensitivity}"
            )));
        }

        let mut factor = 1.0;
        let mut costs = Vec::with_capacity(inflation_forecast.len());
        for point in inflation_forecast {
            if !point.point_estimate.is_finite() {
                return Err(EngineError::Validation(format!(
                    "inflation forecast has a non-finite estimate at period {}",
                    point.period
                )));
            }
            factor *= 1.0 + point.point_estimate * sensitivity / 100.0;
            costs.push(current_cost * factor * location_factor);
        }
        Ok(costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_inflation(periods: usize, rate: f64) -> Vec<ForecastPoint> {
        (0..periods)
            .map(|t| ForecastPoint::symmetric(t as u32 + 1, rate, 0.5))
            .collect()
    }

    #[test]
    fn test_compounding_with_sensitivities() {
        // Housing at 1.2x a 3% rate compounds at 3.6% per period, Food at 3%
        let current = BTreeMap::from([
            ("Housing".to_string(), 1000.0),
            ("Food".to_string(), 500.0),
        ]);
        let sensitivities = BTreeMap::from([
            ("Housing".to_string(), 1.2),
            ("Food".to_string(), 1.0),
        ]);
        let forecast = flat_inflation(3, 3.0);

        let rows = CategoryCostProjector::new()
            .project_costs(&current, &forecast, &sensitivities)
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_relative_eq!(rows[0].category_costs["Housing"], 1036.0, epsilon = 1e-9);
        assert_relative_eq!(rows[0].category_costs["Food"], 515.0, epsilon = 1e-9);
        assert_relative_eq!(rows[1].category_costs["Housing"], 1073.296, epsilon = 1e-9);
        assert_relative_eq!(rows[1].category_costs["Food"], 530.45, epsilon = 1e-9);
        assert_relative_eq!(rows[2].category_costs["Housing"], 1111.934656, epsilon = 1e-9);
        assert_relative_eq!(rows[2].category_costs["Food"], 546.3635, epsilon = 1e-9);

        for row in &rows {
            let sum: f64 = row.category_costs.values().sum();
            assert_relative_eq!(sum, row.total_cost, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_sensitivity_leaves_cost_unchanged() {
        let current = BTreeMap::from([("Subscriptions".to_string(), 42.0)]);
        let sensitivities = BTreeMap::from([("Subscriptions".to_string(), 0.0)]);
        let forecast = flat_inflation(24, 5.0);

        let rows = CategoryCostProjector::new()
            .project_costs(&current, &forecast, &sensitivities)
            .unwrap();

        for row in &rows {
            assert_relative_eq!(row.category_costs["Subscriptions"], 42.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_missing_sensitivity_falls_back_to_default() {
        let current = BTreeMap::from([("Misc".to_string(), 100.0)]);
        let forecast = flat_inflation(1, 10.0);

        let rows = CategoryCostProjector::new()
            .project_costs(&current, &forecast, &BTreeMap::new())
            .unwrap();

        // Default sensitivity 1.0: one period of 10% is a plain 10% rise
        assert_relative_eq!(rows[0].category_costs["Misc"], 110.0, epsilon = 1e-9);
    }

    #[test]
    fn test_negative_cost_rejected() {
        let current = BTreeMap::from([("Housing".to_string(), -5.0)]);
        let result = CategoryCostProjector::new().project_costs(
            &current,
            &flat_inflation(3, 3.0),
            &BTreeMap::new(),
        );
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_negative_sensitivity_rejected() {
        let current = BTreeMap::from([("Housing".to_string(), 1000.0)]);
        let sensitivities = BTreeMap::from([("Housing".to_string(), -0.2)]);
        let result = CategoryCostProjector::new().project_costs(
            &current,
            &flat_inflation(3, 3.0),
            &sensitivities,
        );
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let categories = vec![
            CostCategory {
                name: "Food".into(),
                current_monthly_amount: 400.0,
                inflation_sensitivity: 1.1,
            },
            CostCategory {
                name: "Food".into(),
                current_monthly_amount: 200.0,
                inflation_sensitivity: 1.0,
            },
        ];
        let result = CategoryCostProjector::new()
            .project_categories(&categories, &flat_inflation(3, 3.0));
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_single_cost_location_factor() {
        let costs = CategoryCostProjector::new()
            .project_single_cost(1000.0, &flat_inflation(2, 3.0), 1.0, 1.5)
            .unwrap();

        assert_relative_eq!(costs[0], 1030.0 * 1.5, epsilon = 1e-9);
        assert_relative_eq!(costs[1], 1060.9 * 1.5, epsilon = 1e-9);
    }
}
