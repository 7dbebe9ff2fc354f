//! Budget surplus/deficit projection and rule-based recommendations
//!
//! Income grows at a single constant per-period rate (closed-form, unlike
//! costs whose rate varies by period), expenses come from the cost
//! projection, and four advisory rules evaluate independently over the
//! resulting trajectory.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::analysis::costs::CostProjectionRow;
use crate::error::{EngineError, Result};

/// Savings-rate floor below which the low-savings warning fires
pub const LOW_SAVINGS_RATE_PCT: f64 = 10.0;

/// Savings-rate ceiling above which the high-savings note fires
pub const HIGH_SAVINGS_RATE_PCT: f64 = 25.0;

/// One projected budget period
///
/// Invariants: `category_expenses` sums to `projected_expense_total` and
/// `surplus_deficit = projected_income - projected_expense_total`.
/// `savings_rate_percent` is `None` when income is zero; the rate is
/// undefined there and is flagged rather than silently zeroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetProjection {
    pub period: u32,
    pub projected_income: f64,
    pub projected_expense_total: f64,
    pub category_expenses: BTreeMap<String, f64>,
    pub surplus_deficit: f64,
    pub savings_rate_percent: Option<f64>,
}

/// Advisory tags produced from a budget trajectory, in fixed rule order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Recommendation {
    /// Mean savings rate below 10%
    LowSavingsRate { mean_rate: f64 },
    /// Mean savings rate above 25%
    HighSavingsRate { mean_rate: f64 },
    /// At least one period runs a deficit
    DeficitPeriods { count: usize },
    /// Final surplus below the first
    DecliningTrajectory,
    /// Final surplus at or above the first
    ImprovingTrajectory,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowSavingsRate { mean_rate } => write!(
                f,
                "Low savings rate projected ({mean_rate:.1}%). Consider reducing expenses or increasing income."
            ),
            Self::HighSavingsRate { mean_rate } => write!(
                f,
                "Excellent savings rate projected ({mean_rate:.1}%). Consider increasing investments."
            ),
            Self::DeficitPeriods { count } => {
                write!(f, "Budget deficit expected in {count} periods. Plan accordingly.")
            }
            Self::DecliningTrajectory => {
                write!(f, "Financial position declining over time. Review budget allocation.")
            }
            Self::ImprovingTrajectory => {
                write!(f, "Financial position improving over time. Good trajectory.")
            }
        }
    }
}

/// Combines income growth with projected costs
#[derive(Debug, Clone, Default)]
pub struct BudgetProjector;

impl BudgetProjector {
    pub fn new() -> Self {
        Self
    }

    /// Project income against costs, one row per cost-projection period
    ///
    /// `projected_income[t] = current_income * (1 + growth_rate)^t` with `t`
    /// the 1-based period index. Zero income is legal and flags the savings
    /// rate as undefined.
    pub fn project_budget(
        &self,
        current_income: f64,
        cost_projection: &[CostProjectionRow],
        income_growth_rate: f64,
    ) -> Result<Vec<BudgetProjection>> {
        if !current_income.is_finite() || current_income < 0.0 {
            return Err(EngineError::Validation(format!(
                "current income must be non-negative, got {current_income}"
            )));
        }
        if !income_growth_rate.is_finite() || income_growth_rate <= -1.0 {
            return Err(EngineError::Validation(format!(
                "income growth rate must be a finite value above -1, got {income_growth_rate}"
            )));
        }
        if current_income == 0.0 {
            warn!("projecting budget with zero income; savings rates will be undefined");
        }

        let rows = cost_projection
            .iter()
            .map(|row| {
                let projected_income =
                    current_income * (1.0 + income_growth_rate).powi(row.period as i32);
                let surplus_deficit = projected_income - row.total_cost;
                let savings_rate_percent = if projected_income > 0.0 {
                    Some(surplus_deficit / projected_income * 100.0)
                } else {
                    None
                };
                BudgetProjection {
                    period: row.period,
                    projected_income,
                    projected_expense_total: row.total_cost,
                    category_expenses: row.category_costs.clone(),
                    surplus_deficit,
                    savings_rate_percent,
                }
            })
            .collect();

        Ok(rows)
    }

    /// Evaluate all advisory rules over a projection
    ///
    /// Rules are independent and non-exclusive; every applicable tag is
    /// returned, always in the same order. The mean savings rate considers
    /// defined rates only, and both savings rules are skipped when no
    /// period has a defined rate.
    pub fn generate_recommendations(&self, projection: &[BudgetProjection]) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();
        if projection.is_empty() {
            return recommendations;
        }

        let defined_rates: Vec<f64> =
            projection.iter().filter_map(|p| p.savings_rate_percent).collect();
        if !defined_rates.is_empty() {
            let mean_rate = defined_rates.iter().sum::<f64>() / defined_rates.len() as f64;
            if mean_rate < LOW_SAVINGS_RATE_PCT {
                recommendations.push(Recommendation::LowSavingsRate { mean_rate });
            }
            if mean_rate > HIGH_SAVINGS_RATE_PCT {
                recommendations.push(Recommendation::HighSavingsRate { mean_rate });
            }
        }

        let deficit_count = projection.iter().filter(|p| p.surplus_deficit < 0.0).count();
        if deficit_count > 0 {
            recommendations.push(Recommendation::DeficitPeriods { count: deficit_count });
        }

        let first = projection.first().expect("non-empty projection").surplus_deficit;
        let last = projection.last().expect("non-empty projection").surplus_deficit;
        if last < first {
            recommendations.push(Recommendation::DecliningTrajectory);
        } else {
            recommendations.push(Recommendation::ImprovingTrajectory);
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cost_rows(totals: &[f64]) -> Vec<CostProjectionRow> {
        totals
            .iter()
            .enumerate()
            .map(|(t, &total)| CostProjectionRow {
                period: t as u32 + 1,
                category_costs: BTreeMap::from([("All".to_string(), total)]),
                total_cost: total,
            })
            .collect()
    }

    #[test]
    fn test_income_compounds_closed_form() {
        let projection = BudgetProjector::new()
            .project_budget(5000.0, &cost_rows(&[3000.0, 3000.0, 3000.0]), 0.03)
            .unwrap();

        assert_relative_eq!(projection[0].projected_income, 5000.0 * 1.03, epsilon = 1e-9);
        assert_relative_eq!(
            projection[2].projected_income,
            5000.0 * 1.03_f64.powi(3),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            projection[0].surplus_deficit,
            5000.0 * 1.03 - 3000.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_projection_is_deterministic() {
        let projector = BudgetProjector::new();
        let rows = cost_rows(&[3000.0, 3100.0, 3200.0]);

        let a = projector.project_budget(5000.0, &rows, 0.03).unwrap();
        let b = projector.project_budget(5000.0, &rows, 0.03).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_income_flags_undefined_savings_rate() {
        let projection = BudgetProjector::new()
            .project_budget(0.0, &cost_rows(&[100.0]), 0.03)
            .unwrap();

        assert_eq!(projection[0].savings_rate_percent, None);
        assert_relative_eq!(projection[0].surplus_deficit, -100.0, epsilon = 1e-9);

        // Savings rules skip; deficit and trajectory rules still apply
        let recs = BudgetProjector::new().generate_recommendations(&projection);
        assert_eq!(
            recs,
            vec![
                Recommendation::DeficitPeriods { count: 1 },
                Recommendation::ImprovingTrajectory,
            ]
        );
    }

    #[test]
    fn test_negative_income_rejected() {
        let result = BudgetProjector::new().project_budget(-1.0, &cost_rows(&[100.0]), 0.03);
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_low_savings_and_deficit_warnings() {
        // Income barely above costs, later underwater: low savings + deficits + decline
        let projection = BudgetProjector::new()
            .project_budget(3000.0, &cost_rows(&[2950.0, 3050.0, 3200.0]), 0.0)
            .unwrap();
        let recs = BudgetProjector::new().generate_recommendations(&projection);

        assert!(matches!(recs[0], Recommendation::LowSavingsRate { .. }));
        assert!(recs.contains(&Recommendation::DeficitPeriods { count: 2 }));
        assert_eq!(recs.last(), Some(&Recommendation::DecliningTrajectory));
    }

    #[test]
    fn test_high_savings_note() {
        let projection = BudgetProjector::new()
            .project_budget(10000.0, &cost_rows(&[5000.0, 5000.0]), 0.02)
            .unwrap();
        let recs = BudgetProjector::new().generate_recommendations(&projection);

        assert!(matches!(recs[0], Recommendation::HighSavingsRate { .. }));
        assert_eq!(recs.last(), Some(&Recommendation::ImprovingTrajectory));
    }

    #[test]
    fn test_rules_are_ordered_and_non_exclusive() {
        // Declining but still positive savings above 25%
        let projection = BudgetProjector::new()
            .project_budget(10000.0, &cost_rows(&[4000.0, 7000.0]), 0.0)
            .unwrap();
        let recs = BudgetProjector::new().generate_recommendations(&projection);

        assert_eq!(recs.len(), 2);
        assert!(matches!(recs[0], Recommendation::HighSavingsRate { .. }));
        assert_eq!(recs[1], Recommendation::DecliningTrajectory);
    }
}
