//! Inflation-adjusted real income and affordability metrics
//!
//! Real income deflates a nominal income by the price-index ratio against
//! a base year; the affordability index expresses disposable income as a
//! percentage of income.

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::series::Series;

/// Index value assumed when the base year is absent from the series
///
/// A guessed default carried over from the source system; it is logged,
/// never applied silently.
pub const FALLBACK_BASE_INDEX: f64 = 100.0;

/// Real income at one observation of the price index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealIncomePoint {
    pub date: NaiveDate,
    /// Price index value at this date
    pub index_value: f64,
    /// Nominal income deflated to base-year terms
    pub real_income: f64,
}

/// Affordability snapshot for a region and period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordabilityRecord {
    pub region: String,
    pub period: u32,
    pub income: f64,
    pub total_cost: f64,
    pub disposable_income: f64,
    pub affordability_index_percent: f64,
}

/// Computes real income and disposable-income ratios
#[derive(Debug, Clone, Default)]
pub struct AffordabilityIndexCalculator;

impl AffordabilityIndexCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Deflate a nominal income across a price-index series
    ///
    /// `real_income[t] = nominal / (index[t] / index[base_year])`, anchored
    /// on the first observation in `base_year`. When the base year is not
    /// in the series the index falls back to 100 with a warning. A base
    /// year that is present but carries a non-positive index value fails
    /// with `MissingBaseYear` since no ratio can be formed.
    pub fn real_income(
        &self,
        nominal_income: f64,
        price_index: &Series,
        base_year: i32,
    ) -> Result<Vec<RealIncomePoint>> {
        if !nominal_income.is_finite() || nominal_income < 0.0 {
            return Err(EngineError::Validation(format!(
                "nominal income must be non-negative, got {nominal_income}"
            )));
        }
        if price_index.is_empty() {
            return Err(EngineError::InsufficientData { needed: 1, actual: 0 });
        }

        let base_index = match price_index.first_in_year(base_year) {
            Some(point) if point.value > 0.0 && point.value.is_finite() => point.value,
            Some(point) => {
                return Err(EngineError::MissingBaseYear {
                    year: base_year,
                    reason: format!("index value {} cannot anchor a ratio", point.value),
                });
            }
            None => {
                warn!(
                    "base year {base_year} absent from price index; assuming base index {FALLBACK_BASE_INDEX}"
                );
                FALLBACK_BASE_INDEX
            }
        };

        price_index
            .points()
            .iter()
            .map(|point| {
                if point.value <= 0.0 {
                    return Err(EngineError::DivisionUndefined(format!(
                        "price index at {} is {}, cannot deflate",
                        point.date, point.value
                    )));
                }
                let inflation_factor = point.value / base_index;
                Ok(RealIncomePoint {
                    date: point.date,
                    index_value: point.value,
                    real_income: nominal_income / inflation_factor,
                })
            })
            .collect()
    }

    /// Disposable income as a percentage of income
    ///
    /// `(income - total_cost) / income * 100`; undefined at zero or
    /// negative income.
    pub fn affordability_index(&self, income: f64, total_cost: f64) -> Result<f64> {
        if !income.is_finite() || !total_cost.is_finite() {
            return Err(EngineError::Validation(format!(
                "income and total cost must be finite, got {income} and {total_cost}"
            )));
        }
        if income <= 0.0 {
            return Err(EngineError::DivisionUndefined(format!(
                "affordability index undefined for income {income}"
            )));
        }
        Ok((income - total_cost) / income * 100.0)
    }

    /// Assemble the full affordability record for a region and period
    pub fn affordability_record(
        &self,
        region: &str,
        period: u32,
        income: f64,
        total_cost: f64,
    ) -> Result<AffordabilityRecord> {
        let affordability_index_percent = self.affordability_index(income, total_cost)?;
        Ok(AffordabilityRecord {
            region: region.to_string(),
            period,
            income,
            total_cost,
            disposable_income: income - total_cost,
            affordability_index_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn yearly_index(start_year: i32, values: &[f64]) -> Series {
        let pairs: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                (NaiveDate::from_ymd_opt(start_year + i as i32, 1, 1).unwrap(), v)
            })
            .collect();
        Series::from_pairs(&pairs).unwrap()
    }

    #[test]
    fn test_real_income_against_base_year() {
        // Index rising from 100 to 110 deflates income by 10%
        let index = yearly_index(2020, &[100.0, 105.0, 110.0]);
        let calc = AffordabilityIndexCalculator::new();

        let points = calc.real_income(5000.0, &index, 2020).unwrap();

        assert_eq!(points.len(), 3);
        assert_relative_eq!(points[0].real_income, 5000.0, epsilon = 1e-9);
        assert_relative_eq!(points[1].real_income, 5000.0 / 1.05, epsilon = 1e-9);
        assert_relative_eq!(points[2].real_income, 5000.0 / 1.10, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_base_year_falls_back_to_100() {
        let index = yearly_index(2021, &[105.0, 110.0]);
        let calc = AffordabilityIndexCalculator::new();

        let points = calc.real_income(5000.0, &index, 1990).unwrap();

        // Base assumed 100, so 105 deflates by 5%
        assert_relative_eq!(points[0].real_income, 5000.0 / 1.05, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_base_index_is_missing_base_year() {
        let index = yearly_index(2020, &[0.0, 105.0]);
        let calc = AffordabilityIndexCalculator::new();

        let result = calc.real_income(5000.0, &index, 2020);
        assert!(matches!(result, Err(EngineError::MissingBaseYear { year: 2020, .. })));
    }

    #[test]
    fn test_nonpositive_period_index_is_division_undefined() {
        let index = yearly_index(2020, &[100.0, -3.0]);
        let calc = AffordabilityIndexCalculator::new();

        let result = calc.real_income(5000.0, &index, 2020);
        assert!(matches!(result, Err(EngineError::DivisionUndefined(_))));
    }

    #[test]
    fn test_affordability_index_scenario() {
        let calc = AffordabilityIndexCalculator::new();
        let index = calc.affordability_index(5000.0, 3500.0).unwrap();
        assert_relative_eq!(index, 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_affordability_index_rejects_zero_income() {
        let calc = AffordabilityIndexCalculator::new();
        assert!(matches!(
            calc.affordability_index(0.0, 100.0),
            Err(EngineError::DivisionUndefined(_))
        ));
        assert!(matches!(
            calc.affordability_index(-50.0, 100.0),
            Err(EngineError::DivisionUndefined(_))
        ));
    }

    #[test]
    fn test_affordability_record_fields() {
        let calc = AffordabilityIndexCalculator::new();
        let record = calc.affordability_record("Berlin", 4, 5000.0, 3500.0).unwrap();

        assert_eq!(record.region, "Berlin");
        assert_eq!(record.period, 4);
        assert_relative_eq!(record.disposable_income, 1500.0, epsilon = 1e-12);
        assert_relative_eq!(record.affordability_index_percent, 30.0, epsilon = 1e-12);
    }
}
