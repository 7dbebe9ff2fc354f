//! Cost, budget, and affordability projections over a blended forecast

mod affordability;
mod budget;
mod costs;

pub use affordability::{
    AffordabilityIndexCalculator, AffordabilityRecord, RealIncomePoint, FALLBACK_BASE_INDEX,
};
pub use budget::{
    BudgetProjection, BudgetProjector, Recommendation, HIGH_SAVINGS_RATE_PCT,
    LOW_SAVINGS_RATE_PCT,
};
pub use costs::{CategoryCostProjector, CostCategory, CostProjectionRow};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecasting::{
        EnsembleCombiner, ForecastSession, TimeSeriesForecastEngine, TrainingSpec,
        TrendSeasonalConfig,
    };
    use crate::series::Series;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    /// Full pipeline: train, blend, project costs and budget, score affordability
    #[test]
    fn test_forecast_to_affordability_pipeline() {
        let pairs: Vec<_> = (0..72)
            .map(|i| {
                let year = 2018 + (i / 12) as i32;
                let month = (i % 12) as u32 + 1;
                let value = 2.0 + 0.01 * i as f64 + ((month as f64) / 12.0) * 0.3;
                (NaiveDate::from_ymd_opt(year, month, 1).unwrap(), value)
            })
            .collect();
        let series = Series::from_pairs(&pairs).unwrap();

        let mut session = ForecastSession::new(TimeSeriesForecastEngine::default());
        let specs = vec![
            (
                "trend_seasonal".to_string(),
                TrainingSpec::TrendSeasonal(TrendSeasonalConfig::default()),
            ),
            ("autoregressive".to_string(), TrainingSpec::Autoregressive(None)),
        ];
        assert!(session.train_all(&series, &specs).iter().all(|(_, r)| r.is_ok()));

        let forecasts = session.forecast_all(12);
        let blended = EnsembleCombiner::new()
            .combine(&forecasts, &EnsembleCombiner::default_weights())
            .unwrap();
        assert_eq!(blended.len(), 12);

        let current = BTreeMap::from([
            ("Housing".to_string(), 1500.0),
            ("Food".to_string(), 500.0),
        ]);
        let costs = CategoryCostProjector::new()
            .project_costs(&current, &blended, &CategoryCostProjector::default_sensitivities())
            .unwrap();
        let budget = BudgetProjector::new()
            .project_budget(4000.0, &costs, 0.002)
            .unwrap();

        assert_eq!(budget.len(), 12);
        for row in &budget {
            let sum: f64 = row.category_expenses.values().sum();
            assert!((sum - row.projected_expense_total).abs() < 1e-9);
            assert!(
                (row.surplus_deficit - (row.projected_income - row.projected_expense_total)).abs()
                    < 1e-9
            );
        }

        let last = budget.last().unwrap();
        let record = AffordabilityIndexCalculator::new()
            .affordability_record("test", last.period, last.projected_income, last.projected_expense_total)
            .unwrap();
        assert!(record.affordability_index_percent.is_finite());
    }
}
