//! Gradient-boosted regression model over named feature columns
//!
//! Boosted depth-1 stumps trained on squared-error residuals, with a
//! fixed-seed shuffled 80/20 holdout. The booster only produces point
//! estimates; interval bounds are synthesized from the holdout-residual
//! standard deviation so its output conforms to the same `ForecastPoint`
//! contract as the statistical models.
//!
//! Multi-step forecasting rolls lag features forward: columns named
//! `lag_1..lag_k` are shifted with each prediction, every other feature is
//! held at its last observed value.

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::forecasting::point::{ForecastPoint, ValidationMetrics};
use crate::series::Series;

/// Boosting rounds, matching the source system's estimator count
pub const BOOSTING_ROUNDS: usize = 100;

/// Shrinkage applied to each stump's contribution
pub const LEARNING_RATE: f64 = 0.1;

/// Fraction of rows held out for validation
const HOLDOUT_FRACTION: f64 = 0.2;

/// Fixed shuffle seed for a reproducible holdout split
const SHUFFLE_SEED: u64 = 42;

const INTERVAL_Z: f64 = 1.96;

/// Columnar table of named feature/target columns with equal row counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<(String, Vec<f64>)>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column; all columns must share the same row count
    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        if let Some((_, first)) = self.columns.first() {
            if first.len() != values.len() {
                return Err(EngineError::Validation(format!(
                    "column {} has {} rows, expected {}",
                    name,
                    values.len(),
                    first.len()
                )));
            }
        }
        if self.columns.iter().any(|(n, _)| n == name) {
            return Err(EngineError::Validation(format!("duplicate column {name}")));
        }
        self.columns.push((name.to_string(), values));
        Ok(self)
    }

    /// Build lag features from a series: `lag_1..lag_k`, `month`, target `y`
    ///
    /// Row `i` holds observation `i + lags` as the target with the `lags`
    /// preceding values as features.
    pub fn from_series_with_lags(series: &Series, lags: usize) -> Result<Self> {
        use chrono::Datelike;

        if lags == 0 {
            return Err(EngineError::Configuration("lag count must be at least 1".into()));
        }
        let n = series.len();
        if n <= lags {
            return Err(EngineError::InsufficientData { needed: lags + 1, actual: n });
        }

        let values = series.values();
        let rows = n - lags;
        let mut table = Self::new();
        for k in 1..=lags {
            let column: Vec<f64> = (0..rows).map(|i| values[i + lags - k]).collect();
            table = table.with_column(&format!("lag_{k}"), column)?;
        }
        let months: Vec<f64> = series.points()[lags..]
            .iter()
            .map(|p| p.date.month() as f64)
            .collect();
        table = table.with_column("month", months)?;
        table.with_column("y", values[lags..].to_vec())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }
}

/// A single depth-1 regression tree
#[derive(Debug, Clone)]
struct Stump {
    feature: usize,
    threshold: f64,
    left_value: f64,
    right_value: f64,
}

impl Stump {
    fn predict(&self, row: &[f64]) -> f64 {
        if row[self.feature] <= self.threshold {
            self.left_value
        } else {
            self.right_value
        }
    }
}

/// Fitted gradient-boosted model state
#[derive(Debug, Clone)]
pub struct GradientBoostedModel {
    feature_names: Vec<String>,
    base_prediction: f64,
    stumps: Vec<Stump>,
    metrics: ValidationMetrics,
    /// Holdout residual standard deviation, used to synthesize bounds
    residual_std: f64,
    /// Feature values of the most recent row, the seed for roll-forward
    last_row: Vec<f64>,
    /// For each feature, the lag order parsed from a `lag_k` name
    lag_orders: Vec<Option<usize>>,
}

impl GradientBoostedModel {
    /// Train on the named feature and target columns of `table`
    pub fn fit(table: &FeatureTable, feature_columns: &[&str], target_column: &str) -> Result<Self> {
        if feature_columns.is_empty() {
            return Err(EngineError::Configuration(
                "at least one feature column is required".into(),
            ));
        }

        let mut features: Vec<&[f64]> = Vec::with_capacity(feature_columns.len());
        for &name in feature_columns {
            let column = table.column(name).ok_or_else(|| {
                EngineError::Configuration(format!("unknown feature column {name}"))
            })?;
            features.push(column);
        }
        let target = table.column(target_column).ok_or_else(|| {
            EngineError::Configuration(format!("unknown target column {target_column}"))
        })?;

        let n = table.n_rows();
        if n < 5 {
            return Err(EngineError::InsufficientData { needed: 5, actual: n });
        }

        // Fixed-seed shuffle, then 80/20 split by position
        let indices = shuffled_indices(n, SHUFFLE_SEED);
        let holdout_len = ((n as f64 * HOLDOUT_FRACTION).round() as usize).max(1);
        let (train_idx, val_idx) = indices.split_at(n - holdout_len);

        let row = |i: usize| -> Vec<f64> { features.iter().map(|c| c[i]).collect() };

        let base_prediction =
            train_idx.iter().map(|&i| target[i]).sum::<f64>() / train_idx.len() as f64;

        // Pre-sort training rows per feature for threshold scans
        let sorted_orders: Vec<Vec<usize>> = features
            .iter()
            .map(|column| {
                let mut order = train_idx.to_vec();
                order.sort_by(|&a, &b| column[a].partial_cmp(&column[b]).expect("finite feature"));
                order
            })
            .collect();

        let mut residuals: Vec<f64> = vec![0.0; n];
        for &i in train_idx {
            residuals[i] = target[i] - base_prediction;
        }

        let mut stumps = Vec::with_capacity(BOOSTING_ROUNDS);
        for _ in 0..BOOSTING_ROUNDS {
            let Some(stump) = best_stump(&features, &sorted_orders, &residuals) else {
                break; // all features constant, nothing left to split
            };
            for &i in train_idx {
                residuals[i] -= LEARNING_RATE * stump.predict(&row(i));
            }
            stumps.push(stump);
        }

        // Holdout evaluation drives both the metrics and the interval width
        let predict = |r: &[f64]| -> f64 {
            base_prediction + LEARNING_RATE * stumps.iter().map(|s| s.predict(r)).sum::<f64>()
        };

        let mut abs_err = 0.0;
        let mut sq_err = 0.0;
        let val_mean = val_idx.iter().map(|&i| target[i]).sum::<f64>() / val_idx.len() as f64;
        let mut sst = 0.0;
        let mut val_residuals = Vec::with_capacity(val_idx.len());
        for &i in val_idx {
            let err = target[i] - predict(&row(i));
            abs_err += err.abs();
            sq_err += err * err;
            sst += (target[i] - val_mean).powi(2);
            val_residuals.push(err);
        }
        let mae = abs_err / val_idx.len() as f64;
        let mse = sq_err / val_idx.len() as f64;
        let r_squared = if sst > 0.0 { 1.0 - sq_err / sst } else { 0.0 };
        let metrics = ValidationMetrics { mae, mse, r_squared };

        let residual_std = if val_residuals.len() > 1 {
            let mean = val_residuals.iter().sum::<f64>() / val_residuals.len() as f64;
            (val_residuals.iter().map(|e| (e - mean).powi(2)).sum::<f64>()
                / (val_residuals.len() - 1) as f64)
                .sqrt()
        } else {
            val_residuals[0].abs()
        };

        info!(
            "gradient-boosted model trained - MAE: {:.4}, MSE: {:.4}, R2: {:.4}",
            mae, mse, r_squared
        );

        let lag_orders = feature_columns
            .iter()
            .map(|name| name.strip_prefix("lag_").and_then(|s| s.parse::<usize>().ok()))
            .collect();

        Ok(Self {
            feature_names: feature_columns.iter().map(|s| s.to_string()).collect(),
            base_prediction,
            stumps,
            metrics,
            residual_std,
            last_row: row(n - 1),
            lag_orders,
        })
    }

    /// Holdout validation metrics recorded at training time
    pub fn metrics(&self) -> ValidationMetrics {
        self.metrics
    }

    /// Predict a single feature row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.base_prediction
            + LEARNING_RATE * self.stumps.iter().map(|s| s.predict(row)).sum::<f64>()
    }

    /// Project `horizon` periods by rolling lag features forward
    pub fn forecast(&self, horizon: usize) -> Vec<ForecastPoint> {
        let half_width = INTERVAL_Z * self.residual_std;
        let mut row = self.last_row.clone();
        let max_lag = self.lag_orders.iter().flatten().copied().max().unwrap_or(0);

        (0..horizon)
            .map(|h| {
                let estimate = self.predict(&row);

                // Shift lag_k <- lag_{k-1}, then lag_1 <- prediction
                for k in (2..=max_lag).rev() {
                    if let (Some(dst), Some(src)) =
                        (self.lag_position(k), self.lag_position(k - 1))
                    {
                        row[dst] = row[src];
                    }
                }
                if let Some(first) = self.lag_position(1) {
                    row[first] = estimate;
                }

                ForecastPoint::symmetric(h as u32 + 1, estimate, half_width)
            })
            .collect()
    }

    fn lag_position(&self, order: usize) -> Option<usize> {
        self.lag_orders.iter().position(|&o| o == Some(order))
    }
}

/// Best single split across all features, maximizing residual SSE reduction
fn best_stump(
    features: &[&[f64]],
    sorted_orders: &[Vec<usize>],
    residuals: &[f64],
) -> Option<Stump> {
    let mut best: Option<(f64, Stump)> = None;

    for (f, order) in sorted_orders.iter().enumerate() {
        let column = features[f];
        let total_count = order.len();
        let total_sum: f64 = order.iter().map(|&i| residuals[i]).sum();

        let mut left_sum = 0.0;
        for (pos, &i) in order[..total_count - 1].iter().enumerate() {
            left_sum += residuals[i];
            let next = order[pos + 1];
            if column[i] == column[next] {
                continue; // no threshold between equal values
            }

            let left_count = (pos + 1) as f64;
            let right_count = (total_count - pos - 1) as f64;
            let right_sum = total_sum - left_sum;
            let score =
                left_sum * left_sum / left_count + right_sum * right_sum / right_count;

            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((
                    score,
                    Stump {
                        feature: f,
                        threshold: (column[i] + column[next]) / 2.0,
                        left_value: left_sum / left_count,
                        right_value: right_sum / right_count,
                    },
                ));
            }
        }
    }

    best.map(|(_, stump)| stump)
}

/// Fisher-Yates shuffle driven by a xorshift generator
fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut state = seed.max(1);
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let mut indices: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = (next() % (i as u64 + 1)) as usize;
        indices.swap(i, j);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monthly_series(values: &[f64]) -> Series {
        let pairs: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let year = 2019 + (i / 12) as i32;
                let month = (i % 12) as u32 + 1;
                (NaiveDate::from_ymd_opt(year, month, 1).unwrap(), v)
            })
            .collect();
        Series::from_pairs(&pairs).unwrap()
    }

    #[test]
    fn test_lag_table_shape() {
        let series = monthly_series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let table = FeatureTable::from_series_with_lags(&series, 2).unwrap();

        assert_eq!(table.n_rows(), 4);
        // First row: target 3.0 with lag_1 = 2.0, lag_2 = 1.0
        assert_eq!(table.column("y").unwrap()[0], 3.0);
        assert_eq!(table.column("lag_1").unwrap()[0], 2.0);
        assert_eq!(table.column("lag_2").unwrap()[0], 1.0);
    }

    #[test]
    fn test_unknown_column_is_configuration_error() {
        let series = monthly_series(&(0..30).map(|t| t as f64).collect::<Vec<_>>());
        let table = FeatureTable::from_series_with_lags(&series, 3).unwrap();

        let result = GradientBoostedModel::fit(&table, &["lag_1", "nope"], "y");
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_too_few_rows_is_insufficient_data() {
        let table = FeatureTable::new()
            .with_column("x", vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_column("y", vec![1.0, 2.0, 3.0])
            .unwrap();

        let result = GradientBoostedModel::fit(&table, &["x"], "y");
        assert!(matches!(result, Err(EngineError::InsufficientData { .. })));
    }

    #[test]
    fn test_metrics_recorded_and_fit_reasonable() {
        // Step function of lag_1: easily learned by stumps
        let values: Vec<f64> = (0..60)
            .map(|t| if (t / 6) % 2 == 0 { 2.0 } else { 8.0 })
            .collect();
        let series = monthly_series(&values);
        let table = FeatureTable::from_series_with_lags(&series, 3).unwrap();

        let model =
            GradientBoostedModel::fit(&table, &["lag_1", "lag_2", "lag_3", "month"], "y").unwrap();
        let metrics = model.metrics();

        assert!(metrics.mae.is_finite());
        assert!(metrics.mse >= 0.0);
        assert!(metrics.r_squared <= 1.0);
    }

    #[test]
    fn test_forecast_length_and_symmetric_bounds() {
        let values: Vec<f64> = (0..40).map(|t| 10.0 + (t % 5) as f64).collect();
        let series = monthly_series(&values);
        let table = FeatureTable::from_series_with_lags(&series, 2).unwrap();

        let model = GradientBoostedModel::fit(&table, &["lag_1", "lag_2"], "y").unwrap();
        let forecast = model.forecast(5);

        assert_eq!(forecast.len(), 5);
        for point in &forecast {
            let below = point.point_estimate - point.lower_bound;
            let above = point.upper_bound - point.point_estimate;
            assert!((below - above).abs() < 1e-9, "bounds must be symmetric");
        }
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        assert_eq!(shuffled_indices(10, 42), shuffled_indices(10, 42));
        assert_ne!(shuffled_indices(10, 42), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_constant_target_predicts_constant() {
        let table = FeatureTable::new()
            .with_column("x", (0..20).map(|t| t as f64).collect())
            .unwrap()
            .with_column("y", vec![7.0; 20])
            .unwrap();

        let model = GradientBoostedModel::fit(&table, &["x"], "y").unwrap();
        assert!((model.predict(&[3.0]) - 7.0).abs() < 1e-9);
    }
}
