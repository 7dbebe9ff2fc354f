//! Forecast engine facade over the model kinds
//!
//! Trains any of the supported model kinds against a series and projects
//! trained handles forward through one uniform `forecast` call. Handles are
//! opaque: callers never see the per-kind internals, only `ForecastPoint`
//! sequences.

use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::forecasting::autoregressive::ArimaModel;
use crate::forecasting::gradient_boosted::{FeatureTable, GradientBoostedModel};
use crate::forecasting::point::{ForecastPoint, ValidationMetrics};
use crate::forecasting::trend_seasonal::{TrendSeasonalConfig, TrendSeasonalModel};
use crate::series::Series;

/// Supported forecasting model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    TrendSeasonal,
    Autoregressive,
    GradientBoosted,
}

/// Engine-level configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Abort any single training call after this long
    pub training_timeout: Option<Duration>,
}

/// Opaque trained-model state
///
/// Owned by the session that created it and discarded with it; never
/// persisted across runs.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    model: TrainedModel,
}

#[derive(Debug, Clone)]
enum TrainedModel {
    TrendSeasonal(TrendSeasonalModel),
    Autoregressive(ArimaModel),
    GradientBoosted(GradientBoostedModel),
}

impl ModelHandle {
    /// Which model family produced this handle
    pub fn kind(&self) -> ModelKind {
        match self.model {
            TrainedModel::TrendSeasonal(_) => ModelKind::TrendSeasonal,
            TrainedModel::Autoregressive(_) => ModelKind::Autoregressive,
            TrainedModel::GradientBoosted(_) => ModelKind::GradientBoosted,
        }
    }

    /// Holdout metrics, recorded for gradient-boosted handles only
    pub fn metrics(&self) -> Option<ValidationMetrics> {
        match &self.model {
            TrainedModel::GradientBoosted(m) => Some(m.metrics()),
            _ => None,
        }
    }
}

/// Trains models and projects them forward
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesForecastEngine {
    config: EngineConfig,
}

impl TimeSeriesForecastEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Fit a trend-plus-seasonality model
    pub fn train_trend_seasonal(
        &self,
        series: &Series,
        config: &TrendSeasonalConfig,
    ) -> Result<ModelHandle> {
        let series = series.clone();
        let config = config.clone();
        self.run_training(move || {
            TrendSeasonalModel::fit(&series, &config)
                .map(|m| ModelHandle { model: TrainedModel::TrendSeasonal(m) })
        })
    }

    /// Fit an ARIMA model, auto-selecting the order when omitted
    pub fn train_autoregressive(
        &self,
        series: &Series,
        order: Option<(usize, usize, usize)>,
    ) -> Result<ModelHandle> {
        let series = series.clone();
        self.run_training(move || {
            ArimaModel::fit(&series, order)
                .map(|m| ModelHandle { model: TrainedModel::Autoregressive(m) })
        })
    }

    /// Fit a gradient-boosted model on named feature columns
    pub fn train_gradient_boosted(
        &self,
        table: &FeatureTable,
        feature_columns: &[&str],
        target_column: &str,
    ) -> Result<ModelHandle> {
        let table = table.clone();
        let feature_columns: Vec<String> =
            feature_columns.iter().map(|s| s.to_string()).collect();
        let target_column = target_column.to_string();
        self.run_training(move || {
            let refs: Vec<&str> = feature_columns.iter().map(String::as_str).collect();
            GradientBoostedModel::fit(&table, &refs, &target_column)
                .map(|m| ModelHandle { model: TrainedModel::GradientBoosted(m) })
        })
    }

    /// Project a trained handle `horizon` contiguous periods forward
    pub fn forecast(&self, handle: &ModelHandle, horizon: usize) -> Result<Vec<ForecastPoint>> {
        if horizon == 0 {
            return Err(EngineError::Configuration(
                "forecast horizon must be at least 1 period".into(),
            ));
        }
        let points = match &handle.model {
            TrainedModel::TrendSeasonal(m) => m.forecast(horizon),
            TrainedModel::Autoregressive(m) => m.forecast(horizon),
            TrainedModel::GradientBoosted(m) => m.forecast(horizon),
        };
        Ok(points)
    }

    /// Run a training closure, enforcing the configured timeout
    ///
    /// The worker thread is detached on timeout; the caller gets
    /// `TrainingTimeout` and the orphaned result is dropped on arrival.
    fn run_training<F>(&self, train: F) -> Result<ModelHandle>
    where
        F: FnOnce() -> Result<ModelHandle> + Send + 'static,
    {
        match self.config.training_timeout {
            None => train(),
            Some(limit) => {
                let (tx, rx) = mpsc::sync_channel(1);
                thread::spawn(move || {
                    let _ = tx.send(train());
                });
                match rx.recv_timeout(limit) {
                    Ok(result) => result,
                    Err(_) => Err(EngineError::TrainingTimeout(limit)),
                }
            }
        }
    }
}
