//! Forecast session owning trained model handles
//!
//! A session replaces any process-wide model registry: it owns every
//! `ModelHandle` it trains, hands out forecasts by model name, and drops
//! all trained state when it goes out of scope. Training across model
//! kinds is independent per (series, kind) pair and runs on the rayon
//! pool, with results collected by task name rather than any mid-flight
//! aggregation.

use log::{info, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::forecasting::engine::{ModelHandle, TimeSeriesForecastEngine};
use crate::forecasting::gradient_boosted::FeatureTable;
use crate::forecasting::point::ForecastPoint;
use crate::forecasting::trend_seasonal::TrendSeasonalConfig;
use crate::series::Series;

/// What to train for a named model slot
#[derive(Debug, Clone)]
pub enum TrainingSpec {
    TrendSeasonal(TrendSeasonalConfig),
    /// ARIMA order, auto-selected when `None`
    Autoregressive(Option<(usize, usize, usize)>),
    /// Gradient boosting over `lags` autoregressive lag features
    GradientBoosted { lags: usize },
}

/// Session-scoped container of trained models
#[derive(Debug, Default)]
pub struct ForecastSession {
    engine: TimeSeriesForecastEngine,
    handles: HashMap<String, ModelHandle>,
}

impl ForecastSession {
    pub fn new(engine: TimeSeriesForecastEngine) -> Self {
        Self { engine, handles: HashMap::new() }
    }

    /// Train one model and store its handle under `name`
    pub fn train(&mut self, name: &str, series: &Series, spec: &TrainingSpec) -> Result<()> {
        let handle = self.train_handle(series, spec)?;
        self.handles.insert(name.to_string(), handle);
        Ok(())
    }

    /// Train several models in parallel, keyed by name
    ///
    /// Each failure is logged and reported per name; successful models are
    /// stored regardless, so a single bad model never blocks the rest.
    pub fn train_all(
        &mut self,
        series: &Series,
        specs: &[(String, TrainingSpec)],
    ) -> Vec<(String, Result<()>)> {
        let trained: Vec<(String, Result<ModelHandle>)> = specs
            .par_iter()
            .map(|(name, spec)| (name.clone(), self.train_handle(series, spec)))
            .collect();

        trained
            .into_iter()
            .map(|(name, result)| match result {
                Ok(handle) => {
                    info!("trained model {name}");
                    self.handles.insert(name.clone(), handle);
                    (name, Ok(()))
                }
                Err(err) => {
                    warn!("training model {name} failed: {err}");
                    (name, Err(err))
                }
            })
            .collect()
    }

    fn train_handle(&self, series: &Series, spec: &TrainingSpec) -> Result<ModelHandle> {
        match spec {
            TrainingSpec::TrendSeasonal(config) => {
                self.engine.train_trend_seasonal(series, config)
            }
            TrainingSpec::Autoregressive(order) => {
                self.engine.train_autoregressive(series, *order)
            }
            TrainingSpec::GradientBoosted { lags } => {
                let table = FeatureTable::from_series_with_lags(series, *lags)?;
                let feature_names: Vec<String> = (1..=*lags)
                    .map(|k| format!("lag_{k}"))
                    .chain(std::iter::once("month".to_string()))
                    .collect();
                let refs: Vec<&str> = feature_names.iter().map(String::as_str).collect();
                self.engine.train_gradient_boosted(&table, &refs, "y")
            }
        }
    }

    /// Forecast every stored model, skipping any that fail
    ///
    /// Failures are logged and omitted from the map, which feeds directly
    /// into the ensemble's exclude-and-renormalize recovery.
    pub fn forecast_all(&self, horizon: usize) -> BTreeMap<String, Vec<ForecastPoint>> {
        let mut forecasts = BTreeMap::new();
        for (name, handle) in &self.handles {
            match self.engine.forecast(handle, horizon) {
                Ok(points) => {
                    forecasts.insert(name.clone(), points);
                }
                Err(err) => {
                    warn!("forecast for model {name} failed: {err}");
                }
            }
        }
        forecasts
    }

    /// Forecast a single stored model by name
    pub fn forecast(&self, name: &str, horizon: usize) -> Option<Result<Vec<ForecastPoint>>> {
        self.handles.get(name).map(|h| self.engine.forecast(h, horizon))
    }

    /// Look up a trained handle
    pub fn handle(&self, name: &str) -> Option<&ModelHandle> {
        self.handles.get(name)
    }

    /// Drop a trained handle
    pub fn remove(&mut self, name: &str) -> Option<ModelHandle> {
        self.handles.remove(name)
    }

    /// Drop every trained handle
    pub fn clear(&mut self) {
        self.handles.clear();
    }

    /// Number of trained models held by the session
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
