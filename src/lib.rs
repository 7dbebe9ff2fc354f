//! Inflation Engine - Multi-model forecasting and budget projection
//!
//! This library provides:
//! - Multi-model time-series forecasting (trend-seasonal, autoregressive,
//!   gradient-boosted) with a uniform forecast-point contract
//! - Weighted ensemble blending with per-model failure recovery
//! - Category-wise compounding cost projection under time-varying inflation
//! - Budget surplus/deficit projection with rule-based recommendations
//! - Inflation-adjusted real income and affordability metrics

pub mod analysis;
pub mod error;
pub mod forecasting;
pub mod series;

// Re-export commonly used types
pub use analysis::{
    AffordabilityIndexCalculator, AffordabilityRecord, BudgetProjection, BudgetProjector,
    CategoryCostProjector, CostCategory, CostProjectionRow, Recommendation,
};
pub use error::{EngineError, Result};
pub use forecasting::{
    EnsembleCombiner, ForecastPoint, ForecastSession, ModelHandle, ModelKind,
    TimeSeriesForecastEngine, TrainingSpec,
};
pub use series::{Series, SeriesPoint};
