//! Multi-model time-series forecasting
//!
//! Three model families (trend-seasonal, autoregressive, gradient-boosted)
//! behind one engine facade, an ensemble combiner, and a session object
//! that owns trained handles for the duration of an analysis run.

mod autoregressive;
mod engine;
mod ensemble;
mod gradient_boosted;
mod point;
mod session;
mod trend_seasonal;

pub use autoregressive::{adf_test, AdfOutcome, ArimaModel};
pub use engine::{EngineConfig, ModelHandle, ModelKind, TimeSeriesForecastEngine};
pub use ensemble::EnsembleCombiner;
pub use gradient_boosted::{FeatureTable, GradientBoostedModel, BOOSTING_ROUNDS, LEARNING_RATE};
pub use point::{ForecastPoint, ValidationMetrics};
pub use session::{ForecastSession, TrainingSpec};
pub use trend_seasonal::{
    SeasonalityMode, TrendSeasonalConfig, TrendSeasonalModel, SEASONAL_OBSERVATION_FLOOR,
};
