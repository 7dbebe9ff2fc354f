//! Trend-plus-seasonality forecasting model
//!
//! Decomposes a series into a linear trend and calendar seasonal effects,
//! in either additive or multiplicative form. Yearly seasonality is keyed
//! by calendar month (12 buckets); monthly seasonality is keyed by day of
//! month (31 buckets) and is neutral for month-resolution data where every
//! observation falls on the same day.

use chrono::{Datelike, Months, NaiveDate};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::forecasting::point::ForecastPoint;
use crate::series::Series;

/// How seasonal effects combine with the trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonalityMode {
    Additive,
    Multiplicative,
}

/// Configuration for a trend-seasonal fit
#[derive(Debug, Clone)]
pub struct TrendSeasonalConfig {
    pub seasonality_mode: SeasonalityMode,
    /// Model calendar-month effects (period 12)
    pub yearly_seasonality: bool,
    /// Model day-of-month effects (sub-monthly data only)
    pub monthly_seasonality: bool,
}

impl Default for TrendSeasonalConfig {
    fn default() -> Self {
        Self {
            seasonality_mode: SeasonalityMode::Multiplicative,
            yearly_seasonality: true,
            monthly_seasonality: true,
        }
    }
}

/// Observations below which a seasonal fit is attempted but flagged
pub const SEASONAL_OBSERVATION_FLOOR: usize = 24;

const INTERVAL_Z: f64 = 1.96;

/// Fitted trend-seasonal model state
#[derive(Debug, Clone)]
pub struct TrendSeasonalModel {
    mode: SeasonalityMode,
    intercept: f64,
    slope: f64,
    /// Calendar-month effects indexed by month0, when yearly seasonality is on
    yearly_effects: Option<Vec<f64>>,
    /// Day-of-month effects indexed by day0, when monthly seasonality is on
    monthly_effects: Option<Vec<f64>>,
    residual_std: f64,
    n_obs: usize,
    last_date: NaiveDate,
}

impl TrendSeasonalModel {
    /// Fit the model to a series
    pub fn fit(series: &Series, config: &TrendSeasonalConfig) -> Result<Self> {
        let n = series.len();
        if n < 2 {
            return Err(EngineError::InsufficientData { needed: 2, actual: n });
        }

        let seasonal = config.yearly_seasonality || config.monthly_seasonality;
        if seasonal && n < SEASONAL_OBSERVATION_FLOOR {
            warn!(
                "seasonal fit with {} observations (below {}); seasonal effects may be unstable",
                n, SEASONAL_OBSERVATION_FLOOR
            );
        }

        let values = series.values();
        let (intercept, slope) = linear_trend(&values);

        // Detrend, then peel off yearly and monthly effects in turn
        let mode = config.seasonality_mode;
        let mut residuals: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(t, &y)| detrend(y, intercept + slope * t as f64, mode))
            .collect();

        let yearly_effects = if config.yearly_seasonality {
            let effects = seasonal_effects(
                &residuals,
                &series.points().iter().map(|p| p.date.month0() as usize).collect::<Vec<_>>(),
                12,
                mode,
            );
            for (r, p) in residuals.iter_mut().zip(series.points()) {
                *r = remove_effect(*r, effects[p.date.month0() as usize], mode);
            }
            Some(effects)
        } else {
            None
        };

        let monthly_effects = if config.monthly_seasonality {
            let effects = seasonal_effects(
                &residuals,
                &series.points().iter().map(|p| p.date.day0() as usize).collect::<Vec<_>>(),
                31,
                mode,
            );
            Some(effects)
        } else {
            None
        };

        let model = Self {
            mode,
            intercept,
            slope,
            yearly_effects,
            monthly_effects,
            residual_std: 0.0,
            n_obs: n,
            last_date: series.last_date().expect("non-empty series"),
        };

        // In-sample residual spread drives the interval half-width
        let mut sum_sq = 0.0;
        for (t, p) in series.points().iter().enumerate() {
            let fitted = model.predict(t as f64, p.date);
            let resid = p.value - fitted;
            sum_sq += resid * resid;
        }
        let residual_std = (sum_sq / (n - 1) as f64).sqrt();

        Ok(Self { residual_std, ..model })
    }

    /// Fitted value at observation index `t` with the calendar of `date`
    fn predict(&self, t: f64, date: NaiveDate) -> f64 {
        let trend = self.intercept + self.slope * t;
        let yearly = self
            .yearly_effects
            .as_ref()
            .map(|e| e[date.month0() as usize]);
        let monthly = self
            .monthly_effects
            .as_ref()
            .map(|e| e[date.day0() as usize]);

        match self.mode {
            SeasonalityMode::Additive => trend + yearly.unwrap_or(0.0) + monthly.unwrap_or(0.0),
            SeasonalityMode::Multiplicative => {
                trend * yearly.unwrap_or(1.0) * monthly.unwrap_or(1.0)
            }
        }
    }

    /// Project `horizon` monthly periods past the last observation
    pub fn forecast(&self, horizon: usize) -> Vec<ForecastPoint> {
        let half_width = INTERVAL_Z * self.residual_std;
        let mut date = self.last_date;
        (0..horizon)
            .map(|h| {
                date = date + Months::new(1);
                let t = (self.n_obs + h) as f64;
                let estimate = self.predict(t, date);
                ForecastPoint::symmetric(h as u32 + 1, estimate, half_width)
            })
            .collect()
    }
}

/// Ordinary least squares line through (0..n, values), returning (intercept, slope)
fn linear_trend(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean_t = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (t, &y) in values.iter().enumerate() {
        let dt = t as f64 - mean_t;
        cov += dt * (y - mean_y);
        var += dt * dt;
    }

    let slope = if var > 0.0 { cov / var } else { 0.0 };
    (mean_y - slope * mean_t, slope)
}

fn detrend(y: f64, trend: f64, mode: SeasonalityMode) -> f64 {
    match mode {
        SeasonalityMode::Additive => y - trend,
        // Guard near-zero trend values: a ratio against ~0 is meaningless
        SeasonalityMode::Multiplicative => {
            if trend.abs() > 1e-9 {
                y / trend
            } else {
                1.0
            }
        }
    }
}

fn remove_effect(residual: f64, effect: f64, mode: SeasonalityMode) -> f64 {
    match mode {
        SeasonalityMode::Additive => residual - effect,
        SeasonalityMode::Multiplicative => {
            if effect.abs() > 1e-9 {
                residual / effect
            } else {
                residual
            }
        }
    }
}

/// Per-bucket mean of residuals, centered so effects are neutral on average
///
/// Unseen buckets get the neutral effect (0 additive, 1 multiplicative).
fn seasonal_effects(
    residuals: &[f64],
    buckets: &[usize],
    bucket_count: usize,
    mode: SeasonalityMode,
) -> Vec<f64> {
    let neutral = match mode {
        SeasonalityMode::Additive => 0.0,
        SeasonalityMode::Multiplicative => 1.0,
    };

    let mut sums = vec![0.0; bucket_count];
    let mut counts = vec![0usize; bucket_count];
    for (&r, &b) in residuals.iter().zip(buckets) {
        sums[b] += r;
        counts[b] += 1;
    }

    let mut effects: Vec<f64> = (0..bucket_count)
        .map(|b| if counts[b] > 0 { sums[b] / counts[b] as f64 } else { neutral })
        .collect();

    // Center the observed buckets so the seasonal component carries no level
    let observed: Vec<f64> = effects
        .iter()
        .zip(&counts)
        .filter(|(_, &c)| c > 0)
        .map(|(&e, _)| e)
        .collect();
    if !observed.is_empty() {
        let mean = observed.iter().sum::<f64>() / observed.len() as f64;
        for (e, &c) in effects.iter_mut().zip(&counts) {
            if c > 0 {
                match mode {
                    SeasonalityMode::Additive => *e -= mean,
                    SeasonalityMode::Multiplicative => {
                        if mean.abs() > 1e-9 {
                            *e /= mean;
                        }
                    }
                }
            }
        }
    }

    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn monthly_series(values: &[f64]) -> Series {
        let pairs: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let year = 2020 + (i / 12) as i32;
                let month = (i % 12) as u32 + 1;
                (NaiveDate::from_ymd_opt(year, month, 1).unwrap(), v)
            })
            .collect();
        Series::from_pairs(&pairs).unwrap()
    }

    #[test]
    fn test_rejects_single_observation() {
        let series = monthly_series(&[3.0]);
        let result = TrendSeasonalModel::fit(&series, &TrendSeasonalConfig::default());
        assert!(matches!(result, Err(EngineError::InsufficientData { .. })));
    }

    #[test]
    fn test_recovers_linear_trend() {
        // y = 2 + 0.5t, no seasonality configured
        let values: Vec<f64> = (0..36).map(|t| 2.0 + 0.5 * t as f64).collect();
        let series = monthly_series(&values);
        let config = TrendSeasonalConfig {
            seasonality_mode: SeasonalityMode::Additive,
            yearly_seasonality: false,
            monthly_seasonality: false,
        };

        let model = TrendSeasonalModel::fit(&series, &config).unwrap();
        let forecast = model.forecast(3);

        assert_eq!(forecast.len(), 3);
        // Next values continue the line: t = 36, 37, 38
        assert_relative_eq!(forecast[0].point_estimate, 20.0, epsilon = 1e-9);
        assert_relative_eq!(forecast[2].point_estimate, 21.0, epsilon = 1e-9);
        // Perfect fit means degenerate interval
        assert_relative_eq!(forecast[0].upper_bound, forecast[0].lower_bound, epsilon = 1e-9);
    }

    #[test]
    fn test_yearly_seasonality_captured() {
        // Flat level 10 with a +2 bump every December
        let values: Vec<f64> = (0..48)
            .map(|t| if t % 12 == 11 { 12.0 } else { 10.0 })
            .collect();
        let series = monthly_series(&values);
        let config = TrendSeasonalConfig {
            seasonality_mode: SeasonalityMode::Additive,
            yearly_seasonality: true,
            monthly_seasonality: false,
        };

        let model = TrendSeasonalModel::fit(&series, &config).unwrap();
        let forecast = model.forecast(12);

        // Last observation is 2023-12, so the 12th forecast period is December again
        let december = forecast[11].point_estimate;
        let june = forecast[5].point_estimate;
        assert!(december > june + 1.0, "december={december} june={june}");
    }

    #[test]
    fn test_forecast_periods_are_contiguous() {
        let values: Vec<f64> = (0..24).map(|t| 5.0 + 0.1 * t as f64).collect();
        let series = monthly_series(&values);
        let model = TrendSeasonalModel::fit(&series, &TrendSeasonalConfig::default()).unwrap();

        let forecast = model.forecast(6);
        let periods: Vec<u32> = forecast.iter().map(|p| p.period).collect();
        assert_eq!(periods, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_bounds_bracket_estimate() {
        let values: Vec<f64> = (0..30)
            .map(|t| 3.0 + 0.05 * t as f64 + if t % 2 == 0 { 0.2 } else { -0.2 })
            .collect();
        let series = monthly_series(&values);
        let model = TrendSeasonalModel::fit(&series, &TrendSeasonalConfig::default()).unwrap();

        for point in model.forecast(4) {
            assert!(point.lower_bound <= point.point_estimate);
            assert!(point.point_estimate <= point.upper_bound);
            assert!(point.upper_bound > point.lower_bound);
        }
    }
}
