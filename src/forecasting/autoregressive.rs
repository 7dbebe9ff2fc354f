//! Autoregressive (ARIMA) forecasting model
//!
//! Order selection follows the source system's heuristic: an augmented
//! Dickey-Fuller test decides the differencing order (reject unit root at
//! 5% significance means d=0, otherwise d=1) and p=1, q=1 are fixed.
//! ARMA(1,1) parameters come from method-of-moments on the (differenced)
//! series; interval widths grow with the cumulated psi-weights.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::forecasting::point::ForecastPoint;
use crate::series::Series;

/// ADF 5% critical value (constant, no trend, large sample)
const ADF_CRITICAL_5PCT: f64 = -2.86;

/// Minimum observations for a meaningful ADF regression
const ADF_MIN_OBSERVATIONS: usize = 8;

const INTERVAL_Z: f64 = 1.96;

/// Stationarity limit for the AR and MA coefficients
const COEFF_LIMIT: f64 = 0.98;

/// Outcome of the augmented Dickey-Fuller unit-root test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfOutcome {
    /// t-statistic on the lagged-level coefficient
    pub statistic: f64,
    /// Whether the unit-root hypothesis is rejected at 5% significance
    pub reject_unit_root: bool,
}

/// Run the augmented Dickey-Fuller test with one lagged difference
///
/// Regresses `Δy_t` on `[1, y_{t-1}, Δy_{t-1}]` and compares the t-statistic
/// of the lagged level against the 5% critical value.
pub fn adf_test(values: &[f64]) -> Option<AdfOutcome> {
    let n = values.len();
    if n < ADF_MIN_OBSERVATIONS {
        return None;
    }

    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    // Rows t = 2..n-1 in the original indexing
    let m = diffs.len() - 1;
    let mut xtx = [[0.0f64; 3]; 3];
    let mut xty = [0.0f64; 3];
    for i in 0..m {
        let row = [1.0, values[i + 1], diffs[i]];
        let target = diffs[i + 1];
        for a in 0..3 {
            for b in 0..3 {
                xtx[a][b] += row[a] * row[b];
            }
            xty[a] += row[a] * target;
        }
    }

    let beta = solve3(xtx, xty)?;

    // Residual variance and the standard error of the level coefficient
    let mut sse = 0.0;
    for i in 0..m {
        let row = [1.0, values[i + 1], diffs[i]];
        let fitted = beta[0] * row[0] + beta[1] * row[1] + beta[2] * row[2];
        let resid = diffs[i + 1] - fitted;
        sse += resid * resid;
    }
    let dof = m.checked_sub(3).filter(|&d| d > 0)? as f64;
    let s2 = sse / dof;

    // Variance of beta[1] is s^2 * (X'X)^-1 [1][1]
    let inv_col = solve3(xtx, [0.0, 1.0, 0.0])?;
    let var_level = s2 * inv_col[1];
    if var_level <= 0.0 {
        return None;
    }

    let statistic = beta[1] / var_level.sqrt();
    Some(AdfOutcome {
        statistic,
        reject_unit_root: statistic < ADF_CRITICAL_5PCT,
    })
}

/// Solve a 3x3 linear system by Gaussian elimination with partial pivoting
fn solve3(a: [[f64; 3]; 3], b: [f64; 3]) -> Option<[f64; 3]> {
    let mut m = [[0.0f64; 4]; 3];
    for i in 0..3 {
        m[i][..3].copy_from_slice(&a[i]);
        m[i][3] = b[i];
    }

    for col in 0..3 {
        let pivot = (col..3).max_by(|&i, &j| {
            m[i][col].abs().partial_cmp(&m[j][col].abs()).expect("finite pivot")
        })?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        for row in (col + 1)..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..4 {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut x = [0.0f64; 3];
    for row in (0..3).rev() {
        let mut sum = m[row][3];
        for k in (row + 1)..3 {
            sum -= m[row][k] * x[k];
        }
        x[row] = sum / m[row][row];
    }
    Some(x)
}

/// Fitted ARIMA model state
#[derive(Debug, Clone)]
pub struct ArimaModel {
    order: (usize, usize, usize),
    /// Mean of the differenced series
    mu: f64,
    phi: f64,
    theta: f64,
    /// Innovation standard deviation
    sigma: f64,
    /// Last centered observation on the differenced scale
    last_x: f64,
    /// Last innovation on the differenced scale
    last_e: f64,
    /// Last observed level, for integrating d=1 forecasts
    last_level: f64,
}

impl ArimaModel {
    /// Fit with an explicit or auto-selected (p, d, q) order
    pub fn fit(series: &Series, order: Option<(usize, usize, usize)>) -> Result<Self> {
        let n = series.len();
        if n < 2 {
            return Err(EngineError::InsufficientData { needed: 2, actual: n });
        }

        let values = series.values();
        let order = match order {
            Some((p, d, q)) => {
                if p > 1 || d > 1 || q > 1 {
                    return Err(EngineError::Configuration(format!(
                        "unsupported ARIMA order ({p},{d},{q}); p, d, q must each be 0 or 1"
                    )));
                }
                (p, d, q)
            }
            None => match adf_test(&values) {
                Some(outcome) => {
                    let d = if outcome.reject_unit_root { 0 } else { 1 };
                    info!(
                        "ADF statistic {:.3}: unit root {}, using d={}",
                        outcome.statistic,
                        if outcome.reject_unit_root { "rejected" } else { "not rejected" },
                        d
                    );
                    (1, d, 1)
                }
                None => {
                    warn!(
                        "ADF test unavailable for this series ({} observations); assuming non-stationary",
                        n
                    );
                    (1, 1, 1)
                }
            },
        };

        let (p, d, q) = order;
        let working: Vec<f64> = if d == 1 {
            values.windows(2).map(|w| w[1] - w[0]).collect()
        } else {
            values.clone()
        };

        let (mu, phi, theta, sigma, last_x, last_e) = fit_arma(&working, p, q);

        Ok(Self {
            order,
            mu,
            phi,
            theta,
            sigma,
            last_x,
            last_e,
            last_level: *values.last().expect("non-empty series"),
        })
    }

    /// Selected (p, d, q) order
    pub fn order(&self) -> (usize, usize, usize) {
        self.order
    }

    /// Project `horizon` periods past the last observation
    pub fn forecast(&self, horizon: usize) -> Vec<ForecastPoint> {
        let d = self.order.1;

        // Point forecasts on the (possibly differenced) scale
        let mut xhat = Vec::with_capacity(horizon);
        let mut prev = self.phi * self.last_x + self.theta * self.last_e;
        for h in 0..horizon {
            if h > 0 {
                prev *= self.phi;
            }
            xhat.push(prev);
        }

        // psi_0 = 1, psi_j = phi^(j-1) (phi + theta)
        let mut psi = Vec::with_capacity(horizon);
        psi.push(1.0);
        for j in 1..horizon {
            psi.push(self.phi.powi(j as i32 - 1) * (self.phi + self.theta));
        }

        let mut points = Vec::with_capacity(horizon);
        let mut level = self.last_level;
        let mut psi_cum = 0.0;
        let mut var = 0.0;
        for h in 0..horizon {
            let step = self.mu + xhat[h];
            let estimate = if d == 1 {
                level += step;
                level
            } else {
                step
            };

            if d == 1 {
                // Cumulated psi-weights drive the integrated forecast variance
                psi_cum += psi[h];
                var += psi_cum * psi_cum;
            } else {
                var += psi[h] * psi[h];
            }
            let half_width = INTERVAL_Z * self.sigma * var.sqrt();

            points.push(ForecastPoint::symmetric(h as u32 + 1, estimate, half_width));
        }
        points
    }
}

/// Method-of-moments ARMA fit on a stationary working series
///
/// Returns (mu, phi, theta, sigma, last_x, last_e). Degenerates gracefully
/// to a white-noise model when the series is too short or flat.
fn fit_arma(working: &[f64], p: usize, q: usize) -> (f64, f64, f64, f64, f64, f64) {
    let m = working.len();
    let mu = if m > 0 { working.iter().sum::<f64>() / m as f64 } else { 0.0 };
    let centered: Vec<f64> = working.iter().map(|&w| w - mu).collect();

    if m < 3 {
        let last_x = centered.last().copied().unwrap_or(0.0);
        return (mu, 0.0, 0.0, 0.0, last_x, 0.0);
    }

    let autocov = |lag: usize| -> f64 {
        centered[lag..]
            .iter()
            .zip(&centered[..m - lag])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / m as f64
    };

    let r0 = autocov(0);
    let (phi, theta) = if r0 > 1e-12 {
        let rho1 = autocov(1) / r0;
        let rho2 = autocov(2) / r0;

        let phi = if p == 1 && rho1.abs() > 1e-9 {
            (rho2 / rho1).clamp(-COEFF_LIMIT, COEFF_LIMIT)
        } else {
            0.0
        };
        let theta = if q == 1 {
            solve_ma_coefficient(rho1, phi).clamp(-COEFF_LIMIT, COEFF_LIMIT)
        } else {
            0.0
        };
        (phi, theta)
    } else {
        (0.0, 0.0)
    };

    // Innovation recursion for sigma and the terminal state
    let mut residuals = Vec::with_capacity(m);
    let mut prev_e = 0.0;
    for t in 0..m {
        let e = if t == 0 {
            centered[0]
        } else {
            centered[t] - phi * centered[t - 1] - theta * prev_e
        };
        residuals.push(e);
        prev_e = e;
    }
    let sigma = (residuals.iter().map(|e| e * e).sum::<f64>() / (m - 1) as f64).sqrt();

    (mu, phi, theta, sigma, centered[m - 1], prev_e)
}

/// Solve the MA(1) coefficient from lag-1 autocorrelation given phi
///
/// `rho1 = (1 + phi*theta)(phi + theta) / (1 + 2*phi*theta + theta^2)`,
/// rearranged into a quadratic in theta; the invertible root is kept.
fn solve_ma_coefficient(rho1: f64, phi: f64) -> f64 {
    let a = phi - rho1;
    let b = 1.0 + phi * phi - 2.0 * rho1 * phi;
    let c = phi - rho1;

    if a.abs() < 1e-9 {
        return 0.0;
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return 0.0;
    }

    let root1 = (-b + disc.sqrt()) / (2.0 * a);
    let root2 = (-b - disc.sqrt()) / (2.0 * a);
    if root1.abs() < 1.0 {
        root1
    } else if root2.abs() < 1.0 {
        root2
    } else {
        0.0
    }
}
