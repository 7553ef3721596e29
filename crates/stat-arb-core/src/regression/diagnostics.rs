use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use super::OlsFit;

/// Stationarity and significance read-outs for an in-sample spread.
///
/// Reported alongside a backtest; the signal engine never trades on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadDiagnostics {
    /// Dickey-Fuller t-statistic of the lagged spread (more negative = more
    /// evidence of mean reversion)
    pub adf_statistic: Option<f64>,
    /// AR(1) mean-reversion half-life in periods
    pub half_life: Option<f64>,
    /// Two-sided p-value of the in-sample correlation
    pub correlation_p_value: Option<f64>,
}

impl SpreadDiagnostics {
    pub fn analyze(spread: &[f64], fit: &OlsFit) -> Self {
        Self {
            adf_statistic: adf_statistic(spread),
            half_life: half_life(spread),
            correlation_p_value: correlation_p_value(fit.rho, fit.observations),
        }
    }
}

/// Regress `dS_t = a + b * S_{t-1}` and return the t-statistic of `b`.
pub fn adf_statistic(spread: &[f64]) -> Option<f64> {
    let n = spread.len();
    if n < 4 {
        return None;
    }
    let m = (n - 1) as f64;

    let (mut sum_lag, mut sum_ds, mut sum_lag2, mut sum_lag_ds) = (0.0, 0.0, 0.0, 0.0);
    for w in spread.windows(2) {
        let (lag, ds) = (w[0], w[1] - w[0]);
        sum_lag += lag;
        sum_ds += ds;
        sum_lag2 += lag * lag;
        sum_lag_ds += lag * ds;
    }

    let mean_lag = sum_lag / m;
    let mean_ds = sum_ds / m;
    let var_lag = sum_lag2 / m - mean_lag * mean_lag;
    if var_lag <= 0.0 {
        return None;
    }
    let beta = (sum_lag_ds / m - mean_lag * mean_ds) / var_lag;
    let alpha = mean_ds - beta * mean_lag;

    let sse: f64 = spread
        .windows(2)
        .map(|w| {
            let e = (w[1] - w[0]) - alpha - beta * w[0];
            e * e
        })
        .sum();
    let residual_var = sse / (m - 2.0);
    let se_beta = (residual_var / (var_lag * m)).sqrt();
    if se_beta <= 0.0 || !se_beta.is_finite() {
        return None;
    }
    Some(beta / se_beta)
}

/// `-ln(2) / ln(phi)` for the AR(1) coefficient `phi` of the spread.
/// `None` unless `0 < phi < 1`.
pub fn half_life(spread: &[f64]) -> Option<f64> {
    let n = spread.len();
    if n < 3 {
        return None;
    }
    let m = (n - 1) as f64;

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for w in spread.windows(2) {
        sum_x += w[0];
        sum_y += w[1];
        sum_xy += w[0] * w[1];
        sum_x2 += w[0] * w[0];
    }

    let denom = m * sum_x2 - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }
    let phi = (m * sum_xy - sum_x * sum_y) / denom;
    if phi <= 0.0 || phi >= 1.0 {
        return None;
    }
    Some(-std::f64::consts::LN_2 / phi.ln())
}

/// Student-t test of `rho = 0` with `n - 2` degrees of freedom.
pub fn correlation_p_value(rho: f64, n: usize) -> Option<f64> {
    if n <= 2 || !rho.is_finite() {
        return None;
    }
    let r2 = rho * rho;
    if r2 >= 1.0 {
        return Some(0.0);
    }
    let df = (n - 2) as f64;
    let t = rho * (df / (1.0 - r2)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| match i % 4 {
                0 => 1.0,
                1 => -1.0,
                2 => 0.5,
                _ => -0.5,
            })
            .collect()
    }

    #[test]
    fn test_adf_mean_reverting_is_negative() {
        let stat = adf_statistic(&alternating(40)).unwrap();
        assert!(stat < 0.0);
    }

    #[test]
    fn test_adf_needs_observations() {
        assert!(adf_statistic(&[1.0, 2.0, 1.5]).is_none());
        assert!(adf_statistic(&[3.0; 10]).is_none());
    }

    #[test]
    fn test_half_life_of_geometric_decay() {
        // S_t = 0.5 * S_{t-1}: half-life of exactly one period
        let spread: Vec<f64> = (0..12).map(|i| 64.0 * 0.5f64.powi(i)).collect();
        let hl = half_life(&spread).unwrap();
        assert!((hl - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_half_life_requires_persistence() {
        // Sign-flipping series has phi < 0
        assert!(half_life(&alternating(20)).is_none());
    }

    #[test]
    fn test_correlation_p_value_bounds() {
        assert_eq!(correlation_p_value(1.0, 10), Some(0.0));
        assert!(correlation_p_value(0.5, 2).is_none());
        let weak = correlation_p_value(0.05, 12).unwrap();
        let strong = correlation_p_value(0.95, 12).unwrap();
        assert!(weak > 0.5);
        assert!(strong < 0.001);
    }

    #[test]
    fn test_zero_correlation_p_value_is_one() {
        let p = correlation_p_value(0.0, 30).unwrap();
        assert!((p - 1.0).abs() < 1e-9);
    }
}
