use serde::{Deserialize, Serialize};

use crate::series::{DataPoint, DatedSeries, SampleBoundary, Series, Window};
use crate::{StatArbError, StatArbResult};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Coefficients of `Y = alpha + beta * X` fitted over the in-sample window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    /// Pearson correlation of X and Y
    pub rho: f64,
    /// Intercept
    pub alpha: f64,
    /// Slope (hedge ratio)
    pub beta: f64,
    /// Number of paired in-sample observations
    pub observations: usize,
}

/// Mediator between a dependent series Y and an independent series X.
///
/// The two series are walked pairwise in date order; callers keep them
/// aligned (same length, same dates). The estimator owns both series so the
/// boundary can only move through [`OlsEstimator::set_sample_boundary`],
/// which refits.
#[derive(Debug, Clone)]
pub struct OlsEstimator<Y: Series = DatedSeries, X: Series = DatedSeries> {
    y: Y,
    x: X,
    fit: OlsFit,
}

// Relative tolerance below which a sum of squared deviations counts as zero.
const VARIANCE_EPSILON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl<Y: Series, X: Series> OlsEstimator<Y, X> {
    /// Fit Y on X over the in-sample window.
    pub fn new(y: Y, x: X) -> StatArbResult<Self> {
        let fit = fit_in_sample(&y, &x)?;
        Ok(Self { y, x, fit })
    }

    /// Re-estimate from the current in-sample window. The previous fit is
    /// kept if the new one is degenerate.
    pub fn refit(&mut self) -> StatArbResult<OlsFit> {
        self.fit = fit_in_sample(&self.y, &self.x)?;
        Ok(self.fit)
    }

    /// Move the boundary of both series and refit (walk-forward
    /// recalibration). A degenerate refit restores the previous boundaries.
    pub fn set_sample_boundary(&mut self, date: &str) -> StatArbResult<OlsFit> {
        let previous_y = self.y.sample_boundary().cloned();
        let previous_x = self.x.sample_boundary().cloned();
        self.y.set_sample_boundary(date)?;
        self.x.set_sample_boundary(date)?;

        match fit_in_sample(&self.y, &self.x) {
            Ok(fit) => {
                self.fit = fit;
                Ok(fit)
            }
            Err(e) => {
                restore_boundary(&mut self.y, previous_y)?;
                restore_boundary(&mut self.x, previous_x)?;
                Err(e)
            }
        }
    }

    /// Residuals `Y(t) - alpha - beta * X(t)` over the full paired range,
    /// carrying Y's sample boundary.
    pub fn residuals(&self, name: &str) -> DatedSeries {
        let mut residuals = DatedSeries::new(name);
        let pairs = self
            .y
            .points(Window::Full)
            .zip(self.x.points(Window::Full));
        for ((ts, py), (_, px)) in pairs {
            let r = py.value() - self.fit.alpha - self.fit.beta * px.value();
            residuals.insert_point(ts, DataPoint::new(py.date(), r));
        }
        residuals.set_boundary(self.y.sample_boundary().cloned());
        residuals
    }

    pub fn fit(&self) -> OlsFit {
        self.fit
    }

    pub fn rho(&self) -> f64 {
        self.fit.rho
    }

    pub fn alpha(&self) -> f64 {
        self.fit.alpha
    }

    pub fn beta(&self) -> f64 {
        self.fit.beta
    }

    pub fn y(&self) -> &Y {
        &self.y
    }

    pub fn x(&self) -> &X {
        &self.x
    }

    pub fn into_parts(self) -> (Y, X) {
        (self.y, self.x)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn restore_boundary<S: Series>(
    series: &mut S,
    boundary: Option<SampleBoundary>,
) -> StatArbResult<()> {
    match boundary {
        Some(b) => series.set_sample_boundary(&b.date),
        None => {
            series.clear_sample_boundary();
            Ok(())
        }
    }
}

fn is_zero_spread(centered: f64, scale: f64) -> bool {
    !(centered > VARIANCE_EPSILON * scale.max(f64::MIN_POSITIVE))
}

/// Closed-form OLS over the paired in-sample windows.
fn fit_in_sample<Y, X>(y: &Y, x: &X) -> StatArbResult<OlsFit>
where
    Y: Series + ?Sized,
    X: Series + ?Sized,
{
    let mut n = 0usize;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0, 0.0, 0.0);

    for ((_, py), (_, px)) in y.points(Window::InSample).zip(x.points(Window::InSample)) {
        let (vy, vx) = (py.value(), px.value());
        n += 1;
        sum_x += vx;
        sum_y += vy;
        sum_xy += vx * vy;
        sum_x2 += vx * vx;
        sum_y2 += vy * vy;
    }

    if n < 2 {
        return Err(StatArbError::DegenerateRegression(format!(
            "{} on {} needs at least 2 in-sample observations, got {}",
            y.name(),
            x.name(),
            n
        )));
    }

    let nf = n as f64;
    let sxx = nf * sum_x2 - sum_x * sum_x;
    let syy = nf * sum_y2 - sum_y * sum_y;
    let sxy = nf * sum_xy - sum_x * sum_y;

    if is_zero_spread(sxx, nf * sum_x2) {
        return Err(StatArbError::DegenerateRegression(format!(
            "{} has zero variance over the in-sample window",
            x.name()
        )));
    }
    if is_zero_spread(syy, nf * sum_y2) {
        return Err(StatArbError::DegenerateRegression(format!(
            "{} has zero variance over the in-sample window; correlation is undefined",
            y.name()
        )));
    }

    let beta = sxy / sxx;
    let alpha = (sum_y - beta * sum_x) / nf;
    let rho = sxy / (sxx * syy).sqrt();

    tracing::debug!(y = %y.name(), x = %x.name(), n, alpha, beta, rho, "fitted OLS");

    Ok(OlsFit {
        rho,
        alpha,
        beta,
        observations: n,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
