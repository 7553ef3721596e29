use std::cell::Cell;

use crate::{StatArbError, StatArbResult};

use super::{DatedSeries, Points, SampleBoundary, Series, SeriesView, Window};

/// Memoised statistics. `None` marks a statistic as stale.
#[derive(Debug, Clone, Default)]
struct StatCache {
    series_mean: Cell<Option<f64>>,
    series_sd: Cell<Option<f64>>,
    sample_mean: Cell<Option<f64>>,
    sample_sd: Cell<Option<f64>>,
}

impl StatCache {
    fn invalidate_series(&self) {
        self.series_mean.set(None);
        self.series_sd.set(None);
    }

    fn invalidate_sample(&self) {
        self.sample_mean.set(None);
        self.sample_sd.set(None);
    }
}

/// A series (typically regression residuals) that caches its mean and
/// population standard deviation over the full series and the in-sample
/// window. Any successful insert or value update, and every boundary change,
/// marks the affected statistics stale.
#[derive(Debug, Clone, Default)]
pub struct SpreadSeries<S: Series = DatedSeries> {
    view: SeriesView<S>,
    cache: StatCache,
}

impl<S: Series> SpreadSeries<S> {
    pub fn new(inner: S) -> Self {
        Self {
            view: SeriesView::new(inner),
            cache: StatCache::default(),
        }
    }

    pub fn inner(&self) -> &S {
        self.view.inner()
    }

    pub fn into_inner(self) -> S {
        self.view.into_inner()
    }

    /// Mean over the full series.
    pub fn mean(&self) -> StatArbResult<f64> {
        cached(&self.cache.series_mean, || self.window_mean(Window::Full))
    }

    /// Population standard deviation over the full series.
    pub fn stddev(&self) -> StatArbResult<f64> {
        cached(&self.cache.series_sd, || self.window_stddev(Window::Full))
    }

    /// Mean over the in-sample window; equals [`Self::mean`] with no boundary.
    pub fn sample_mean(&self) -> StatArbResult<f64> {
        if self.sample_boundary().is_none() {
            return self.mean();
        }
        cached(&self.cache.sample_mean, || self.window_mean(Window::InSample))
    }

    /// Population standard deviation over the in-sample window.
    pub fn sample_stddev(&self) -> StatArbResult<f64> {
        if self.sample_boundary().is_none() {
            return self.stddev();
        }
        cached(&self.cache.sample_sd, || self.window_stddev(Window::InSample))
    }

    fn moments(&self, window: Window) -> (usize, f64, f64) {
        self.points(window)
            .fold((0, 0.0, 0.0), |(n, sum, sum_sq), (_, dp)| {
                let v = dp.value();
                (n + 1, sum + v, sum_sq + v * v)
            })
    }

    fn window_mean(&self, window: Window) -> StatArbResult<f64> {
        let (n, sum, _) = self.moments(window);
        if n == 0 {
            return Err(StatArbError::EmptyWindow {
                statistic: format!("{} mean ({:?})", self.name(), window),
                required: 1,
                actual: 0,
            });
        }
        let mean = sum / n as f64;
        tracing::debug!(series = %self.name(), ?window, mean, "recomputed mean");
        Ok(mean)
    }

    fn window_stddev(&self, window: Window) -> StatArbResult<f64> {
        let (n, sum, sum_sq) = self.moments(window);
        if n < 2 {
            return Err(StatArbError::EmptyWindow {
                statistic: format!("{} standard deviation ({:?})", self.name(), window),
                required: 2,
                actual: n,
            });
        }
        let mean = sum / n as f64;
        // E[x^2] - E[x]^2 can dip just below zero for a near-constant window
        let variance = (sum_sq / n as f64 - mean * mean).max(0.0);
        let sd = variance.sqrt();
        tracing::debug!(series = %self.name(), ?window, sd, "recomputed standard deviation");
        Ok(sd)
    }
}

fn cached(
    cell: &Cell<Option<f64>>,
    compute: impl FnOnce() -> StatArbResult<f64>,
) -> StatArbResult<f64> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = compute()?;
    cell.set(Some(value));
    Ok(value)
}

impl<S: Series> Series for SpreadSeries<S> {
    fn name(&self) -> &str {
        self.view.name()
    }

    fn insert(&mut self, date: &str, value: f64) -> StatArbResult<bool> {
        let inserted = self.view.insert(date, value)?;
        if inserted {
            self.cache.invalidate_series();
            self.cache.invalidate_sample();
        }
        Ok(inserted)
    }

    fn set_value(&mut self, date: &str, value: f64) -> StatArbResult<bool> {
        let updated = self.view.set_value(date, value)?;
        if updated {
            self.cache.invalidate_series();
            self.cache.invalidate_sample();
        }
        Ok(updated)
    }

    fn set_sample_boundary(&mut self, date: &str) -> StatArbResult<()> {
        self.view.set_sample_boundary(date)?;
        self.cache.invalidate_sample();
        Ok(())
    }

    fn clear_sample_boundary(&mut self) {
        self.view.clear_sample_boundary();
        self.cache.invalidate_sample();
    }

    fn sample_boundary(&self) -> Option<&SampleBoundary> {
        self.view.sample_boundary()
    }

    fn len(&self) -> usize {
        self.view.len()
    }

    fn in_sample_len(&self) -> usize {
        self.view.in_sample_len()
    }

    fn points(&self, window: Window) -> Points<'_> {
        self.view.points(window)
    }
}
