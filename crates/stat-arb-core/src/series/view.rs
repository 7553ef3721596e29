use crate::StatArbResult;

use super::{DatedSeries, Points, SampleBoundary, Series, Window};

/// Read-through decorator over another series.
///
/// Every operation is forwarded to the inner series; wrappers that need to
/// maintain derived state hold a view and intercept the mutating calls.
#[derive(Debug, Clone, Default)]
pub struct SeriesView<S: Series = DatedSeries> {
    inner: S,
}

impl<S: Series> SeriesView<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Series> Series for SeriesView<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn insert(&mut self, date: &str, value: f64) -> StatArbResult<bool> {
        self.inner.insert(date, value)
    }

    fn set_value(&mut self, date: &str, value: f64) -> StatArbResult<bool> {
        self.inner.set_value(date, value)
    }

    fn set_sample_boundary(&mut self, date: &str) -> StatArbResult<()> {
        self.inner.set_sample_boundary(date)
    }

    fn clear_sample_boundary(&mut self) {
        self.inner.clear_sample_boundary()
    }

    fn sample_boundary(&self) -> Option<&SampleBoundary> {
        self.inner.sample_boundary()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn in_sample_len(&self) -> usize {
        self.inner.in_sample_len()
    }

    fn points(&self, window: Window) -> Points<'_> {
        self.inner.points(window)
    }
}
