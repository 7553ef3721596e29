//! Date-indexed series with a movable in-sample / out-of-sample boundary.
//!
//! [`Series`] is the capability set shared by the plain [`DatedSeries`] and
//! by decorators such as [`SeriesView`] and [`SpreadSeries`], so a spread
//! can be handed to anything that expects a generic series.

pub mod data_point;
pub mod dated;
pub mod spread;
pub mod view;

use std::collections::btree_map;
use std::iter::Rev;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::types::RunMode;
use crate::{StatArbError, StatArbResult};

pub use data_point::DataPoint;
pub use dated::DatedSeries;
pub use spread::SpreadSeries;
pub use view::SeriesView;

/// Seconds since the Unix epoch at midnight UTC of the observation date.
pub type Timestamp = i64;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an ISO `YYYY-MM-DD` date into its calendar date and timestamp.
pub fn parse_date(input: &str) -> StatArbResult<(NaiveDate, Timestamp)> {
    let date = NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|e| {
        StatArbError::MalformedDate {
            input: input.to_string(),
            reason: e.to_string(),
        }
    })?;
    let timestamp = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    Ok((date, timestamp))
}

/// End date (inclusive) of the in-sample period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleBoundary {
    pub date: String,
    pub timestamp: Timestamp,
}

impl SampleBoundary {
    pub fn parse(date: &str) -> StatArbResult<Self> {
        let (_, timestamp) = parse_date(date)?;
        Ok(Self {
            date: date.trim().to_string(),
            timestamp,
        })
    }
}

/// A slice of the series selected by the sample boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Full,
    InSample,
    OutOfSample,
}

impl From<RunMode> for Window {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::InSample => Window::InSample,
            RunMode::OutOfSample => Window::OutOfSample,
        }
    }
}

/// Chronological iterator over one window of a series.
///
/// Restartable by asking the series again; walk it backwards with `.rev()`.
#[derive(Debug, Clone)]
pub struct Points<'a> {
    inner: btree_map::Range<'a, Timestamp, DataPoint>,
}

impl<'a> Points<'a> {
    pub(crate) fn new(inner: btree_map::Range<'a, Timestamp, DataPoint>) -> Self {
        Self { inner }
    }
}

impl<'a> Iterator for Points<'a> {
    type Item = (Timestamp, &'a DataPoint);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(ts, dp)| (*ts, dp))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Points<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(ts, dp)| (*ts, dp))
    }
}

/// Capability set of a dated series.
///
/// Partition contract: with a boundary `b`, the in-sample window holds every
/// point with timestamp `<= b` and the out-of-sample window every point
/// with timestamp `> b`. Without a boundary the in-sample window is the
/// whole series and the out-of-sample window is empty.
pub trait Series {
    fn name(&self) -> &str;

    /// Add a point. `Ok(false)` (and no mutation) if the date is taken.
    fn insert(&mut self, date: &str, value: f64) -> StatArbResult<bool>;

    /// Overwrite the value at an existing date. `Ok(false)` if absent.
    fn set_value(&mut self, date: &str, value: f64) -> StatArbResult<bool>;

    /// Move the in-sample end date. The date need not be a key of the series.
    fn set_sample_boundary(&mut self, date: &str) -> StatArbResult<()>;

    fn clear_sample_boundary(&mut self);

    fn sample_boundary(&self) -> Option<&SampleBoundary>;

    fn len(&self) -> usize;

    fn in_sample_len(&self) -> usize;

    fn points(&self, window: Window) -> Points<'_>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn out_of_sample_len(&self) -> usize {
        self.len() - self.in_sample_len()
    }

    fn points_rev(&self, window: Window) -> Rev<Points<'_>> {
        self.points(window).rev()
    }

    fn first(&self, window: Window) -> Option<(Timestamp, &DataPoint)> {
        self.points(window).next()
    }

    fn last(&self, window: Window) -> Option<(Timestamp, &DataPoint)> {
        self.points(window).next_back()
    }

    fn values(&self, window: Window) -> Vec<f64> {
        self.points(window).map(|(_, dp)| dp.value()).collect()
    }
}

impl<S: Series + ?Sized> Series for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn insert(&mut self, date: &str, value: f64) -> StatArbResult<bool> {
        (**self).insert(date, value)
    }

    fn set_value(&mut self, date: &str, value: f64) -> StatArbResult<bool> {
        (**self).set_value(date, value)
    }

    fn set_sample_boundary(&mut self, date: &str) -> StatArbResult<()> {
        (**self).set_sample_boundary(date)
    }

    fn clear_sample_boundary(&mut self) {
        (**self).clear_sample_boundary()
    }

    fn sample_boundary(&self) -> Option<&SampleBoundary> {
        (**self).sample_boundary()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn in_sample_len(&self) -> usize {
        (**self).in_sample_len()
    }

    fn points(&self, window: Window) -> Points<'_> {
        (**self).points(window)
    }
}
