use std::collections::BTreeMap;
use std::ops::Bound;

use crate::types::PricePoint;
use crate::{StatArbError, StatArbResult};

use super::{parse_date, DataPoint, Points, SampleBoundary, Series, Timestamp, Window};

/// Ordered date-to-value container with a single movable sample boundary.
#[derive(Debug, Clone, Default)]
pub struct DatedSeries {
    name: String,
    points: BTreeMap<Timestamp, DataPoint>,
    boundary: Option<SampleBoundary>,
}

impl DatedSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: BTreeMap::new(),
            boundary: None,
        }
    }

    /// Build a series from already-deduplicated observations.
    ///
    /// A repeated date is reported as `InvalidInput` rather than dropped.
    pub fn from_points<'a, I>(name: impl Into<String>, points: I) -> StatArbResult<Self>
    where
        I: IntoIterator<Item = &'a PricePoint>,
    {
        let mut series = Self::new(name);
        for point in points {
            if !series.insert(&point.date, point.value)? {
                return Err(StatArbError::InvalidInput {
                    field: format!("{}.points", series.name),
                    reason: format!("duplicate date {}", point.date),
                });
            }
        }
        Ok(series)
    }

    /// Insert at a known timestamp; used when deriving one series from another.
    pub(crate) fn insert_point(&mut self, timestamp: Timestamp, point: DataPoint) -> bool {
        if self.points.contains_key(&timestamp) {
            return false;
        }
        self.points.insert(timestamp, point);
        true
    }

    pub(crate) fn set_boundary(&mut self, boundary: Option<SampleBoundary>) {
        self.boundary = boundary;
    }

    pub fn get(&self, date: &str) -> StatArbResult<Option<&DataPoint>> {
        let (_, ts) = parse_date(date)?;
        Ok(self.points.get(&ts))
    }

    fn range(&self, window: Window) -> Points<'_> {
        let empty: Timestamp = 0;
        let range = match (window, &self.boundary) {
            (Window::Full, _) | (Window::InSample, None) => self.points.range(..),
            (Window::InSample, Some(b)) => self.points.range(..=b.timestamp),
            (Window::OutOfSample, None) => self.points.range(empty..empty),
            (Window::OutOfSample, Some(b)) => self
                .points
                .range((Bound::Excluded(b.timestamp), Bound::Unbounded)),
        };
        Points::new(range)
    }
}

impl Series for DatedSeries {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert(&mut self, date: &str, value: f64) -> StatArbResult<bool> {
        let (_, ts) = parse_date(date)?;
        Ok(self.insert_point(ts, DataPoint::new(date.trim(), value)))
    }

    fn set_value(&mut self, date: &str, value: f64) -> StatArbResult<bool> {
        let (_, ts) = parse_date(date)?;
        match self.points.get_mut(&ts) {
            Some(point) => {
                point.set_value(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_sample_boundary(&mut self, date: &str) -> StatArbResult<()> {
        self.boundary = Some(SampleBoundary::parse(date)?);
        Ok(())
    }

    fn clear_sample_boundary(&mut self) {
        self.boundary = None;
    }

    fn sample_boundary(&self) -> Option<&SampleBoundary> {
        self.boundary.as_ref()
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn in_sample_len(&self) -> usize {
        match &self.boundary {
            Some(_) => self.range(Window::InSample).count(),
            None => self.points.len(),
        }
    }

    fn points(&self, window: Window) -> Points<'_> {
        self.range(window)
    }
}
