use serde::{Deserialize, Serialize};

/// One observation of a series. Only the owning series can change its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    date: String,
    value: f64,
}

impl DataPoint {
    pub fn new(date: impl Into<String>, value: f64) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = value;
    }
}
