use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatArbError {
    #[error("Malformed date '{input}': {reason}")]
    MalformedDate { input: String, reason: String },

    #[error("Degenerate regression: {0}")]
    DegenerateRegression(String),

    #[error("Empty window: {statistic} needs at least {required} observations, got {actual}")]
    EmptyWindow {
        statistic: String,
        required: usize,
        actual: usize,
    },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for StatArbError {
    fn from(e: serde_json::Error) -> Self {
        StatArbError::SerializationError(e.to_string())
    }
}
