use thiserror::Error;

/// Validation and contract errors exposed by `carbonwise-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required parameter '{field}' is missing")]
    MissingParam { field: &'static str },

    #[error("timestamp must be ISO 8601, e.g. 2024-01-01T08:00:00+01:00: '{value}'")]
    InvalidTimestamp { value: String },
    #[error("window start must be strictly before window end")]
    EmptyWindow,
    #[error("duration must be a positive number of minutes, got {minutes}")]
    NonPositiveDuration { minutes: i64 },
    #[error("duration of {minutes} minutes does not fit a {window_minutes} minute window")]
    DurationExceedsWindow { minutes: i64, window_minutes: i64 },

    #[error("allowed hours must look like 'H-H' with 0 <= start < end <= 23: '{value}'")]
    InvalidAllowedHours { value: String },

    #[error("location must be a non-empty alphanumeric code: '{value}'")]
    InvalidLocation { value: String },
    #[error("invalid provider '{value}', expected one of energy_charts, carbon_aware")]
    InvalidProvider { value: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
