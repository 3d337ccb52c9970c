//! Request and response shapes exposed to hosts.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Clock;
use crate::data_source::{SourceError, SourceErrorKind};
use crate::optimizer::{SelectionResult, SelectionStatus};
use crate::resolver::{round2, ResolvedValue, ValueProvenance};
use crate::{AllowedHours, CoreError, ProviderId, Provenance, UtcDateTime, ValidationError};

/// Job duration used when the request leaves it out.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Best-start request as received from a host. Every field is optional at
/// this level so that validation failures become statuses, not faults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestStartRequest {
    /// ISO 8601; an offset is optional.
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    /// Defaults to 60 when absent.
    pub duration_minutes: Option<i64>,
    /// `"H-H"` in local time; malformed values mean no restriction.
    pub allowed_hours: Option<String>,
    /// Required improvement over the current intensity, in gCO2eq/kWh.
    pub min_gain: Option<f64>,
}

impl BestStartRequest {
    /// Request with a window and duration and no optional constraints.
    pub fn new(
        window_start: impl Into<String>,
        window_end: impl Into<String>,
        duration_minutes: i64,
    ) -> Self {
        Self {
            window_start: Some(window_start.into()),
            window_end: Some(window_end.into()),
            duration_minutes: Some(duration_minutes),
            ..Self::default()
        }
    }

    /// Restricts candidate starts to a local-hour range such as `"8-20"`.
    pub fn with_allowed_hours(mut self, allowed_hours: impl Into<String>) -> Self {
        self.allowed_hours = Some(allowed_hours.into());
        self
    }

    /// Sets the required improvement over the current intensity.
    pub fn with_min_gain(mut self, min_gain: f64) -> Self {
        self.min_gain = Some(min_gain);
        self
    }

    /// Decodes host service data, e.g. `{"window_start": "...", "duration_minutes": 90}`.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Checks the request and converts it into typed values.
    ///
    /// Timestamps without an offset are read in the local time of `clock`.
    /// A duration longer than the window is rejected, so the interval
    /// arithmetic downstream stays in range.
    pub fn validate(&self, clock: &dyn Clock) -> Result<ValidatedRequest, ValidationError> {
        let raw_start = self
            .window_start
            .as_deref()
            .ok_or(ValidationError::MissingParam { field: "window_start" })?;
        let raw_end = self
            .window_end
            .as_deref()
            .ok_or(ValidationError::MissingParam { field: "window_end" })?;

        let local_offset = |at: UtcDateTime| clock.local_offset_at(at);
        let window_start = UtcDateTime::parse_with_local_offset(raw_start, local_offset)?;
        let window_end = UtcDateTime::parse_with_local_offset(raw_end, local_offset)?;
        if window_start >= window_end {
            return Err(ValidationError::EmptyWindow);
        }

        let duration_minutes = self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        if duration_minutes <= 0 {
            return Err(ValidationError::NonPositiveDuration {
                minutes: duration_minutes,
            });
        }
        let window_minutes = (window_end - window_start).whole_minutes();
        if duration_minutes > window_minutes {
            return Err(ValidationError::DurationExceedsWindow {
                minutes: duration_minutes,
                window_minutes,
            });
        }

        let mut warnings = Vec::new();
        let allowed_hours = match self.allowed_hours.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<AllowedHours>() {
                Ok(hours) => Some(hours),
                Err(error) => {
                    warn!(allowed_hours = raw, "ignoring malformed allowed hours");
                    warnings.push(format!("{error}; no hour restriction applied"));
                    None
                }
            },
        };

        Ok(ValidatedRequest {
            window_start,
            window_end,
            duration_minutes,
            allowed_hours,
            min_gain: self.min_gain,
            warnings,
        })
    }
}

/// Best-start request after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub window_start: UtcDateTime,
    pub window_end: UtcDateTime,
    pub duration_minutes: i64,
    pub allowed_hours: Option<AllowedHours>,
    pub min_gain: Option<f64>,
    /// Non-fatal problems found while validating, e.g. ignored allowed hours.
    pub warnings: Vec<String>,
}

impl ValidatedRequest {
    /// Job duration. Never longer than the window.
    pub fn duration(&self) -> time::Duration {
        time::Duration::minutes(self.duration_minutes)
    }
}

/// Status reported for a validation failure.
pub fn validation_status(error: &ValidationError) -> SelectionStatus {
    match error {
        ValidationError::MissingParam { .. } => SelectionStatus::MissingParam,
        ValidationError::InvalidTimestamp { .. } => SelectionStatus::InvalidDatetime,
        ValidationError::EmptyWindow
        | ValidationError::NonPositiveDuration { .. }
        | ValidationError::DurationExceedsWindow { .. } => SelectionStatus::InvalidWindow,
        ValidationError::InvalidAllowedHours { .. }
        | ValidationError::InvalidLocation { .. }
        | ValidationError::InvalidProvider { .. } => SelectionStatus::Error,
    }
}

/// Status reported when a provider call fails outright.
pub fn failure_status(error: &SourceError) -> SelectionStatus {
    match error.kind() {
        SourceErrorKind::Timeout => SelectionStatus::Timeout,
        _ => SelectionStatus::Error,
    }
}

/// Best-start outcome with the request context echoed back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestStartResponse {
    pub status: SelectionStatus,
    /// Which path produced the answer.
    pub source: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    pub best_start: Option<UtcDateTime>,
    pub best_end: Option<UtcDateTime>,
    /// Rounded to two decimals.
    pub expected_avg_intensity: Option<f64>,
    /// Request echo, as received.
    pub start: Option<String>,
    pub end: Option<String>,
    pub runtime_minutes: Option<i64>,
    pub location: String,
    pub cache_hit: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl BestStartResponse {
    /// Empty `Error` response echoing `request`. Callers fill in the outcome.
    pub fn for_request(request: &BestStartRequest, location: &str) -> Self {
        Self {
            status: SelectionStatus::Error,
            source: Provenance::Primary,
            provider: None,
            best_start: None,
            best_end: None,
            expected_avg_intensity: None,
            start: request.window_start.clone(),
            end: request.window_end.clone(),
            runtime_minutes: request.duration_minutes,
            location: location.to_owned(),
            cache_hit: false,
            warnings: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: SelectionStatus) -> Self {
        self.status = status;
        self
    }

    /// Records the provenance and the provider that answered.
    pub fn with_source(mut self, source: Provenance, provider: ProviderId) -> Self {
        self.source = source;
        self.provider = Some(provider);
        self
    }

    /// Copies status, interval and rounded mean from an optimizer result.
    pub fn with_selection(mut self, selection: &SelectionResult) -> Self {
        self.status = selection.status;
        self.best_start = selection.best_start;
        self.best_end = selection.best_end;
        self.expected_avg_intensity = selection.expected_avg_intensity.map(round2);
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn is_ok(&self) -> bool {
        self.status == SelectionStatus::Ok
    }
}

/// Outcome classification for a current-value request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueStatus {
    #[serde(rename = "OK")]
    Ok,
    NoData,
    Error,
    Timeout,
}

impl ValueStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoData => "NoData",
            Self::Error => "Error",
            Self::Timeout => "Timeout",
        }
    }

    /// `Timeout` for deadline failures, `Error` otherwise.
    pub fn from_failure(error: &SourceError) -> Self {
        match error.kind() {
            SourceErrorKind::Timeout => Self::Timeout,
            _ => Self::Error,
        }
    }
}

impl Display for ValueStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current intensity for the configured location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentValueResponse {
    pub status: ValueStatus,
    pub value: Option<f64>,
    pub timestamp: Option<UtcDateTime>,
    pub provenance: Option<ValueProvenance>,
    pub location: String,
    /// Served from an entry older than the cache TTL.
    pub stale: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CurrentValueResponse {
    /// Response carrying only a status.
    pub fn empty(status: ValueStatus, location: &str) -> Self {
        Self {
            status,
            value: None,
            timestamp: None,
            provenance: None,
            location: location.to_owned(),
            stale: false,
            warnings: Vec::new(),
        }
    }

    pub fn resolved(resolved: ResolvedValue, location: &str) -> Self {
        Self {
            status: ValueStatus::Ok,
            value: Some(resolved.value),
            timestamp: Some(resolved.timestamp),
            provenance: Some(resolved.provenance),
            ..Self::empty(ValueStatus::Ok, location)
        }
    }
}
