//! Lowest-mean-intensity start selection inside a caller window.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::Duration;

use crate::clock::Clock;
use crate::{AllowedHours, Series, UtcDateTime};

/// Outcome classification for a best-start selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionStatus {
    #[serde(rename = "OK")]
    Ok,
    /// No sample falls inside the window.
    NoData,
    /// Samples exist but no full-duration start qualifies.
    NoCandidate,
    /// A best start exists but does not beat the baseline by `min_gain`.
    GainTooLow,
    InvalidWindow,
    InvalidDatetime,
    MissingParam,
    Error,
    Timeout,
}

impl SelectionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoData => "NoData",
            Self::NoCandidate => "NoCandidate",
            Self::GainTooLow => "GainTooLow",
            Self::InvalidWindow => "InvalidWindow",
            Self::InvalidDatetime => "InvalidDatetime",
            Self::MissingParam => "MissingParam",
            Self::Error => "Error",
            Self::Timeout => "Timeout",
        }
    }
}

impl Display for SelectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectionResult {
    pub status: SelectionStatus,
    pub best_start: Option<UtcDateTime>,
    pub best_end: Option<UtcDateTime>,
    /// Full-precision mean over the chosen sub-window.
    pub expected_avg_intensity: Option<f64>,
}

impl SelectionResult {
    pub const fn with_status(status: SelectionStatus) -> Self {
        Self {
            status,
            best_start: None,
            best_end: None,
            expected_avg_intensity: None,
        }
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self.status, SelectionStatus::Ok)
    }
}

/// Validated selection input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowRequest {
    pub window_start: UtcDateTime,
    pub window_end: UtcDateTime,
    pub duration: Duration,
    pub allowed_hours: Option<AllowedHours>,
    /// Required improvement over `now_intensity`; ignored unless both are set.
    pub min_gain: Option<f64>,
    pub now_intensity: Option<f64>,
}

impl WindowRequest {
    pub fn new(window_start: UtcDateTime, window_end: UtcDateTime, duration: Duration) -> Self {
        Self {
            window_start,
            window_end,
            duration,
            allowed_hours: None,
            min_gain: None,
            now_intensity: None,
        }
    }

    pub fn with_allowed_hours(mut self, allowed_hours: Option<AllowedHours>) -> Self {
        self.allowed_hours = allowed_hours;
        self
    }

    pub fn with_min_gain(mut self, min_gain: f64, now_intensity: Option<f64>) -> Self {
        self.min_gain = Some(min_gain);
        self.now_intensity = now_intensity;
        self
    }
}

/// Finds the start whose following `duration` has the lowest mean intensity.
///
/// Requires `series` sorted ascending: the scan stops at the first start
/// whose interval would overrun `window_end`. Ties keep the earlier start.
pub fn select_window(series: &Series, request: &WindowRequest, clock: &dyn Clock) -> SelectionResult {
    let samples = series.samples();
    let first = samples.partition_point(|s| s.timestamp < request.window_start);
    let last = samples.partition_point(|s| s.timestamp < request.window_end);
    let candidates = &samples[first..last];

    if candidates.is_empty() {
        return SelectionResult::with_status(SelectionStatus::NoData);
    }

    let mut best: Option<(UtcDateTime, UtcDateTime, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let t0 = candidate.timestamp;
        // An unrepresentable end overruns any window end.
        let Some(t_end) = t0.checked_add(request.duration) else {
            break;
        };
        if t_end > request.window_end {
            break;
        }

        if let Some(hours) = request.allowed_hours {
            if !hours.contains(clock.local_hour(t0)) {
                continue;
            }
        }

        let (sum, count) = candidates[index..]
            .iter()
            .take_while(|s| s.timestamp < t_end)
            .fold((0.0_f64, 0_usize), |(sum, count), s| (sum + s.intensity, count + 1));
        if count == 0 {
            continue;
        }

        let avg = sum / count as f64;
        if best.map_or(true, |(_, _, best_avg)| avg < best_avg) {
            best = Some((t0, t_end, avg));
        }
    }

    let Some((best_start, best_end, best_avg)) = best else {
        return SelectionResult::with_status(SelectionStatus::NoCandidate);
    };

    if let (Some(min_gain), Some(now_intensity)) = (request.min_gain, request.now_intensity) {
        if now_intensity - best_avg < min_gain {
            return SelectionResult {
                status: SelectionStatus::GainTooLow,
                best_start: Some(best_start),
                best_end: None,
                expected_avg_intensity: Some(best_avg),
            };
        }
    }

    SelectionResult {
        status: SelectionStatus::Ok,
        best_start: Some(best_start),
        best_end: Some(best_end),
        expected_avg_intensity: Some(best_avg),
    }
}
