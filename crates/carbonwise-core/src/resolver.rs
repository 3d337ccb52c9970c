//! Single "current" intensity value from an irregular grid.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{GridPoint, IntensityGrid, SampleOrigin, UtcDateTime};

/// How a current value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueProvenance {
    Interpolated,
    Actual,
    Forecast,
    /// Reported directly by a current-intensity provider.
    Provider,
}

impl ValueProvenance {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interpolated => "interpolated",
            Self::Actual => "actual",
            Self::Forecast => "forecast",
            Self::Provider => "provider",
        }
    }
}

impl From<SampleOrigin> for ValueProvenance {
    fn from(origin: SampleOrigin) -> Self {
        match origin {
            SampleOrigin::Actual => Self::Actual,
            SampleOrigin::Forecast => Self::Forecast,
        }
    }
}

impl Display for ValueProvenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedValue {
    /// Rounded to two decimals.
    pub value: f64,
    pub timestamp: UtcDateTime,
    pub provenance: ValueProvenance,
    /// Grid index the value was read from; for interpolation, the left point.
    pub index: Option<usize>,
}

/// Rounds to two decimal places for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Resolves the value at `now`.
///
/// Order: interpolation between the bracketing pair, nearest earlier actual,
/// nearest later forecast, then any nearest value. Before the first point
/// the first forecast is used; at or after the last point the latest usable
/// value is used. `None` only when no point carries a value.
pub fn resolve_current(grid: &IntensityGrid, now: UtcDateTime) -> Option<ResolvedValue> {
    let points = grid.points();
    let first = points.first()?;

    if now < first.timestamp {
        return find_forward(points, 0, |p| p.forecast.map(|v| (v, SampleOrigin::Forecast)))
            .or_else(|| find_forward(points, 0, GridPoint::value));
    }

    // Latest point at or before `now`; exists because now >= first.timestamp.
    let pos = points.partition_point(|p| p.timestamp <= now) - 1;
    let at = &points[pos];

    if pos + 1 == points.len() {
        return find_backward(points, pos, GridPoint::value);
    }

    if at.timestamp == now {
        if let Some((value, origin)) = at.value() {
            return Some(exact(pos, at.timestamp, value, origin));
        }
    }

    let next = &points[pos + 1];
    if let (Some((left, _)), Some((right, _))) = (at.value(), next.value()) {
        let span = (next.timestamp - at.timestamp).as_seconds_f64();
        let offset = (now - at.timestamp).as_seconds_f64();
        let fraction = if span > 0.0 { offset / span } else { 0.0 };
        return Some(ResolvedValue {
            value: round2(left + (right - left) * fraction),
            timestamp: now,
            provenance: ValueProvenance::Interpolated,
            index: Some(pos),
        });
    }

    find_backward(points, pos, |p| p.actual.map(|v| (v, SampleOrigin::Actual)))
        .or_else(|| find_forward(points, pos, |p| p.forecast.map(|v| (v, SampleOrigin::Forecast))))
        .or_else(|| find_backward(points, pos, GridPoint::value))
        .or_else(|| find_forward(points, pos, GridPoint::value))
}

fn exact(index: usize, timestamp: UtcDateTime, value: f64, origin: SampleOrigin) -> ResolvedValue {
    ResolvedValue {
        value: round2(value),
        timestamp,
        provenance: origin.into(),
        index: Some(index),
    }
}

fn find_backward<F>(points: &[GridPoint], from: usize, pick: F) -> Option<ResolvedValue>
where
    F: Fn(&GridPoint) -> Option<(f64, SampleOrigin)>,
{
    points[..=from]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, point)| pick(point).map(|(v, origin)| exact(index, point.timestamp, v, origin)))
}

fn find_forward<F>(points: &[GridPoint], from: usize, pick: F) -> Option<ResolvedValue>
where
    F: Fn(&GridPoint) -> Option<(f64, SampleOrigin)>,
{
    points
        .iter()
        .enumerate()
        .skip(from)
        .find_map(|(index, point)| pick(point).map(|(v, origin)| exact(index, point.timestamp, v, origin)))
}
