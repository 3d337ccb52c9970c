use serde::{Deserialize, Serialize};

use crate::UtcDateTime;

/// Which payload column an intensity value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleOrigin {
    Actual,
    Forecast,
}

/// One point of the raw provider grid. Either column may be null.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub timestamp: UtcDateTime,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
}

impl GridPoint {
    /// Actual value if present, else forecast.
    pub fn value(&self) -> Option<(f64, SampleOrigin)> {
        self.actual
            .map(|value| (value, SampleOrigin::Actual))
            .or_else(|| self.forecast.map(|value| (value, SampleOrigin::Forecast)))
    }
}

/// Sorted, timestamp-unique grid including points with no usable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntensityGrid {
    points: Vec<GridPoint>,
}

impl IntensityGrid {
    /// Sorts ascending and collapses duplicate timestamps.
    ///
    /// A later duplicate replaces the earlier one unless it carries no usable
    /// value while the earlier one does.
    pub fn from_points(mut points: Vec<GridPoint>) -> Self {
        points.sort_by_key(|point| point.timestamp);

        let mut unique: Vec<GridPoint> = Vec::with_capacity(points.len());
        for point in points {
            match unique.last_mut() {
                Some(last) if last.timestamp == point.timestamp => {
                    if point.value().is_some() || last.value().is_none() {
                        *last = point;
                    }
                }
                _ => unique.push(point),
            }
        }

        Self { points: unique }
    }

    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Single usable intensity reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: UtcDateTime,
    /// Mass per energy, typically gCO2eq/kWh. Not range checked.
    pub intensity: f64,
    pub origin: SampleOrigin,
}

/// Ordered run of samples with strictly increasing timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    /// Sorts ascending by timestamp; for duplicates the last one given wins.
    pub fn from_samples(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|sample| sample.timestamp);

        let mut unique: Vec<Sample> = Vec::with_capacity(samples.len());
        for sample in samples {
            match unique.last_mut() {
                Some(last) if last.timestamp == sample.timestamp => *last = sample,
                _ => unique.push(sample),
            }
        }

        Self { samples: unique }
    }

    /// Keeps the grid points that have a usable value. Gaps are dropped.
    pub fn from_grid(grid: &IntensityGrid) -> Self {
        let samples = grid
            .points()
            .iter()
            .filter_map(|point| {
                point.value().map(|(intensity, origin)| Sample {
                    timestamp: point.timestamp,
                    intensity,
                    origin,
                })
            })
            .collect();

        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }
}
