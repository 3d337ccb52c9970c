//! Normalization of raw `co2eq` payloads into grids and series.
//!
//! The payload holds three index-aligned arrays, `unix_seconds`, `co2eq`
//! (actual) and `co2eq_forecast`, which may differ in length. Missing or
//! malformed arrays are treated as empty; parsing never fails.

use serde_json::Value;

use crate::{GridPoint, IntensityGrid, Series, UtcDateTime};

const TIMESTAMPS_KEY: &str = "unix_seconds";
const ACTUAL_KEY: &str = "co2eq";
const FORECAST_KEY: &str = "co2eq_forecast";

/// Parses the payload into a sorted grid, keeping points with no value.
pub fn parse_co2eq_grid(payload: &Value) -> IntensityGrid {
    let timestamps = array(payload, TIMESTAMPS_KEY);
    let actual = array(payload, ACTUAL_KEY);
    let forecast = array(payload, FORECAST_KEY);

    let points = timestamps
        .iter()
        .enumerate()
        .filter_map(|(index, raw_ts)| {
            let timestamp = unix_seconds(raw_ts)?;
            Some(GridPoint {
                timestamp,
                actual: number_at(actual, index),
                forecast: number_at(forecast, index),
            })
        })
        .collect();

    IntensityGrid::from_points(points)
}

/// Parses the payload into usable samples: actual when present, else forecast.
pub fn parse_co2eq_series(payload: &Value) -> Series {
    Series::from_grid(&parse_co2eq_grid(payload))
}

fn array<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn unix_seconds(value: &Value) -> Option<UtcDateTime> {
    let seconds = value
        .as_i64()
        .or_else(|| value.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))?;
    UtcDateTime::from_unix_seconds(seconds)
}

fn number_at(values: &[Value], index: usize) -> Option<f64> {
    values
        .get(index)
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite())
}
