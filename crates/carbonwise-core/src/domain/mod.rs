//! # Domain Models
//!
//! Canonical types for carbon-intensity data.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`UtcDateTime`] | UTC instant, parsed from any RFC3339 offset |
//! | [`GridPoint`] | Raw actual/forecast pair at one timestamp |
//! | [`IntensityGrid`] | Sorted grid, gaps retained |
//! | [`Sample`] | Usable intensity reading with its origin |
//! | [`Series`] | Sorted, deduplicated samples |
//! | [`AllowedHours`] | Local hour-of-day restriction |

mod allowed_hours;
mod series;
mod timestamp;

pub use allowed_hours::AllowedHours;
pub use series::{GridPoint, IntensityGrid, Sample, SampleOrigin, Series};
pub use timestamp::UtcDateTime;
