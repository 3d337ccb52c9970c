//! Provider capability traits and their error type.
//!
//! | Trait | Returns | Used by |
//! |-------|---------|---------|
//! | [`RawSeriesProvider`] | raw `co2eq` payload | [`FetchCache`](crate::FetchCache), primary path |
//! | [`PointForecastProvider`] | best start point | fallback path |
//! | [`IntensityProvider`] | current value | current-value fallback |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http_client::HttpError;
use crate::{ProviderId, UtcDateTime};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Transport failure or server-side error.
    Unavailable,
    /// Attempt exceeded its deadline.
    Timeout,
    /// Upstream answered with a client error; retrying cannot help.
    Rejected,
    /// Body could not be decoded.
    InvalidPayload,
    Internal,
}

/// Structured provider error used by the retry loop and the fallback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Rejected,
            message: format!("status {status}: {}", message.into()),
            retryable: false,
        }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidPayload,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    /// Maps a transport error, prefixing the message with `provider`.
    pub fn from_http(provider: ProviderId, error: &HttpError) -> Self {
        let message = format!("{provider} transport error: {}", error.message());
        if error.timed_out() {
            Self::timeout(message)
        } else if error.retryable() {
            Self::unavailable(message)
        } else {
            Self::internal(message)
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::Rejected => "source.rejected",
            SourceErrorKind::InvalidPayload => "source.invalid_payload",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Window handed to a point-forecast provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastWindow {
    pub window_start: UtcDateTime,
    pub window_end: UtcDateTime,
    pub duration: time::Duration,
}

/// Best start reported by a point-forecast provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: UtcDateTime,
    pub value: f64,
}

/// Current intensity reported directly by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentIntensity {
    pub value: f64,
    pub timestamp: Option<UtcDateTime>,
}

/// Source of the full raw actual/forecast series. One attempt per call;
/// retries belong to the cache.
pub trait RawSeriesProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn fetch_series<'a>(&'a self) -> ProviderFuture<'a, Value>;
}

/// Source of a single precomputed best start. `Ok(None)` means the provider
/// answered but had no data for the window.
pub trait PointForecastProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn best_start<'a>(&'a self, window: ForecastWindow) -> ProviderFuture<'a, Option<ForecastPoint>>;
}

/// Source of a live current-intensity reading.
pub trait IntensityProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn current_intensity<'a>(&'a self) -> ProviderFuture<'a, Option<CurrentIntensity>>;
}
