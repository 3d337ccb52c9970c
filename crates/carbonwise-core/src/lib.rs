//! # Carbonwise Core
//!
//! Carbon-intensity decision engine: picks the lowest-emission start time for
//! a deferrable load and reports the grid's current intensity.
//!
//! ## Overview
//!
//! - **Series parsing** of the Energy-Charts `co2eq` payload, tolerant of gaps
//! - **Window selection** over a time-ordered series with allowed hours and
//!   an optional minimum-gain threshold
//! - **Current value resolution** by interpolation with actual/forecast preference
//! - **Fetch cache** with a one-hour TTL, linear backoff and single-flight fetching
//! - **Provider fallback** to a point-forecast provider when the primary path fails
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Energy-Charts and carbon-aware-computing adapters |
//! | [`cache`] | Single-entry TTL cache for the raw series |
//! | [`clock`] | Clock abstraction for "now" and the local hour |
//! | [`config`] | Environment-driven engine configuration |
//! | [`data_source`] | Provider traits and `SourceError` |
//! | [`domain`] | Timestamps, series and allowed-hours types |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`optimizer`] | Best-start window selection |
//! | [`parser`] | Raw payload to grid/series |
//! | [`refresh`] | Periodic cache refresh task |
//! | [`request`] | Host-facing request and response shapes |
//! | [`resolver`] | Current-value resolution |
//! | [`retry`] | Retry/backoff configuration |
//! | [`routing`] | Primary/fallback coordination |
//! | [`source`] | Provider identifiers and provenance |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use carbonwise_core::{BestStartRequest, CarbonRouter, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = CarbonRouter::builder()
//!         .with_config(EngineConfig::from_env()?)
//!         .build();
//!
//!     let request = BestStartRequest::new("2024-01-01T00:00:00Z", "2024-01-01T12:00:00Z", 90);
//!     let response = router.best_start(&request).await;
//!     println!("{}: {:?}", response.status, response.best_start);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Host     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  CarbonRouter   │────▶│ Fallback provider│
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  FetchCache     │────▶│ Energy-Charts    │
//! │  (TTL + retry)  │     │ (HTTP client)    │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Parser ▶ Series │──▶ optimizer / resolver
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Host-facing operations never fail: every outcome is a status on the
//! response. Provider calls return [`SourceError`], whose kind decides
//! retrying and the reported status:
//!
//! ```rust
//! use carbonwise_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::Timeout => "Timeout",
//!         SourceErrorKind::Rejected => "rejected, not retried",
//!         _ => "Error",
//!     }
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod clock;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod optimizer;
pub mod parser;
pub mod refresh;
pub mod request;
pub mod resolver;
pub mod retry;
pub mod routing;
pub mod source;

// Adapter implementations
pub use adapters::{CarbonAwareAdapter, EnergyChartsAdapter};

// Caching
pub use cache::{CacheEntry, CacheLookup, CacheMode, FetchCache};

// Clocks
pub use clock::{Clock, FixedClock, SystemClock};

// Configuration
pub use config::EngineConfig;

// Provider traits and types
pub use data_source::{
    CurrentIntensity, ForecastPoint, ForecastWindow, IntensityProvider, PointForecastProvider,
    ProviderFuture, RawSeriesProvider, SourceError, SourceErrorKind,
};

// Domain models
pub use domain::{AllowedHours, GridPoint, IntensityGrid, Sample, SampleOrigin, Series, UtcDateTime};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Algorithms
pub use optimizer::{select_window, SelectionResult, SelectionStatus, WindowRequest};
pub use parser::{parse_co2eq_grid, parse_co2eq_series};
pub use resolver::{resolve_current, ResolvedValue, ValueProvenance};

// Refresh
pub use refresh::RefreshTask;

// Request/response shapes
pub use request::{
    BestStartRequest, BestStartResponse, CurrentValueResponse, ValidatedRequest, ValueStatus,
    DEFAULT_DURATION_MINUTES,
};

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Routing
pub use routing::{CarbonRouter, CarbonRouterBuilder};

// Source identifiers
pub use source::{Provenance, ProviderId};
