//! Behavior-driven tests for primary/fallback coordination
//!
//! The router is wired with fake providers to observe which path produced
//! each answer and how failures surface as statuses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use carbonwise_core::{
    BestStartRequest, CarbonRouter, CurrentIntensity, FixedClock, ForecastPoint, ForecastWindow,
    IntensityProvider, PointForecastProvider, Provenance, ProviderFuture, ProviderId,
    RawSeriesProvider, SelectionStatus, SourceError, UtcDateTime, ValueProvenance, ValueStatus,
};
use serde_json::{json, Value};

const T0: i64 = 1_704_067_200; // 2024-01-01T00:00:00Z
const HOUR: i64 = 3600;

fn at(seconds: i64) -> UtcDateTime {
    UtcDateTime::from_unix_seconds(seconds).expect("valid unix seconds")
}

enum PrimaryBehavior {
    Payload(Value),
    Timeout,
    Unavailable,
}

struct FakePrimary {
    behavior: PrimaryBehavior,
    calls: AtomicUsize,
}

impl FakePrimary {
    fn new(behavior: PrimaryBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
}

impl RawSeriesProvider for FakePrimary {
    fn id(&self) -> ProviderId {
        ProviderId::EnergyCharts
    }

    fn fetch_series<'a>(&'a self) -> ProviderFuture<'a, Value> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                PrimaryBehavior::Payload(payload) => Ok(payload.clone()),
                PrimaryBehavior::Timeout => Err(SourceError::timeout("upstream too slow")),
                // A rejection is never retried, which keeps these tests free of backoff waits.
                PrimaryBehavior::Unavailable => Err(SourceError::rejected(400, "bad request")),
            }
        })
    }
}

enum FallbackBehavior {
    Point(ForecastPoint),
    Empty,
    Fails,
}

struct FakeFallback {
    behavior: FallbackBehavior,
    windows: std::sync::Mutex<Vec<ForecastWindow>>,
}

impl FakeFallback {
    fn new(behavior: FallbackBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            windows: std::sync::Mutex::new(Vec::new()),
        })
    }
}

impl PointForecastProvider for FakeFallback {
    fn id(&self) -> ProviderId {
        ProviderId::CarbonAware
    }

    fn best_start<'a>(&'a self, window: ForecastWindow) -> ProviderFuture<'a, Option<ForecastPoint>> {
        Box::pin(async move {
            self.windows.lock().expect("windows lock").push(window);
            match &self.behavior {
                FallbackBehavior::Point(point) => Ok(Some(*point)),
                FallbackBehavior::Empty => Ok(None),
                FallbackBehavior::Fails => Err(SourceError::unavailable("forecast api down")),
            }
        })
    }
}

struct FakeIntensity;

impl IntensityProvider for FakeIntensity {
    fn id(&self) -> ProviderId {
        ProviderId::CarbonAware
    }

    fn current_intensity<'a>(&'a self) -> ProviderFuture<'a, Option<CurrentIntensity>> {
        Box::pin(async move {
            Ok(Some(CurrentIntensity {
                value: 210.0,
                timestamp: Some(at(T0)),
            }))
        })
    }
}

fn hourly(values: &[f64]) -> Value {
    json!({
        "unix_seconds": (0..values.len() as i64).map(|i| T0 + i * HOUR).collect::<Vec<_>>(),
        "co2eq": values,
    })
}

fn request() -> BestStartRequest {
    BestStartRequest::new("2024-01-01T00:00:00Z", "2024-01-01T06:00:00Z", 120)
}

fn router_with(primary: Arc<FakePrimary>, fallback: Option<Arc<FakeFallback>>) -> CarbonRouter {
    let mut builder = CarbonRouter::builder()
        .with_primary(primary)
        .with_clock(Arc::new(FixedClock::utc(at(T0))))
        .without_fallback();
    if let Some(fallback) = fallback {
        builder = builder.with_fallback(fallback);
    }
    builder.build()
}

// =============================================================================
// Best start
// =============================================================================

#[tokio::test]
async fn when_primary_fetch_fails_result_carries_fallback_provenance() {
    // Given: a failing primary and a fallback with a point forecast
    let fallback = FakeFallback::new(FallbackBehavior::Point(ForecastPoint {
        timestamp: at(T0 + 3 * HOUR),
        value: 95.5,
    }));
    let router = router_with(
        FakePrimary::new(PrimaryBehavior::Unavailable),
        Some(Arc::clone(&fallback)),
    );

    // When
    let response = router.best_start(&request()).await;

    // Then: the fallback's answer is reported as such
    assert_eq!(response.status, SelectionStatus::Ok);
    assert_eq!(response.source, Provenance::Fallback);
    assert_eq!(response.best_start, Some(at(T0 + 3 * HOUR)));
    assert_eq!(response.best_end, Some(at(T0 + 5 * HOUR)));
    assert_eq!(response.expected_avg_intensity, Some(95.5));

    // And: the fallback saw the requested window
    let windows = fallback.windows.lock().expect("windows lock");
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].window_start, at(T0));
    assert_eq!(windows[0].window_end, at(T0 + 6 * HOUR));
}

#[tokio::test]
async fn when_primary_series_is_empty_fallback_is_consulted() {
    // Given: a primary payload with only nulls
    let router = router_with(
        FakePrimary::new(PrimaryBehavior::Payload(json!({
            "unix_seconds": [T0, T0 + HOUR],
            "co2eq": [null, null],
        }))),
        Some(FakeFallback::new(FallbackBehavior::Empty)),
    );

    // When
    let response = router.best_start(&request()).await;

    // Then: the fallback's own outcome is terminal
    assert_eq!(response.status, SelectionStatus::NoData);
    assert_eq!(response.source, Provenance::Fallback);
}

#[tokio::test]
async fn when_primary_succeeds_fallback_is_never_called() {
    // Given
    let fallback = FakeFallback::new(FallbackBehavior::Fails);
    let router = router_with(
        FakePrimary::new(PrimaryBehavior::Payload(hourly(&[300.0, 250.0, 90.0, 80.0, 400.0, 500.0]))),
        Some(Arc::clone(&fallback)),
    );

    // When
    let response = router.best_start(&request()).await;

    // Then
    assert_eq!(response.status, SelectionStatus::Ok);
    assert_eq!(response.source, Provenance::Primary);
    assert_eq!(response.best_start, Some(at(T0 + 2 * HOUR)));
    assert_eq!(response.expected_avg_intensity, Some(85.0));
    assert!(fallback.windows.lock().expect("windows lock").is_empty());
}

#[tokio::test]
async fn when_no_start_passes_allowed_hours_fallback_is_consulted() {
    // Given: a usable primary series but an hour filter nothing passes
    let fallback = FakeFallback::new(FallbackBehavior::Point(ForecastPoint {
        timestamp: at(T0 + HOUR),
        value: 120.0,
    }));
    let router = router_with(
        FakePrimary::new(PrimaryBehavior::Payload(hourly(&[300.0, 250.0, 90.0, 80.0, 400.0, 500.0]))),
        Some(Arc::clone(&fallback)),
    );

    // When
    let response = router.best_start(&request().with_allowed_hours("12-18")).await;

    // Then: the primary NoCandidate is replaced by the fallback's answer
    assert_eq!(response.status, SelectionStatus::Ok);
    assert_eq!(response.source, Provenance::Fallback);
    assert_eq!(response.best_start, Some(at(T0 + HOUR)));
    assert!(response.warnings.iter().any(|warning| warning.contains("NoCandidate")));
    assert_eq!(fallback.windows.lock().expect("windows lock").len(), 1);
}

#[tokio::test]
async fn when_series_misses_the_window_fallback_is_consulted() {
    // Given: a primary series that ends before the requested window
    let router = router_with(
        FakePrimary::new(PrimaryBehavior::Payload(json!({
            "unix_seconds": [T0 - 2 * HOUR, T0 - HOUR],
            "co2eq": [100.0, 110.0],
        }))),
        Some(FakeFallback::new(FallbackBehavior::Point(ForecastPoint {
            timestamp: at(T0 + 2 * HOUR),
            value: 99.0,
        }))),
    );

    // When
    let response = router.best_start(&request()).await;

    // Then
    assert_eq!(response.status, SelectionStatus::Ok);
    assert_eq!(response.source, Provenance::Fallback);
    assert!(response.warnings.iter().any(|warning| warning.contains("NoData")));
}

#[tokio::test]
async fn timestamps_without_offset_are_accepted() {
    // Given: a host sending naive and space-separated timestamps
    let router = router_with(
        FakePrimary::new(PrimaryBehavior::Payload(hourly(&[300.0, 250.0, 90.0, 80.0, 400.0, 500.0]))),
        None,
    );
    let request = BestStartRequest::new("2024-01-01T00:00:00", "2024-01-01 06:00:00", 120);

    // When
    let response = router.best_start(&request).await;

    // Then: they are read in the clock's local time (UTC here)
    assert_eq!(response.status, SelectionStatus::Ok);
    assert_eq!(response.best_start, Some(at(T0 + 2 * HOUR)));
}

#[tokio::test]
async fn oversized_duration_is_a_status_not_a_crash() {
    let router = router_with(FakePrimary::new(PrimaryBehavior::Payload(hourly(&[1.0]))), None);
    let request = BestStartRequest::new("2024-01-01T00:00:00Z", "2024-01-01T06:00:00Z", 6_000_000_000);

    let response = router.best_start(&request).await;

    assert_eq!(response.status, SelectionStatus::InvalidWindow);
    assert_eq!(response.runtime_minutes, Some(6_000_000_000));
}

#[tokio::test]
async fn when_both_paths_fail_a_structured_error_is_returned() {
    // Given
    let router = router_with(
        FakePrimary::new(PrimaryBehavior::Unavailable),
        Some(FakeFallback::new(FallbackBehavior::Fails)),
    );

    // When
    let response = router.best_start(&request()).await;

    // Then: Error status with the request echoed back
    assert_eq!(response.status, SelectionStatus::Error);
    assert_eq!(response.source, Provenance::Fallback);
    assert_eq!(response.start.as_deref(), Some("2024-01-01T00:00:00Z"));
    assert_eq!(response.runtime_minutes, Some(120));
    assert_eq!(response.location, "de");
    assert!(response.warnings.len() >= 2);
}

#[tokio::test(start_paused = true)]
async fn primary_timeout_without_fallback_reports_timeout() {
    // Given: a primary that always times out and no fallback
    let router = router_with(FakePrimary::new(PrimaryBehavior::Timeout), None);

    // When: the retry schedule runs out under paused time
    let response = router.best_start(&request()).await;

    // Then
    assert_eq!(response.status, SelectionStatus::Timeout);
    assert_eq!(response.source, Provenance::Primary);
}

#[tokio::test]
async fn validation_failures_are_statuses_not_faults() {
    let primary = FakePrimary::new(PrimaryBehavior::Payload(hourly(&[1.0])));
    let router = router_with(Arc::clone(&primary), None);

    let missing = BestStartRequest {
        window_end: Some(String::from("2024-01-01T06:00:00Z")),
        ..BestStartRequest::default()
    };
    assert_eq!(router.best_start(&missing).await.status, SelectionStatus::MissingParam);

    let garbled = BestStartRequest::new("yesterday", "2024-01-01T06:00:00Z", 60);
    assert_eq!(router.best_start(&garbled).await.status, SelectionStatus::InvalidDatetime);

    let zero = BestStartRequest::new("2024-01-01T00:00:00Z", "2024-01-01T06:00:00Z", 0);
    assert_eq!(router.best_start(&zero).await.status, SelectionStatus::InvalidWindow);

    assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Current value
// =============================================================================

#[tokio::test]
async fn current_value_prefers_cached_series_over_intensity_provider() {
    // Given: a primary series covering now
    let router = CarbonRouter::builder()
        .with_primary(FakePrimary::new(PrimaryBehavior::Payload(hourly(&[100.0, 300.0]))))
        .with_intensity_provider(Arc::new(FakeIntensity))
        .with_clock(Arc::new(FixedClock::utc(at(T0 + HOUR / 2))))
        .without_fallback()
        .build();

    // When
    let response = router.current_value().await;

    // Then
    assert_eq!(response.status, ValueStatus::Ok);
    assert_eq!(response.value, Some(200.0));
    assert_eq!(response.provenance, Some(ValueProvenance::Interpolated));
}

#[tokio::test(start_paused = true)]
async fn current_value_serves_stale_entry_when_refresh_fails() {
    // Given: a cache entry older than the TTL and a primary that now fails
    let router = router_with(FakePrimary::new(PrimaryBehavior::Unavailable), None);
    router.cache().seed(hourly(&[150.0, 170.0])).await;
    tokio::time::advance(std::time::Duration::from_secs(2 * 3600)).await;

    // When
    let response = router.current_value().await;

    // Then: the old series still answers, flagged as stale
    assert_eq!(response.status, ValueStatus::Ok);
    assert_eq!(response.value, Some(150.0));
    assert_eq!(response.provenance, Some(ValueProvenance::Actual));
    assert!(response.stale);
    assert_eq!(response.warnings.len(), 1);
    assert!(response.warnings[0].contains("fetched at"));
}

#[tokio::test]
async fn current_value_without_any_source_reports_error() {
    let router = router_with(FakePrimary::new(PrimaryBehavior::Unavailable), None);

    let response = router.current_value().await;

    assert_eq!(response.status, ValueStatus::Error);
    assert_eq!(response.value, None);
    assert!(!response.stale);
}
