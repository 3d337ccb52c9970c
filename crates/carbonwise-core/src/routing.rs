//! Primary/fallback orchestration for best-start and current-value requests.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapters::{CarbonAwareAdapter, EnergyChartsAdapter};
use crate::cache::FetchCache;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::data_source::{
    ForecastWindow, IntensityProvider, PointForecastProvider, RawSeriesProvider, SourceError,
};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::optimizer::{select_window, SelectionStatus, WindowRequest};
use crate::request::{
    failure_status, validation_status, BestStartRequest, BestStartResponse, CurrentValueResponse,
    ValidatedRequest, ValueStatus,
};
use crate::resolver::{resolve_current, round2, ValueProvenance};
use crate::Provenance;

/// Engine entry point for one configured location.
///
/// Best-start requests run on the cached primary series first and fall back
/// to the point-forecast provider when the series is unavailable, empty, or
/// yields no `OK` selection. Every outcome is returned as a response value.
pub struct CarbonRouter {
    location: String,
    cache: FetchCache,
    primary: Arc<dyn RawSeriesProvider>,
    fallback: Option<Arc<dyn PointForecastProvider>>,
    intensity: Option<Arc<dyn IntensityProvider>>,
    clock: Arc<dyn Clock>,
}

impl CarbonRouter {
    /// Starts a builder; unset parts come from [`EngineConfig::default`].
    pub fn builder() -> CarbonRouterBuilder {
        CarbonRouterBuilder::new()
    }

    /// Location code every provider call is made for.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Cache shared by all requests of this router.
    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// Forces a fetch of the primary series into the cache.
    pub async fn refresh_now(&self) -> Result<(), SourceError> {
        self.cache.refresh(Arc::clone(&self.primary)).await.map(|_| ())
    }

    /// Answers a best-start request.
    ///
    /// Validation failures are returned as statuses without any provider
    /// call. Any primary outcome other than `OK` hands over to the fallback
    /// provider when one is configured.
    pub async fn best_start(&self, request: &BestStartRequest) -> BestStartResponse {
        let mut response = BestStartResponse::for_request(request, &self.location);

        let validated = match request.validate(self.clock.as_ref()) {
            Ok(validated) => validated,
            Err(error) => {
                debug!(%error, "best-start request rejected");
                response.push_warning(error.to_string());
                return response.with_status(validation_status(&error));
            }
        };
        response.runtime_minutes = Some(validated.duration_minutes);
        response.warnings.extend(validated.warnings.iter().cloned());

        let primary_status = match self.cache.get_or_fetch(Arc::clone(&self.primary)).await {
            Ok(lookup) => {
                response.cache_hit = lookup.cache_hit;
                let series = lookup.entry.series();
                if series.is_empty() {
                    SelectionStatus::NoData
                } else {
                    let mut window = WindowRequest::new(
                        validated.window_start,
                        validated.window_end,
                        validated.duration(),
                    )
                    .with_allowed_hours(validated.allowed_hours);
                    if let Some(min_gain) = validated.min_gain {
                        let baseline = resolve_current(lookup.entry.grid(), self.clock.now())
                            .map(|resolved| resolved.value);
                        window = window.with_min_gain(min_gain, baseline);
                    }

                    let selection = select_window(series, &window, self.clock.as_ref());
                    match selection.status {
                        SelectionStatus::Ok => {
                            return response
                                .with_selection(&selection)
                                .with_source(Provenance::Primary, self.primary.id());
                        }
                        SelectionStatus::GainTooLow => {
                            response = response.with_selection(&selection);
                            response.push_warning(gain_warning(&window, &response));
                        }
                        _ => {}
                    }
                    selection.status
                }
            }
            Err(error) => {
                warn!(provider = %self.primary.id(), %error, "primary series unavailable");
                response.push_warning(format!("primary series unavailable: {error}"));
                failure_status(&error)
            }
        };

        self.best_start_fallback(response, &validated, primary_status)
            .await
    }

    async fn best_start_fallback(
        &self,
        response: BestStartResponse,
        validated: &ValidatedRequest,
        primary_status: SelectionStatus,
    ) -> BestStartResponse {
        let mut response = response.with_source(Provenance::Primary, self.primary.id());
        let Some(fallback) = &self.fallback else {
            return response.with_status(primary_status);
        };

        warn!(
            primary_status = %primary_status,
            fallback = %fallback.id(),
            location = %self.location,
            "primary path produced no result, using fallback provider"
        );
        response.push_warning(format!(
            "primary path returned {primary_status}; result from {} fallback",
            fallback.id()
        ));
        response = response.with_source(Provenance::Fallback, fallback.id());
        response.best_start = None;
        response.best_end = None;
        response.expected_avg_intensity = None;

        let window = ForecastWindow {
            window_start: validated.window_start,
            window_end: validated.window_end,
            duration: validated.duration(),
        };
        match fallback.best_start(window).await {
            Ok(Some(point)) => match point.timestamp.checked_add(validated.duration()) {
                Some(end)
                    if point.timestamp >= validated.window_start && end <= validated.window_end =>
                {
                    response.best_start = Some(point.timestamp);
                    response.best_end = Some(end);
                    response.expected_avg_intensity = Some(round2(point.value));
                    response.with_status(SelectionStatus::Ok)
                }
                _ => {
                    warn!(
                        provider = %fallback.id(),
                        start = %point.timestamp,
                        "fallback start does not fit the requested window"
                    );
                    response.push_warning(format!(
                        "fallback start {} does not fit the requested window",
                        point.timestamp
                    ));
                    response.with_status(SelectionStatus::NoCandidate)
                }
            },
            Ok(None) => response.with_status(SelectionStatus::NoData),
            Err(error) => {
                warn!(provider = %fallback.id(), %error, "fallback provider failed");
                response.push_warning(format!("fallback provider failed: {error}"));
                response.with_status(failure_status(&error))
            }
        }
    }

    /// Current intensity from the cached series, a stale entry after a
    /// failed refresh, or the intensity provider, in that order.
    pub async fn current_value(&self) -> CurrentValueResponse {
        let now = self.clock.now();
        let mut warnings = Vec::new();

        let (entry, stale, failure) = match self.cache.get_or_fetch(Arc::clone(&self.primary)).await {
            Ok(lookup) => (Some(lookup.entry), false, None),
            Err(error) => {
                warn!(provider = %self.primary.id(), %error, "primary series unavailable");
                let previous = self.cache.peek().await;
                if let Some(previous) = &previous {
                    warnings.push(format!(
                        "serving stale series fetched at {} after failed refresh: {error}",
                        previous.fetched_at_utc().format_rfc3339()
                    ));
                }
                let stale = previous.is_some();
                (previous, stale, Some(error))
            }
        };

        if let Some(entry) = entry {
            if let Some(resolved) = resolve_current(entry.grid(), now) {
                let mut response = CurrentValueResponse::resolved(resolved, &self.location);
                response.stale = stale;
                response.warnings = warnings;
                return response;
            }
        }

        let Some(provider) = &self.intensity else {
            let status = failure
                .as_ref()
                .map_or(ValueStatus::NoData, ValueStatus::from_failure);
            let mut response = CurrentValueResponse::empty(status, &self.location);
            response.warnings = warnings;
            return response;
        };

        info!(provider = %provider.id(), "series has no usable value, asking intensity provider");
        let mut response = match provider.current_intensity().await {
            Ok(Some(current)) => CurrentValueResponse {
                status: ValueStatus::Ok,
                value: Some(round2(current.value)),
                timestamp: Some(current.timestamp.unwrap_or(now)),
                provenance: Some(ValueProvenance::Provider),
                ..CurrentValueResponse::empty(ValueStatus::Ok, &self.location)
            },
            Ok(None) => CurrentValueResponse::empty(ValueStatus::NoData, &self.location),
            Err(error) => {
                warn!(provider = %provider.id(), %error, "intensity provider failed");
                warnings.push(format!("intensity provider failed: {error}"));
                CurrentValueResponse::empty(ValueStatus::from_failure(&error), &self.location)
            }
        };
        response.warnings = warnings;
        response
    }
}

fn gain_warning(window: &WindowRequest, response: &BestStartResponse) -> String {
    let start = response
        .best_start
        .map_or_else(|| String::from("none"), |start| start.to_string());
    let avg = response.expected_avg_intensity.unwrap_or(f64::NAN);
    let baseline = window.now_intensity.unwrap_or(f64::NAN);
    format!(
        "primary best start {start} averages {avg}, less than min_gain {} below current {baseline}",
        window.min_gain.unwrap_or_default()
    )
}

/// Builder wiring providers, cache and clock into a [`CarbonRouter`].
///
/// Unset providers are built from the [`EngineConfig`]: the Energy-Charts
/// adapter as primary, and the carbon-aware-computing adapter as fallback and
/// intensity provider when an API key is configured.
#[derive(Default)]
pub struct CarbonRouterBuilder {
    config: EngineConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    primary: Option<Arc<dyn RawSeriesProvider>>,
    fallback: Option<Arc<dyn PointForecastProvider>>,
    intensity: Option<Arc<dyn IntensityProvider>>,
    cache: Option<FetchCache>,
    clock: Option<Arc<dyn Clock>>,
    disable_fallback: bool,
}

impl CarbonRouterBuilder {
    /// Builder with the default configuration and no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder whose default providers and cache follow `config`.
    pub fn from_config(config: EngineConfig) -> Self {
        Self::new().with_config(config)
    }

    /// Replaces the configuration used for default providers and cache.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport for the default adapters.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Raw-series provider used instead of Energy-Charts.
    pub fn with_primary(mut self, primary: Arc<dyn RawSeriesProvider>) -> Self {
        self.primary = Some(primary);
        self
    }

    /// Point-forecast provider consulted when the primary path has no `OK` result.
    pub fn with_fallback(mut self, fallback: Arc<dyn PointForecastProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Provider of live readings for current-value requests.
    pub fn with_intensity_provider(mut self, intensity: Arc<dyn IntensityProvider>) -> Self {
        self.intensity = Some(intensity);
        self
    }

    /// Share an existing cache, e.g. with a background refresher.
    pub fn with_cache(mut self, cache: FetchCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Clock for "now" and local hours; the system clock otherwise.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Do not build default secondary providers from the config.
    pub fn without_fallback(mut self) -> Self {
        self.disable_fallback = true;
        self
    }

    /// Assembles the router, filling every unset part from the config.
    pub fn build(self) -> CarbonRouter {
        let config = self.config;
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));

        let primary = self.primary.unwrap_or_else(|| {
            Arc::new(
                EnergyChartsAdapter::with_http_client(Arc::clone(&http_client), config.location.clone())
                    .with_base_url(config.primary_url.clone())
                    .with_timeout(config.fetch_timeout),
            )
        });

        let carbon_aware = match (&config.api_key, self.disable_fallback) {
            (Some(api_key), false) => Some(Arc::new(
                CarbonAwareAdapter::with_http_client(
                    Arc::clone(&http_client),
                    config.location.clone(),
                    api_key.clone(),
                )
                .with_forecast_url(config.forecast_url.clone())
                .with_intensity_url(config.intensity_url.clone()),
            )),
            _ => None,
        };

        let fallback = self.fallback.or_else(|| {
            carbon_aware
                .clone()
                .map(|adapter| adapter as Arc<dyn PointForecastProvider>)
        });
        let intensity = self
            .intensity
            .or_else(|| carbon_aware.map(|adapter| adapter as Arc<dyn IntensityProvider>));

        let cache = self.cache.unwrap_or_else(|| {
            FetchCache::with_attempt_timeout(config.cache_ttl, config.retry.clone(), config.fetch_timeout)
        });

        CarbonRouter {
            location: config.location,
            cache,
            primary,
            fallback,
            intensity,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::default())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{json, Value};

    use super::*;
    use crate::clock::FixedClock;
    use crate::data_source::{CurrentIntensity, ForecastPoint, ProviderFuture};
    use crate::{ProviderId, UtcDateTime};

    const HOUR: i64 = 3600;

    fn ts(raw: &str) -> UtcDateTime {
        UtcDateTime::parse(raw).expect("timestamp")
    }

    struct StaticSeries {
        payload: Option<Value>,
        calls: AtomicUsize,
    }

    impl StaticSeries {
        fn ok(payload: Value) -> Arc<Self> {
            Arc::new(Self {
                payload: Some(payload),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                payload: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl RawSeriesProvider for StaticSeries {
        fn id(&self) -> ProviderId {
            ProviderId::EnergyCharts
        }

        fn fetch_series<'a>(&'a self) -> ProviderFuture<'a, Value> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.payload
                    .clone()
                    .ok_or_else(|| SourceError::rejected(404, "unknown country"))
            })
        }
    }

    struct StaticForecast(Option<ForecastPoint>);

    impl PointForecastProvider for StaticForecast {
        fn id(&self) -> ProviderId {
            ProviderId::CarbonAware
        }

        fn best_start<'a>(&'a self, _window: ForecastWindow) -> ProviderFuture<'a, Option<ForecastPoint>> {
            Box::pin(async move { Ok(self.0) })
        }
    }

    struct StaticIntensity(f64);

    impl IntensityProvider for StaticIntensity {
        fn id(&self) -> ProviderId {
            ProviderId::CarbonAware
        }

        fn current_intensity<'a>(&'a self) -> ProviderFuture<'a, Option<CurrentIntensity>> {
            Box::pin(async move {
                Ok(Some(CurrentIntensity {
                    value: self.0,
                    timestamp: None,
                }))
            })
        }
    }

    fn hourly_payload(start: UtcDateTime, values: &[f64]) -> Value {
        let base = start.unix_seconds();
        json!({
            "unix_seconds": (0..values.len() as i64).map(|i| base + i * HOUR).collect::<Vec<_>>(),
            "co2eq": values,
        })
    }

    fn router(primary: Arc<StaticSeries>, now: UtcDateTime) -> CarbonRouterBuilder {
        CarbonRouter::builder()
            .with_primary(primary)
            .with_clock(Arc::new(FixedClock::utc(now)))
            .without_fallback()
    }

    fn request() -> BestStartRequest {
        BestStartRequest::new("2024-01-01T00:00:00Z", "2024-01-01T04:00:00Z", 60)
    }

    #[tokio::test]
    async fn primary_selection_reports_primary_provenance() {
        let start = ts("2024-01-01T00:00:00Z");
        let primary = StaticSeries::ok(hourly_payload(start, &[300.0, 200.0, 100.0, 400.0]));
        let router = router(Arc::clone(&primary), start).build();

        let response = router.best_start(&request()).await;

        assert_eq!(response.status, SelectionStatus::Ok);
        assert_eq!(response.source, Provenance::Primary);
        assert_eq!(response.provider, Some(ProviderId::EnergyCharts));
        assert_eq!(response.best_start, Some(ts("2024-01-01T02:00:00Z")));
        assert_eq!(response.expected_avg_intensity, Some(100.0));
        assert!(!response.cache_hit);

        let again = router.best_start(&request()).await;
        assert!(again.cache_hit);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_providers() {
        let primary = StaticSeries::ok(json!({}));
        let router = router(Arc::clone(&primary), ts("2024-01-01T00:00:00Z")).build();
        let request = BestStartRequest::new("2024-01-01T04:00:00Z", "2024-01-01T00:00:00Z", 60);

        let response = router.best_start(&request).await;

        assert_eq!(response.status, SelectionStatus::InvalidWindow);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_failure_uses_fallback_point() {
        let router = router(StaticSeries::failing(), ts("2024-01-01T00:00:00Z"))
            .with_fallback(Arc::new(StaticForecast(Some(ForecastPoint {
                timestamp: ts("2024-01-01T01:00:00Z"),
                value: 123.456,
            }))))
            .build();

        let response = router.best_start(&request()).await;

        assert_eq!(response.status, SelectionStatus::Ok);
        assert_eq!(response.source, Provenance::Fallback);
        assert_eq!(response.provider, Some(ProviderId::CarbonAware));
        assert_eq!(response.best_end, Some(ts("2024-01-01T02:00:00Z")));
        assert_eq!(response.expected_avg_intensity, Some(123.46));
        assert!(!response.warnings.is_empty());
    }

    #[tokio::test]
    async fn primary_failure_without_fallback_is_error() {
        let router = router(StaticSeries::failing(), ts("2024-01-01T00:00:00Z")).build();

        let response = router.best_start(&request()).await;

        assert_eq!(response.status, SelectionStatus::Error);
        assert_eq!(response.source, Provenance::Primary);
    }

    #[tokio::test]
    async fn current_value_falls_back_to_intensity_provider() {
        let now = ts("2024-01-01T00:30:00Z");
        let router = router(StaticSeries::failing(), now)
            .with_intensity_provider(Arc::new(StaticIntensity(88.888)))
            .build();

        let response = router.current_value().await;

        assert_eq!(response.status, ValueStatus::Ok);
        assert_eq!(response.value, Some(88.89));
        assert_eq!(response.timestamp, Some(now));
        assert_eq!(response.provenance, Some(ValueProvenance::Provider));
    }

    #[tokio::test]
    async fn current_value_interpolates_cached_series() {
        let start = ts("2024-01-01T00:00:00Z");
        let router = router(StaticSeries::ok(hourly_payload(start, &[100.0, 200.0])), ts("2024-01-01T00:30:00Z")).build();

        let response = router.current_value().await;

        assert_eq!(response.status, ValueStatus::Ok);
        assert_eq!(response.value, Some(150.0));
        assert_eq!(response.provenance, Some(ValueProvenance::Interpolated));
        assert!(!response.stale);
    }

    fn gain_series() -> Arc<StaticSeries> {
        StaticSeries::ok(hourly_payload(ts("2024-01-01T00:00:00Z"), &[300.0, 290.0, 295.0, 298.0]))
    }

    #[tokio::test]
    async fn gain_too_low_hands_over_to_fallback() {
        let router = router(gain_series(), ts("2024-01-01T00:00:00Z"))
            .with_fallback(Arc::new(StaticForecast(Some(ForecastPoint {
                timestamp: ts("2024-01-01T02:00:00Z"),
                value: 150.0,
            }))))
            .build();

        let response = router.best_start(&request().with_min_gain(50.0)).await;

        assert_eq!(response.status, SelectionStatus::Ok);
        assert_eq!(response.source, Provenance::Fallback);
        assert_eq!(response.best_start, Some(ts("2024-01-01T02:00:00Z")));
        assert_eq!(response.expected_avg_intensity, Some(150.0));
        assert!(response
            .warnings
            .iter()
            .any(|warning| warning.contains("primary best start 2024-01-01T01:00:00Z averages 290")));
    }

    #[tokio::test]
    async fn gain_too_low_without_fallback_keeps_primary_selection() {
        let router = router(gain_series(), ts("2024-01-01T00:00:00Z")).build();

        let response = router.best_start(&request().with_min_gain(50.0)).await;

        assert_eq!(response.status, SelectionStatus::GainTooLow);
        assert_eq!(response.source, Provenance::Primary);
        assert_eq!(response.best_start, Some(ts("2024-01-01T01:00:00Z")));
        assert_eq!(response.best_end, None);
        assert_eq!(response.expected_avg_intensity, Some(290.0));
    }

    #[tokio::test]
    async fn oversized_duration_is_rejected_before_any_fetch() {
        let primary = gain_series();
        let router = router(Arc::clone(&primary), ts("2024-01-01T00:00:00Z")).build();
        let request = BestStartRequest::new("2024-01-01T00:00:00Z", "2024-01-01T04:00:00Z", 6_000_000_000);

        let response = router.best_start(&request).await;

        assert_eq!(response.status, SelectionStatus::InvalidWindow);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_point_past_window_end_is_no_candidate() {
        let router = router(StaticSeries::failing(), ts("2024-01-01T00:00:00Z"))
            .with_fallback(Arc::new(StaticForecast(Some(ForecastPoint {
                timestamp: ts("2024-01-01T03:30:00Z"),
                value: 80.0,
            }))))
            .build();

        let response = router.best_start(&request()).await;

        assert_eq!(response.status, SelectionStatus::NoCandidate);
        assert_eq!(response.source, Provenance::Fallback);
        assert_eq!(response.best_start, None);
        assert!(response.warnings.iter().any(|warning| warning.contains("does not fit")));
    }

    struct RecordingHttpClient {
        urls: std::sync::Mutex<Vec<String>>,
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: crate::http_client::HttpRequest,
        ) -> std::pin::Pin<
            Box<
                dyn std::future::Future<
                        Output = Result<crate::http_client::HttpResponse, crate::http_client::HttpError>,
                    > + Send
                    + 'a,
            >,
        > {
            Box::pin(async move {
                self.urls.lock().expect("urls lock").push(request.url);
                Ok(crate::http_client::HttpResponse::ok_json(
                    r#"{"unix_seconds":[1704067200],"co2eq":[42.0]}"#,
                ))
            })
        }
    }

    #[tokio::test]
    async fn config_built_router_fetches_configured_location() {
        let config = EngineConfig::default()
            .with_location("fr")
            .expect("valid location");
        let client = Arc::new(RecordingHttpClient {
            urls: std::sync::Mutex::new(Vec::new()),
        });
        let router = CarbonRouterBuilder::from_config(config)
            .with_http_client(Arc::clone(&client) as Arc<dyn HttpClient>)
            .with_clock(Arc::new(FixedClock::utc(ts("2024-01-01T00:00:00Z"))))
            .build();

        let response = router.current_value().await;

        assert_eq!(response.value, Some(42.0));
        assert_eq!(response.location, "fr");
        let urls = client.urls.lock().expect("urls lock");
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0], "https://api.energy-charts.info/co2eq?country=fr");
    }
}
