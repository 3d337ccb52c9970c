use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::data_source::{
    CurrentIntensity, ForecastPoint, ForecastWindow, IntensityProvider, PointForecastProvider,
    ProviderFuture, SourceError,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::{ProviderId, UtcDateTime};

pub const CARBON_AWARE_FORECAST_URL: &str =
    "https://forecast.carbon-aware-computing.com/emissions/forecasts/current";
pub const CARBON_AWARE_INTENSITY_URL: &str =
    "https://intensity.carbon-aware-computing.com/emissions/current";

/// Point forecasts and live intensity from the carbon-aware-computing API.
#[derive(Clone)]
pub struct CarbonAwareAdapter {
    http_client: Arc<dyn HttpClient>,
    location: String,
    auth: HttpAuth,
    forecast_url: String,
    intensity_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastPayload {
    #[serde(default)]
    optimal_data_points: Vec<DataPointPayload>,
}

#[derive(Debug, Deserialize)]
struct DataPointPayload {
    timestamp: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentPayload {
    value: Option<f64>,
    time: Option<String>,
}

impl CarbonAwareAdapter {
    pub fn new(location: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()), location, api_key)
    }

    pub fn with_http_client(
        http_client: Arc<dyn HttpClient>,
        location: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            location: location.into(),
            auth: HttpAuth::Header {
                name: String::from("x-api-key"),
                value: api_key.into(),
            },
            forecast_url: String::from(CARBON_AWARE_FORECAST_URL),
            intensity_url: String::from(CARBON_AWARE_INTENSITY_URL),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_forecast_url(mut self, url: impl Into<String>) -> Self {
        self.forecast_url = url.into();
        self
    }

    pub fn with_intensity_url(mut self, url: impl Into<String>) -> Self {
        self.intensity_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn forecast_request_url(&self, window: &ForecastWindow) -> String {
        format!(
            "{}?location={}&dataStartAt={}&dataEndAt={}&windowSize={}",
            self.forecast_url,
            urlencoding::encode(&self.location),
            urlencoding::encode(&window.window_start.format_rfc3339()),
            urlencoding::encode(&window.window_end.format_rfc3339()),
            window.duration.whole_minutes()
        )
    }

    async fn get(&self, url: String) -> Result<HttpResponse, SourceError> {
        debug!(%url, "carbon-aware request");
        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_auth(&self.auth)
            .with_timeout(self.timeout);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| SourceError::from_http(ProviderId::CarbonAware, &error))?;

        if response.is_client_error() {
            return Err(SourceError::rejected(response.status, response.body));
        }
        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "carbon_aware upstream returned status {}",
                response.status
            )));
        }
        Ok(response)
    }
}

/// First element's first optimal data point, if any.
fn parse_forecast(body: &str) -> Result<Option<ForecastPoint>, SourceError> {
    let payload: Vec<ForecastPayload> = serde_json::from_str(body).map_err(|error| {
        SourceError::invalid_payload(format!("carbon_aware forecast body is malformed: {error}"))
    })?;

    let Some(point) = payload
        .into_iter()
        .next()
        .and_then(|first| first.optimal_data_points.into_iter().next())
    else {
        return Ok(None);
    };

    let timestamp = UtcDateTime::parse(&point.timestamp)
        .map_err(|error| SourceError::invalid_payload(error.to_string()))?;
    Ok(Some(ForecastPoint {
        timestamp,
        value: point.value,
    }))
}

fn parse_current(body: &str) -> Result<Option<CurrentIntensity>, SourceError> {
    let payload: CurrentPayload = serde_json::from_str(body).map_err(|error| {
        SourceError::invalid_payload(format!("carbon_aware intensity body is malformed: {error}"))
    })?;

    Ok(payload.value.map(|value| CurrentIntensity {
        value,
        timestamp: payload
            .time
            .as_deref()
            .and_then(|raw| UtcDateTime::parse(raw).ok()),
    }))
}

impl PointForecastProvider for CarbonAwareAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::CarbonAware
    }

    fn best_start<'a>(&'a self, window: ForecastWindow) -> ProviderFuture<'a, Option<ForecastPoint>> {
        Box::pin(async move {
            let response = self.get(self.forecast_request_url(&window)).await?;
            parse_forecast(&response.body)
        })
    }
}

impl IntensityProvider for CarbonAwareAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::CarbonAware
    }

    fn current_intensity<'a>(&'a self) -> ProviderFuture<'a, Option<CurrentIntensity>> {
        Box::pin(async move {
            let url = format!(
                "{}?location={}",
                self.intensity_url,
                urlencoding::encode(&self.location)
            );
            let response = self.get(url).await?;
            parse_current(&response.body)
        })
    }
}
