use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::data_source::{ProviderFuture, RawSeriesProvider, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::ProviderId;

pub const ENERGY_CHARTS_CO2EQ_URL: &str = "https://api.energy-charts.info/co2eq";

/// Raw `co2eq` series from the Energy-Charts public API.
#[derive(Clone)]
pub struct EnergyChartsAdapter {
    http_client: Arc<dyn HttpClient>,
    country: String,
    base_url: String,
    timeout: Duration,
}

impl EnergyChartsAdapter {
    pub fn new(country: impl Into<String>) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()), country)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, country: impl Into<String>) -> Self {
        Self {
            http_client,
            country: country.into(),
            base_url: String::from(ENERGY_CHARTS_CO2EQ_URL),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> String {
        format!(
            "{}?country={}",
            self.base_url,
            urlencoding::encode(&self.country)
        )
    }
}

impl RawSeriesProvider for EnergyChartsAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::EnergyCharts
    }

    fn fetch_series<'a>(&'a self) -> ProviderFuture<'a, Value> {
        Box::pin(async move {
            let url = self.url();
            debug!(%url, "energy-charts request");
            let request = HttpRequest::get(url)
                .with_header("accept", "application/json")
                .with_timeout(self.timeout);

            let response = self
                .http_client
                .execute(request)
                .await
                .map_err(|error| SourceError::from_http(self.id(), &error))?;

            if response.is_client_error() {
                return Err(SourceError::rejected(response.status, response.body));
            }
            if !response.is_success() {
                return Err(SourceError::unavailable(format!(
                    "energy_charts upstream returned status {}",
                    response.status
                )));
            }

            response.json().map_err(|error| {
                SourceError::invalid_payload(format!("energy_charts body is not JSON: {error}"))
            })
        })
    }
}
