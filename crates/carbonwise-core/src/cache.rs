//! Time-bounded cache of the raw series with retrying fetch.
//!
//! The cache holds at most one entry, replaced wholesale by swapping an
//! `Arc`. Readers clone the `Arc` under a short read lock and never wait on
//! a fetch while the entry is fresh. Misses are fetched on a spawned task
//! so a caller dropping its future does not abort a fetch other callers
//! are waiting for.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::data_source::{RawSeriesProvider, SourceError};
use crate::parser::parse_co2eq_grid;
use crate::retry::RetryConfig;
use crate::{IntensityGrid, Series, UtcDateTime};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// How a lookup treats an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a fresh entry if present, fetch otherwise.
    #[default]
    Use,
    /// Always fetch and replace the entry on success.
    Refresh,
}

/// One successful fetch. Immutable once built; parsed views are derived
/// lazily on first access.
#[derive(Debug)]
pub struct CacheEntry {
    payload: Value,
    fetched_at: Instant,
    fetched_at_utc: UtcDateTime,
    grid: OnceLock<IntensityGrid>,
    series: OnceLock<Series>,
}

impl CacheEntry {
    pub fn new(payload: Value, fetched_at: Instant, fetched_at_utc: UtcDateTime) -> Self {
        Self {
            payload,
            fetched_at,
            fetched_at_utc,
            grid: OnceLock::new(),
            series: OnceLock::new(),
        }
    }

    /// Wall-clock time of the fetch, for reporting.
    pub fn fetched_at_utc(&self) -> UtcDateTime {
        self.fetched_at_utc
    }

    /// Monotonic time since the fetch.
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// `true` while the entry is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }

    /// Raw points, gaps included. Parsed on first access.
    pub fn grid(&self) -> &IntensityGrid {
        self.grid.get_or_init(|| parse_co2eq_grid(&self.payload))
    }

    /// Usable samples only. Derived from [`CacheEntry::grid`].
    pub fn series(&self) -> &Series {
        self.series.get_or_init(|| Series::from_grid(self.grid()))
    }
}

/// Entry returned by a lookup.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub entry: Arc<CacheEntry>,
    pub cache_hit: bool,
}

#[derive(Debug)]
struct CacheInner {
    slot: RwLock<Option<Arc<CacheEntry>>>,
    fetch_gate: Mutex<()>,
    ttl: Duration,
    attempt_timeout: Duration,
    retry: RetryConfig,
}

impl CacheInner {
    async fn fresh_entry(&self) -> Option<Arc<CacheEntry>> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(Arc::clone)
    }

    async fn fetch_gated(
        &self,
        provider: Arc<dyn RawSeriesProvider>,
        mode: CacheMode,
    ) -> Result<CacheLookup, SourceError> {
        let _gate = self.fetch_gate.lock().await;

        // Another task may have refreshed while this one waited at the gate.
        if mode == CacheMode::Use {
            if let Some(entry) = self.fresh_entry().await {
                return Ok(CacheLookup {
                    entry,
                    cache_hit: true,
                });
            }
        }

        let payload = self.fetch_with_retry(provider.as_ref()).await?;
        let entry = Arc::new(CacheEntry::new(payload, Instant::now(), UtcDateTime::now()));
        *self.slot.write().await = Some(Arc::clone(&entry));
        info!(provider = %provider.id(), "raw series cache refreshed");

        Ok(CacheLookup {
            entry,
            cache_hit: false,
        })
    }

    async fn fetch_with_retry(&self, provider: &dyn RawSeriesProvider) -> Result<Value, SourceError> {
        let attempts = self.retry.max_attempts();
        let mut last_error = None;

        for attempt in 0..attempts {
            debug!(provider = %provider.id(), attempt = attempt + 1, "fetching raw series");
            let outcome = tokio::time::timeout(self.attempt_timeout, provider.fetch_series())
                .await
                .unwrap_or_else(|_| {
                    Err(SourceError::timeout(format!(
                        "{} fetch exceeded {}s",
                        provider.id(),
                        self.attempt_timeout.as_secs()
                    )))
                });

            match outcome {
                Ok(payload) => return Ok(payload),
                Err(error) => {
                    warn!(
                        provider = %provider.id(),
                        attempt = attempt + 1,
                        error = %error,
                        "raw series fetch attempt failed"
                    );
                    let permanent = !error.retryable();
                    last_error = Some(error);
                    if permanent {
                        break;
                    }
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| SourceError::internal("no fetch attempt was made")))
    }
}

/// Shared single-entry cache for one configured location.
#[derive(Debug, Clone)]
pub struct FetchCache {
    inner: Arc<CacheInner>,
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, RetryConfig::default())
    }
}

impl FetchCache {
    /// Cache with the default per-attempt deadline of 60 seconds.
    pub fn new(ttl: Duration, retry: RetryConfig) -> Self {
        Self::with_attempt_timeout(ttl, retry, DEFAULT_ATTEMPT_TIMEOUT)
    }

    /// Cache whose provider attempts are each cut off after `attempt_timeout`.
    pub fn with_attempt_timeout(ttl: Duration, retry: RetryConfig, attempt_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                slot: RwLock::new(None),
                fetch_gate: Mutex::new(()),
                ttl,
                attempt_timeout,
                retry,
            }),
        }
    }

    /// Serves the fresh entry or fetches a new one.
    ///
    /// On failure the previous entry, stale or not, is left in place and the
    /// last attempt's error is returned.
    pub async fn get_or_fetch(
        &self,
        provider: Arc<dyn RawSeriesProvider>,
    ) -> Result<CacheLookup, SourceError> {
        self.lookup(provider, CacheMode::Use).await
    }

    /// Forces a fetch regardless of freshness.
    pub async fn refresh(
        &self,
        provider: Arc<dyn RawSeriesProvider>,
    ) -> Result<CacheLookup, SourceError> {
        self.lookup(provider, CacheMode::Refresh).await
    }

    pub async fn lookup(
        &self,
        provider: Arc<dyn RawSeriesProvider>,
        mode: CacheMode,
    ) -> Result<CacheLookup, SourceError> {
        if mode == CacheMode::Use {
            if let Some(entry) = self.inner.fresh_entry().await {
                debug!(age_secs = entry.age().as_secs(), "raw series cache hit");
                return Ok(CacheLookup {
                    entry,
                    cache_hit: true,
                });
            }
        }

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.fetch_gated(provider, mode).await });
        task.await
            .map_err(|error| SourceError::internal(format!("fetch task failed: {error}")))?
    }

    /// Current entry regardless of age.
    pub async fn peek(&self) -> Option<Arc<CacheEntry>> {
        self.inner.slot.read().await.as_ref().map(Arc::clone)
    }

    /// Installs an entry directly, replacing any existing one.
    pub async fn seed(&self, payload: Value) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry::new(payload, Instant::now(), UtcDateTime::now()));
        *self.inner.slot.write().await = Some(Arc::clone(&entry));
        entry
    }

    pub async fn clear(&self) {
        *self.inner.slot.write().await = None;
    }
}
