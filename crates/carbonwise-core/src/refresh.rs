//! Background job that keeps the primary series cache warm.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::routing::CarbonRouter;
use crate::UtcDateTime;

/// Periodic refresh of the router's cache.
///
/// Each cycle forces a fetch; a failed cycle is logged and the next one is
/// scheduled as usual, leaving the previous entry in place.
pub struct RefreshTask {
    shutdown: Arc<Notify>,
    last_success: Arc<Mutex<Option<UtcDateTime>>>,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Starts the loop on the current runtime. The first cycle runs
    /// immediately.
    pub fn spawn(router: Arc<CarbonRouter>, interval: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let last_success = Arc::new(Mutex::new(None));

        let handle = tokio::spawn(refresh_loop(
            router,
            interval,
            Arc::clone(&shutdown),
            Arc::clone(&last_success),
        ));

        Self {
            shutdown,
            last_success,
            handle,
        }
    }

    /// Time of the last successful cycle, if any.
    pub async fn last_success(&self) -> Option<UtcDateTime> {
        *self.last_success.lock().await
    }

    /// Stops the loop and waits for an in-flight cycle to end.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(error) = self.handle.await {
            warn!(%error, "refresh task ended abnormally");
        }
    }
}

async fn refresh_loop(
    router: Arc<CarbonRouter>,
    interval: Duration,
    shutdown: Arc<Notify>,
    last_success: Arc<Mutex<Option<UtcDateTime>>>,
) {
    loop {
        match router.refresh_now().await {
            Ok(()) => {
                info!(location = %router.location(), "refreshed intensity series");
                *last_success.lock().await = Some(UtcDateTime::now());
            }
            Err(error) => {
                warn!(
                    location = %router.location(),
                    %error,
                    next_in_secs = interval.as_secs(),
                    "scheduled refresh failed"
                );
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.notified() => break,
        }
    }
    info!(location = %router.location(), "refresh task stopped");
}
