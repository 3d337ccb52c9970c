use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use carbonwise_core::{CarbonRouter, RefreshTask};
use tracing::info;

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output;

/// Runs until interrupted, printing one JSON line per reading.
pub async fn run(
    args: &WatchArgs,
    router: Arc<CarbonRouter>,
    refresh_interval: Duration,
    pretty: bool,
) -> Result<ExitCode, CliError> {
    if args.every_secs == 0 {
        return Err(CliError::Command(String::from("--every-secs must be positive")));
    }

    info!(
        location = %router.location(),
        refresh_secs = refresh_interval.as_secs(),
        "starting watch"
    );
    let refresher = RefreshTask::spawn(Arc::clone(&router), refresh_interval);
    let mut ticker = tokio::time::interval(Duration::from_secs(args.every_secs));

    let outcome = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let response = router.current_value().await;
                if let Err(error) = output::render(&response, pretty) {
                    break Err(error);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                break signal.map(|()| ExitCode::SUCCESS).map_err(CliError::from);
            }
        }
    };

    refresher.shutdown().await;
    outcome
}
