mod best_start;
mod current;
mod watch;

use std::process::ExitCode;
use std::sync::Arc;

use carbonwise_core::{CarbonRouterBuilder, EngineConfig};
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Exit code for a well-formed answer whose status is not `OK`.
const NON_OK_STATUS: u8 = 3;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let config = load_config(cli)?;
    debug!(
        location = %config.location,
        fallback = config.api_key.is_some(),
        "engine configured"
    );

    match &cli.command {
        Command::BestStart(args) => {
            let router = CarbonRouterBuilder::from_config(config.clone()).build();
            best_start::run(args, &router, &config, cli.pretty).await
        }
        Command::Current => {
            let router = CarbonRouterBuilder::from_config(config.clone()).build();
            current::run(&router, &config, cli.pretty).await
        }
        Command::Watch(args) => {
            let interval = args
                .refresh_minutes
                .filter(|minutes| *minutes > 0)
                .map(|minutes| std::time::Duration::from_secs(minutes * 60))
                .unwrap_or(config.refresh_interval);
            let router = Arc::new(CarbonRouterBuilder::from_config(config).build());
            watch::run(args, router, interval, cli.pretty).await
        }
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig, CliError> {
    let config = EngineConfig::from_env()?;
    match cli.location.as_deref() {
        Some(location) => Ok(config.with_location(location)?),
        None => Ok(config),
    }
}

fn exit_for(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(NON_OK_STATUS)
    }
}
