use std::process::ExitCode;

use carbonwise_core::{BestStartRequest, CarbonRouter, EngineConfig};

use crate::cli::BestStartArgs;
use crate::error::CliError;
use crate::output;

pub async fn run(
    args: &BestStartArgs,
    router: &CarbonRouter,
    config: &EngineConfig,
    pretty: bool,
) -> Result<ExitCode, CliError> {
    let request = BestStartRequest {
        window_start: Some(args.start.clone()),
        window_end: Some(args.end.clone()),
        duration_minutes: args.duration,
        allowed_hours: args.allowed_hours.clone(),
        min_gain: args.min_gain,
    };

    let mut response = router.best_start(&request).await;
    response.warnings.extend(config.warnings.iter().cloned());

    output::render(&response, pretty)?;
    Ok(super::exit_for(response.is_ok()))
}
