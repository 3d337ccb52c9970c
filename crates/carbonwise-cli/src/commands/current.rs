use std::process::ExitCode;

use carbonwise_core::{CarbonRouter, EngineConfig, ValueStatus};

use crate::error::CliError;
use crate::output;

pub async fn run(
    router: &CarbonRouter,
    config: &EngineConfig,
    pretty: bool,
) -> Result<ExitCode, CliError> {
    let mut response = router.current_value().await;
    response.warnings.extend(config.warnings.iter().cloned());

    output::render(&response, pretty)?;
    Ok(super::exit_for(response.status == ValueStatus::Ok))
}
