use std::sync::Arc;
use tracing::info;

use crate::adapters::LendingApiClient;
use crate::config::AppConfig;
use crate::error::Result;

use super::{DryRunGateway, LendingGateway};

/// Create the runtime lending gateway from `AppConfig`.
///
/// `dry_run` from the command line wins over the config file.
pub fn build_lending_gateway(
    app_config: &AppConfig,
    dry_run: bool,
) -> Result<Arc<dyn LendingGateway>> {
    if dry_run || app_config.lending.dry_run {
        info!("Using dry-run lending gateway");
        return Ok(Arc::new(DryRunGateway::new()));
    }

    let client = LendingApiClient::from_config(&app_config.lending)?;
    info!("Using lending endpoint {}", client.endpoint());
    Ok(Arc::new(client))
}
