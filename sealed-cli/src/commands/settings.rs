//! Settings commands.

use sealed_core::VaultOperations;
use sealed_core::reply::{ConfigurationPayload, Empty, Reply};

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::emit;
use crate::util::create_bridge;

/// Server command handler
pub async fn cmd_server(cli: &Cli, url: &str) -> Result<(), CliError> {
    let bridge = create_bridge(cli)?;
    let result = bridge.set_server_url(url.to_string()).await;
    emit(&Reply::from(result.map(Empty::from)), cli.format)
}

/// Crash-logs command handler
pub async fn cmd_crash_logs(cli: &Cli, enabled: bool) -> Result<(), CliError> {
    let bridge = create_bridge(cli)?;
    let result = bridge.set_crash_logs_enabled(enabled).await;
    emit(&Reply::from(result.map(Empty::from)), cli.format)
}

/// Config command handler
pub async fn cmd_config(cli: &Cli) -> Result<(), CliError> {
    let bridge = create_bridge(cli)?;
    let result = bridge
        .get_configuration()
        .await
        .map(ConfigurationPayload::from);
    emit(&Reply::from(result), cli.format)
}
