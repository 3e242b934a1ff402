//! Session commands and the login/teardown helpers shared by all commands
//! that need an unlocked vault.

use sealed_core::reply::{Empty, LoginFieldsPayload, Reply, StatusPayload, VersionPayload};
use sealed_core::{LoginCredentials, VaultBridge, VaultError, VaultOperations};
use tracing::warn;

use crate::cli::{Cli, OutputFormat};
use crate::error::CliError;
use crate::output::emit;
use crate::util::{create_bridge, master_password, non_empty, prompt_line};

/// Logs in and loads the vault
///
/// Prompts for a two-step code when the server asks for one and `--code`
/// was not given. On failure the session is torn down and the error is
/// reported in the selected format.
pub async fn open(cli: &Cli) -> Result<VaultBridge, CliError> {
    let bridge = create_bridge(cli)?;
    let email = non_empty(cli.email.as_deref()).unwrap_or_default();
    let mut credentials = LoginCredentials::new(
        email,
        master_password()?,
        cli.code.clone().unwrap_or_default(),
    );

    let mut result = bridge.login(credentials.clone()).await;
    if matches!(result, Err(VaultError::TwoFactorRequired)) && credentials.totp.is_none() {
        let code = prompt_line("Two-step login code: ")?;
        credentials.totp = non_empty(Some(code.as_str()));
        result = bridge.login(credentials).await;
    }

    match result {
        Ok(()) => Ok(bridge),
        Err(e) => {
            close(&bridge).await;
            Err(report(cli.format, e))
        }
    }
}

/// Ends the session; failures are logged, not returned
pub async fn close(bridge: &VaultBridge) {
    if let Err(e) = bridge.cleanup().await {
        warn!(error = %e, "Failed to end the vault session");
    }
}

/// Reports a failure that happened before any payload was produced
pub fn report(format: OutputFormat, err: VaultError) -> CliError {
    let reply: Reply<Empty> = Reply::failure(err.kind(), err.user_message());
    match emit(&reply, format) {
        Err(e) => e,
        Ok(()) => CliError::from(err),
    }
}

/// Status command handler
pub async fn cmd_status(cli: &Cli) -> Result<(), CliError> {
    let bridge = create_bridge(cli)?;
    let result = bridge.status().await.map(|status| StatusPayload {
        status,
        session: bridge.session_state(),
    });
    emit(&Reply::from(result), cli.format)
}

/// Fields command handler
pub async fn cmd_fields(cli: &Cli) -> Result<(), CliError> {
    let bridge = create_bridge(cli)?;
    let result = bridge
        .required_login_fields()
        .await
        .map(LoginFieldsPayload::from);
    emit(&Reply::from(result), cli.format)
}

/// Check command handler
pub async fn cmd_check(cli: &Cli) -> Result<(), CliError> {
    let bridge = create_bridge(cli)?;
    let result = bridge
        .check_cli()
        .await
        .map(|version| VersionPayload { version });
    emit(&Reply::from(result), cli.format)
}

/// Login command handler
pub async fn cmd_login(cli: &Cli) -> Result<(), CliError> {
    let bridge = open(cli).await?;
    let result = bridge.status().await.map(|status| StatusPayload {
        status,
        session: bridge.session_state(),
    });
    close(&bridge).await;
    emit(&Reply::from(result), cli.format)
}
