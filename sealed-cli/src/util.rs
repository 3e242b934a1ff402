//! Shared utility functions used across command modules.

use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use sealed_core::{BridgeOptions, ConfigManager, VaultBridge};

use crate::cli::Cli;
use crate::error::CliError;

/// Environment variable that supplies the master password non-interactively
pub const MASTER_PASSWORD_ENV: &str = "SEALED_MASTER_PASSWORD";

/// Creates a `ConfigManager` using the optional custom config directory
/// from CLI args.
pub fn create_config_manager(config_path: Option<&Path>) -> Result<ConfigManager, CliError> {
    match config_path {
        Some(path) => Ok(ConfigManager::with_config_dir(path.to_path_buf())),
        None => ConfigManager::new().map_err(CliError::from),
    }
}

/// Builds the bridge options from the global flags
pub fn bridge_options(cli: &Cli) -> BridgeOptions {
    let mut options = BridgeOptions::from_env().with_timeout(Duration::from_secs(cli.timeout));
    if let Some(path) = &cli.bw {
        options = options.with_cli_path(path);
    }
    if let Some(dir) = &cli.data_dir {
        options = options.with_data_dir(dir);
    }
    options
}

/// Creates the vault bridge for this invocation
pub fn create_bridge(cli: &Cli) -> Result<VaultBridge, CliError> {
    let config = create_config_manager(cli.config.as_deref())?;
    Ok(VaultBridge::new(bridge_options(cli), config)?)
}

/// Reads a secret without echoing it
pub fn prompt_secret(prompt: &str) -> Result<SecretString, CliError> {
    let value = rpassword::prompt_password(prompt)?;
    Ok(SecretString::from(value))
}

/// Reads the master password from the environment or the terminal
pub fn master_password() -> Result<SecretString, CliError> {
    match std::env::var(MASTER_PASSWORD_ENV) {
        Ok(value) if !value.is_empty() => Ok(SecretString::from(value)),
        _ => prompt_secret("Master password: "),
    }
}

/// Reads one visible line from the terminal
pub fn prompt_line(prompt: &str) -> Result<String, CliError> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{prompt}")?;
    stderr.flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Treats an empty optional text as absent
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
