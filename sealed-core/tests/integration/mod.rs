//! Shared fixtures for the scenario tests

mod item_tests;
mod session_tests;
mod settings_tests;

use std::sync::Arc;

use secrecy::SecretString;
use sealed_core::testing::{DEFAULT_EMAIL, DEFAULT_PASSWORD, ScriptedRunner};
use sealed_core::{BridgeOptions, ConfigManager, LoginCredentials, VaultBridge};
use tempfile::TempDir;

/// A bridge over a scripted CLI, with its own configuration directory
pub struct Fixture {
    pub runner: Arc<ScriptedRunner>,
    pub bridge: VaultBridge,
    pub config_dir: TempDir,
}

impl Fixture {
    pub fn new(runner: ScriptedRunner) -> Self {
        Self::with_options(runner, BridgeOptions::default())
    }

    pub fn with_options(runner: ScriptedRunner, options: BridgeOptions) -> Self {
        let config_dir = TempDir::new().expect("temp dir");
        let runner = Arc::new(runner);
        let bridge = VaultBridge::with_runner(
            runner.clone(),
            options,
            ConfigManager::with_config_dir(config_dir.path().to_path_buf()),
        )
        .expect("bridge");
        Self {
            runner,
            bridge,
            config_dir,
        }
    }

    pub fn config_manager(&self) -> ConfigManager {
        ConfigManager::with_config_dir(self.config_dir.path().to_path_buf())
    }
}

pub fn credentials(code: &str) -> LoginCredentials {
    LoginCredentials::new(DEFAULT_EMAIL, SecretString::from(DEFAULT_PASSWORD), code)
}
