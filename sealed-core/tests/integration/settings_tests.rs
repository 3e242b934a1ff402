//! Persisted settings, server switching and TOTP

use std::sync::Arc;

use secrecy::SecretString;
use sealed_core::testing::{ScriptedFailure, ScriptedRunner};
use sealed_core::{
    BridgeOptions, ConfigManager, SessionState, VaultBridge, VaultError, VaultOperations,
};

use super::{Fixture, credentials};

#[tokio::test]
async fn defaults_without_config_file() {
    let fixture = Fixture::new(ScriptedRunner::new());
    let config = fixture.bridge.get_configuration().await.unwrap();
    assert_eq!(config.server_url, "bitwarden.com");
    assert!(!config.crash_logs_enabled);
}

#[tokio::test]
async fn crash_log_opt_in_is_persisted() {
    let fixture = Fixture::new(ScriptedRunner::new());

    fixture.bridge.set_crash_logs_enabled(true).await.unwrap();

    assert!(fixture.bridge.get_configuration().await.unwrap().crash_logs_enabled);
    assert!(fixture.config_manager().load().unwrap().crash_logs_enabled);

    let reopened = VaultBridge::with_runner(
        fixture.runner.clone(),
        BridgeOptions::default(),
        fixture.config_manager(),
    )
    .unwrap();
    assert!(reopened.get_configuration().await.unwrap().crash_logs_enabled);
}

#[tokio::test]
async fn server_change_logs_out_and_persists() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture.bridge.login(credentials("")).await.unwrap();

    fixture
        .bridge
        .set_server_url(" https://vault.example.com/ ".to_string())
        .await
        .unwrap();

    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedOut);
    assert!(!fixture.runner.is_logged_in());
    assert_eq!(fixture.runner.server_url(), "https://vault.example.com");
    assert_eq!(
        fixture.config_manager().load().unwrap().server_url,
        "https://vault.example.com"
    );
    assert!(matches!(
        fixture.bridge.list_items(false).await,
        Err(VaultError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn failed_server_change_keeps_previous_server() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture
        .runner
        .fail_command("config", ScriptedFailure::Exit("Invalid URL.".to_string()));

    let result = fixture
        .bridge
        .set_server_url("https://vault.example.com".to_string())
        .await;

    assert!(matches!(result, Err(VaultError::Config(_))));
    assert_eq!(fixture.runner.server_url(), "https://vault.bitwarden.com");
    assert_eq!(
        fixture.bridge.get_configuration().await.unwrap().server_url,
        "bitwarden.com"
    );
    assert_eq!(fixture.config_manager().load().unwrap().server_url, "bitwarden.com");
}

#[tokio::test]
async fn blank_server_url_is_rejected_locally() {
    let fixture = Fixture::new(ScriptedRunner::new());
    let result = fixture.bridge.set_server_url("   ".to_string()).await;
    assert!(matches!(result, Err(VaultError::Validation(_))));
    assert!(fixture.runner.calls().is_empty());
}

#[tokio::test]
async fn malformed_config_file_is_a_config_error() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "server_url = [").unwrap();

    let result = VaultBridge::with_runner(
        Arc::new(ScriptedRunner::new()),
        BridgeOptions::default(),
        ConfigManager::with_config_dir(dir.path().to_path_buf()),
    );
    assert!(matches!(result, Err(VaultError::Config(_))));
}

#[tokio::test]
async fn totp_needs_no_session() {
    let fixture = Fixture::new(ScriptedRunner::new());

    let code = fixture
        .bridge
        .generate_totp(&SecretString::from("JBSWY3DPEHPK3PXP"))
        .unwrap();
    assert_eq!(code.code.len(), 6);
    assert!(code.code.chars().all(|c| c.is_ascii_digit()));
    assert!((1..=30).contains(&code.remaining_seconds));

    let invalid = fixture.bridge.generate_totp(&SecretString::from("not a secret!"));
    assert!(matches!(invalid, Err(VaultError::Totp(_))));
    assert!(fixture.runner.calls().is_empty());
}
