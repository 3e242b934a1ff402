//! Login, logout and session lifecycle

use std::collections::BTreeSet;
use std::time::Duration;

use secrecy::SecretString;
use sealed_core::testing::{DEFAULT_EMAIL, ScriptedFailure, ScriptedRunner};
use sealed_core::{LoginCredentials, LoginField, SessionState, VaultError, VaultOperations, VaultStatus};
use serde_json::json;

use super::{Fixture, credentials};

#[tokio::test]
async fn login_loads_the_vault() {
    let runner = ScriptedRunner::new()
        .with_item(json!({"type": 1, "name": "GitHub"}))
        .with_item(json!({"type": 3, "name": "Visa", "deletedDate": "2025-03-01T00:00:00.000Z"}));
    let fixture = Fixture::new(runner);

    fixture.bridge.login(credentials("")).await.unwrap();

    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedIn);
    assert_eq!(fixture.bridge.list_items(false).await.unwrap().len(), 1);
    assert_eq!(fixture.bridge.list_trash().await.unwrap().len(), 1);
    assert_eq!(fixture.bridge.status().await.unwrap(), VaultStatus::Unlocked);
}

#[tokio::test]
async fn operations_require_login() {
    let fixture = Fixture::new(ScriptedRunner::new());

    assert!(matches!(
        fixture.bridge.list_items(true).await,
        Err(VaultError::NotAuthenticated)
    ));
    assert!(matches!(
        fixture.bridge.list_trash().await,
        Err(VaultError::NotAuthenticated)
    ));
    assert!(matches!(
        fixture.bridge.refresh().await,
        Err(VaultError::NotAuthenticated)
    ));
    assert!(matches!(
        fixture.bridge.generate_password(None).await,
        Err(VaultError::NotAuthenticated)
    ));
    assert!(matches!(
        fixture.bridge.logout().await,
        Err(VaultError::NotAuthenticated)
    ));
    assert!(fixture.runner.calls().is_empty());
}

#[tokio::test]
async fn wrong_password_stays_logged_out() {
    let fixture = Fixture::new(ScriptedRunner::new());
    let result = fixture
        .bridge
        .login(LoginCredentials::new(DEFAULT_EMAIL, SecretString::from("nope"), ""))
        .await;

    match result {
        Err(e @ VaultError::Authentication { .. }) => {
            assert!(!e.user_message().contains("nope"));
        }
        other => panic!("expected an authentication error, got {other:?}"),
    }
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedOut);
    assert_eq!(fixture.runner.count_calls("sync"), 0);
}

#[tokio::test]
async fn two_factor_login_scenario() {
    let fixture = Fixture::new(ScriptedRunner::new().with_two_factor("123456"));

    let first = fixture.bridge.login(credentials("")).await;
    assert!(matches!(first, Err(VaultError::TwoFactorRequired)));
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedOut);

    fixture.bridge.login(credentials("123456")).await.unwrap();
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedIn);
    assert_eq!(fixture.runner.count_calls("sync"), 1);
    assert_eq!(fixture.runner.count_calls("list"), 2);
}

#[tokio::test]
async fn wrong_two_factor_code_is_an_authentication_error() {
    let fixture = Fixture::new(ScriptedRunner::new().with_two_factor("123456"));
    let result = fixture.bridge.login(credentials("000000")).await;
    assert!(matches!(result, Err(VaultError::Authentication { .. })));
}

#[tokio::test]
async fn concurrent_logins_produce_one_session() {
    let fixture = Fixture::new(ScriptedRunner::new().with_delay(Duration::from_millis(20)));

    let attempts = (0..5).map(|_| {
        let bridge = fixture.bridge.clone();
        async move { bridge.login(credentials("")).await }
    });
    let results = futures::future::join_all(attempts).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedIn);
    assert_eq!(fixture.runner.count_calls("login"), 1);
    assert_eq!(fixture.runner.count_calls("sync"), 1);
    assert_eq!(fixture.runner.max_concurrency(), 1);
}

#[tokio::test]
async fn empty_email_unlocks_logged_in_account() {
    let fixture = Fixture::new(ScriptedRunner::new().with_logged_in_account());

    let fields = fixture.bridge.required_login_fields().await.unwrap();
    assert_eq!(fields, BTreeSet::from([LoginField::Password]));

    fixture
        .bridge
        .login(LoginCredentials::new("", SecretString::from("hunter2"), ""))
        .await
        .unwrap();

    assert_eq!(fixture.runner.count_calls("login"), 0);
    assert_eq!(fixture.runner.count_calls("unlock"), 1);
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedIn);
}

#[tokio::test]
async fn already_logged_in_account_falls_back_to_unlock() {
    let fixture = Fixture::new(ScriptedRunner::new().with_logged_in_account());

    fixture.bridge.login(credentials("")).await.unwrap();

    assert_eq!(fixture.runner.count_calls("login"), 1);
    assert_eq!(fixture.runner.count_calls("unlock"), 1);
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedIn);
}

#[tokio::test]
async fn required_login_fields_follow_state() {
    let fixture = Fixture::new(ScriptedRunner::new());

    let fields = fixture.bridge.required_login_fields().await.unwrap();
    assert_eq!(
        fields,
        BTreeSet::from([LoginField::Email, LoginField::Password, LoginField::Totp])
    );

    fixture.bridge.login(credentials("")).await.unwrap();
    assert!(fixture.bridge.required_login_fields().await.unwrap().is_empty());
}

#[tokio::test]
async fn logout_clears_session_and_cache() {
    let runner = ScriptedRunner::new().with_item(json!({"type": 1, "name": "GitHub"}));
    let fixture = Fixture::new(runner);
    fixture.bridge.login(credentials("")).await.unwrap();

    fixture.bridge.logout().await.unwrap();

    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedOut);
    assert!(!fixture.runner.is_logged_in());
    assert!(matches!(
        fixture.bridge.list_items(true).await,
        Err(VaultError::NotAuthenticated)
    ));

    // Logging back in reloads from the vault
    fixture.bridge.login(credentials("")).await.unwrap();
    assert_eq!(fixture.bridge.list_items(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn cleanup_is_safe_to_repeat() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture.bridge.login(credentials("")).await.unwrap();

    fixture.bridge.cleanup().await.unwrap();
    fixture.bridge.cleanup().await.unwrap();

    assert!(!fixture.runner.is_logged_in());
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedOut);
    assert_eq!(fixture.runner.count_calls("logout"), 1);
}

#[tokio::test]
async fn cleanup_without_session_leaves_cli_account_alone() {
    let fixture = Fixture::new(ScriptedRunner::new().with_logged_in_account());
    fixture.runner.fail_command("logout", ScriptedFailure::Spawn);

    fixture.bridge.cleanup().await.unwrap();

    assert_eq!(fixture.runner.count_calls("logout"), 0);
    assert!(fixture.runner.is_logged_in());
    assert_eq!(
        fixture.bridge.required_login_fields().await.unwrap(),
        BTreeSet::from([LoginField::Password])
    );
}

#[tokio::test]
async fn login_while_logged_in_checks_credentials() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture.bridge.login(credentials("")).await.unwrap();

    let other_account = fixture
        .bridge
        .login(LoginCredentials::new("mallory@evil.com", SecretString::from("wrong"), ""))
        .await;
    assert!(matches!(other_account, Err(VaultError::Authentication { .. })));

    let wrong_password = fixture
        .bridge
        .login(LoginCredentials::new(DEFAULT_EMAIL, SecretString::from("wrong"), ""))
        .await;
    assert!(matches!(wrong_password, Err(VaultError::Authentication { .. })));

    // The open session survives refused attempts
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedIn);
    assert!(fixture.bridge.list_items(false).await.is_ok());

    fixture.bridge.login(credentials("")).await.unwrap();
    assert_eq!(fixture.runner.count_calls("login"), 1);
    assert_eq!(fixture.runner.count_calls("sync"), 1);
    assert_eq!(fixture.bridge.status().await.unwrap(), VaultStatus::Unlocked);
}

#[tokio::test]
async fn rejected_key_during_login_reload_logs_out() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture
        .runner
        .fail_command("sync", ScriptedFailure::Exit("You are not logged in.".to_string()));

    let result = fixture.bridge.login(credentials("")).await;

    assert!(matches!(result, Err(VaultError::NotAuthenticated)));
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedOut);
    assert!(matches!(
        fixture.bridge.list_items(false).await,
        Err(VaultError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn login_reload_failure_is_reported() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture
        .runner
        .fail_command("sync", ScriptedFailure::Exit("getaddrinfo ENOTFOUND vault".to_string()));

    let result = fixture.bridge.login(credentials("")).await;
    assert!(matches!(result, Err(VaultError::Sync(_))));
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedIn);

    // A later login retries the reload without logging in again
    fixture.runner.clear_failure("sync");
    fixture.bridge.login(credentials("")).await.unwrap();
    assert_eq!(fixture.runner.count_calls("login"), 1);
    assert_eq!(fixture.runner.count_calls("sync"), 2);
}

#[tokio::test]
async fn missing_cli_is_a_spawn_error() {
    let fixture = Fixture::new(ScriptedRunner::new());
    assert_eq!(fixture.bridge.check_cli().await.unwrap(), sealed_core::testing::CLI_VERSION);

    fixture.runner.fail_command("--version", ScriptedFailure::Spawn);
    assert!(matches!(
        fixture.bridge.check_cli().await,
        Err(VaultError::ProcessSpawn { .. })
    ));
}

#[tokio::test]
async fn secrets_never_reach_the_command_line() {
    let fixture = Fixture::new(ScriptedRunner::new());
    fixture.bridge.login(credentials("")).await.unwrap();

    for call in fixture.runner.calls() {
        assert!(call.args.iter().all(|a| !a.contains("hunter2")));
        assert!(call.args.iter().all(|a| !a.starts_with("session-key")));
    }
}
