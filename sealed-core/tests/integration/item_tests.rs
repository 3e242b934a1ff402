//! Item operations against a logged-in bridge

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sealed_core::testing::{ScriptedFailure, ScriptedRunner};
use sealed_core::{
    BridgeOptions, CardDraft, ItemDraft, ItemId, ItemView, LoginDraft, SessionState, VaultError,
    VaultItem, VaultOperations,
};
use serde_json::json;

use super::{Fixture, credentials};

async fn logged_in(runner: ScriptedRunner) -> Fixture {
    let fixture = Fixture::new(runner);
    fixture.bridge.login(credentials("")).await.expect("login");
    fixture
}

fn github_draft() -> ItemDraft {
    ItemDraft::login()
        .with_name("GitHub")
        .with_notes("work account")
        .with_favorite(true)
        .with_login(LoginDraft {
            username: Some("ada".to_string()),
            password: Some(SecretString::from("s3cret")),
            totp: None,
        })
}

fn find<'a>(items: &'a [VaultItem], id: &ItemId) -> Option<&'a VaultItem> {
    items.iter().find(|item| &item.id == id)
}

fn contains(items: &[VaultItem], id: &ItemId) -> bool {
    find(items, id).is_some()
}

// ========== Create ==========

#[tokio::test]
async fn created_item_is_listed_with_server_fields() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    let id = fixture.bridge.create_item(github_draft()).await.unwrap();

    let items = fixture.bridge.list_items(false).await.unwrap();
    let item = find(&items, &id).expect("created item is cached");
    let view = ItemView::from_item(item);

    assert!(!view.id.is_empty());
    assert!(!view.created.is_empty());
    assert!(!view.updated.is_empty());
    assert_eq!(view.name, "GitHub");
    assert_eq!(view.item_type, "login");
    assert_eq!(view.notes, "work account");
    assert!(view.favorite);
    assert_eq!(view.username, "ada");
    assert_eq!(view.password, "s3cret");
    assert!(!view.trashed);
}

#[tokio::test]
async fn created_card_keeps_expiry() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    let draft = ItemDraft::card().with_name("Visa").with_card(CardDraft {
        cardholder_name: Some("Ada Lovelace".to_string()),
        brand: Some("Visa".to_string()),
        number: Some(SecretString::from("4111111111111111")),
        exp_month: Some("3".to_string()),
        exp_year: Some("2030".to_string()),
        code: Some(SecretString::from("123")),
    });
    let id = fixture.bridge.create_item(draft).await.unwrap();

    let items = fixture.bridge.list_items(false).await.unwrap();
    let view = ItemView::from_item(find(&items, &id).unwrap());
    assert_eq!(view.item_type, "card");
    assert_eq!(view.number, "4111111111111111");
    assert_eq!(view.expiry_month, "03");
    assert_eq!(view.expiry_year, "2030");
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_cli() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    let calls_before = fixture.runner.calls().len();

    let result = fixture
        .bridge
        .create_item(ItemDraft::login().with_name("   "))
        .await;
    assert!(matches!(result, Err(VaultError::Validation(_))));

    let bad_expiry = ItemDraft::card().with_name("Card").with_card(CardDraft {
        exp_month: Some("13".to_string()),
        ..CardDraft::default()
    });
    let result = fixture.bridge.create_item(bad_expiry).await;
    assert!(matches!(result, Err(VaultError::Validation(_))));

    assert_eq!(fixture.runner.calls().len(), calls_before);
}

#[tokio::test]
async fn failed_create_leaves_cache_untouched() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    fixture
        .runner
        .fail_command("create", ScriptedFailure::Exit("Something went wrong.".to_string()));

    let result = fixture.bridge.create_item(github_draft()).await;
    match result {
        Err(e @ VaultError::RemoteWrite { .. }) => {
            assert_eq!(e.user_message(), "Failed to create login");
        }
        other => panic!("expected a remote write error, got {other:?}"),
    }
    assert!(fixture.bridge.list_items(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_completes_when_the_caller_gives_up() {
    let fixture = logged_in(ScriptedRunner::new().with_delay(Duration::from_millis(100))).await;

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), fixture.bridge.create_item(github_draft()))
            .await;
    assert!(abandoned.is_err(), "caller timed out first");

    tokio::time::sleep(Duration::from_millis(400)).await;
    let items = fixture.bridge.list_items(false).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "GitHub");
}

// ========== Edit ==========

#[tokio::test]
async fn edit_changes_only_supplied_fields() {
    let runner = ScriptedRunner::new().with_item(json!({
        "type": 1,
        "name": "GitHub",
        "notes": "keep me",
        "favorite": false,
        "login": {
            "username": "ada",
            "password": "old",
            "uris": [{"match": null, "uri": "https://github.com"}]
        },
        "fields": [{"name": "recovery", "value": "abc", "type": 1}]
    }));
    let fixture = logged_in(runner).await;
    let id = ItemId::new("item-1");

    let draft = ItemDraft::login().with_login(LoginDraft {
        password: Some(SecretString::from("new")),
        ..LoginDraft::default()
    });
    fixture.bridge.edit_item(id.clone(), draft).await.unwrap();

    let items = fixture.bridge.list_items(false).await.unwrap();
    let item = find(&items, &id).unwrap();
    let login = item.login().unwrap();
    assert_eq!(login.password.as_ref().unwrap().expose_secret(), "new");
    assert_eq!(login.username.as_deref(), Some("ada"));
    assert_eq!(item.notes.as_deref(), Some("keep me"));

    let raw = fixture.runner.raw_item("item-1").unwrap();
    assert_eq!(raw["login"]["uris"][0]["uri"], "https://github.com");
    assert_eq!(raw["fields"][0]["name"], "recovery");
}

#[tokio::test]
async fn favourite_flag_is_editable_on_cards() {
    let runner = ScriptedRunner::new().with_item(json!({
        "type": 3, "name": "Visa", "favorite": false,
        "card": {"number": "4111111111111111", "expMonth": "1", "expYear": "2031"}
    }));
    let fixture = logged_in(runner).await;
    let id = ItemId::new("item-1");

    fixture
        .bridge
        .edit_item(id.clone(), ItemDraft::card().with_favorite(true))
        .await
        .unwrap();

    let items = fixture.bridge.list_items(false).await.unwrap();
    assert!(find(&items, &id).unwrap().favorite);
}

#[tokio::test]
async fn edit_with_wrong_kind_is_rejected_locally() {
    let runner = ScriptedRunner::new().with_item(json!({"type": 1, "name": "GitHub"}));
    let fixture = logged_in(runner).await;

    let result = fixture
        .bridge
        .edit_item(ItemId::new("item-1"), ItemDraft::card().with_name("Visa"))
        .await;
    assert!(matches!(result, Err(VaultError::Validation(_))));
    assert_eq!(fixture.runner.count_calls("get"), 0);
    assert_eq!(fixture.runner.count_calls("edit"), 0);
}

#[tokio::test]
async fn secure_notes_are_read_only() {
    let runner = ScriptedRunner::new().with_item(json!({"type": 2, "name": "Note", "notes": "x"}));
    let fixture = logged_in(runner).await;

    let result = fixture
        .bridge
        .edit_item(ItemId::new("item-1"), ItemDraft::login().with_name("Renamed"))
        .await;
    assert!(matches!(result, Err(VaultError::Validation(_))));
}

#[tokio::test]
async fn edit_of_unknown_item_is_not_found() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    let result = fixture
        .bridge
        .edit_item(ItemId::new("missing"), ItemDraft::login().with_name("x"))
        .await;
    assert!(matches!(result, Err(VaultError::NotFound(_))));
    assert_eq!(fixture.runner.count_calls("edit"), 0);
}

// ========== Trash, restore, delete ==========

#[tokio::test]
async fn trash_moves_item_between_partitions() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    let id = fixture.bridge.create_item(github_draft()).await.unwrap();

    fixture.bridge.trash_item(id.clone()).await.unwrap();

    assert!(!contains(&fixture.bridge.list_items(false).await.unwrap(), &id));
    assert!(contains(&fixture.bridge.list_items(true).await.unwrap(), &id));
    assert!(contains(&fixture.bridge.list_trash().await.unwrap(), &id));
}

#[tokio::test]
async fn restore_returns_the_item_unchanged() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    let id = fixture.bridge.create_item(github_draft()).await.unwrap();
    let before = ItemView::from_item(find(&fixture.bridge.list_items(false).await.unwrap(), &id).unwrap());

    fixture.bridge.trash_item(id.clone()).await.unwrap();
    fixture.bridge.restore_item(id.clone()).await.unwrap();

    let active = fixture.bridge.list_items(false).await.unwrap();
    let after = ItemView::from_item(find(&active, &id).unwrap());
    assert_eq!(after, before);
    assert!(fixture.bridge.list_trash().await.unwrap().is_empty());
}

#[tokio::test]
async fn trashing_twice_is_idempotent() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    let id = fixture.bridge.create_item(github_draft()).await.unwrap();

    fixture.bridge.trash_item(id.clone()).await.unwrap();
    let first: Vec<_> = fixture
        .bridge
        .list_items(true)
        .await
        .unwrap()
        .iter()
        .map(ItemView::from_item)
        .collect();

    fixture.bridge.trash_item(id.clone()).await.unwrap();
    let second: Vec<_> = fixture
        .bridge
        .list_items(true)
        .await
        .unwrap()
        .iter()
        .map(ItemView::from_item)
        .collect();

    assert_eq!(first, second);
    assert_eq!(fixture.runner.count_calls("delete"), 1);
}

#[tokio::test]
async fn trash_of_unknown_item_is_not_found() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    let result = fixture.bridge.trash_item(ItemId::new("missing")).await;
    assert!(matches!(result, Err(VaultError::NotFound(_))));
}

#[tokio::test]
async fn delete_removes_item_permanently() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    let id = fixture.bridge.create_item(github_draft()).await.unwrap();
    fixture.bridge.trash_item(id.clone()).await.unwrap();

    fixture.bridge.delete_item(id.clone()).await.unwrap();

    assert!(!contains(&fixture.bridge.list_items(true).await.unwrap(), &id));
    assert_eq!(fixture.runner.item_count(), 0);

    let edit = fixture
        .bridge
        .edit_item(id.clone(), ItemDraft::login().with_name("again"))
        .await;
    assert!(matches!(edit, Err(VaultError::NotFound(_))));

    // Deleting again is a no-op
    fixture.bridge.delete_item(id).await.unwrap();
}

// ========== Reload ==========

#[tokio::test]
async fn failed_reload_keeps_previous_cache() {
    let runner = ScriptedRunner::new()
        .with_item(json!({"type": 1, "name": "GitHub"}))
        .with_item(json!({"type": 3, "name": "Visa"}));
    let fixture = logged_in(runner).await;
    let before: Vec<_> = fixture
        .bridge
        .list_items(true)
        .await
        .unwrap()
        .iter()
        .map(ItemView::from_item)
        .collect();
    assert_eq!(before.len(), 2);

    fixture
        .runner
        .fail_command("list", ScriptedFailure::Exit("Unexpected response.".to_string()));
    let result = fixture.bridge.refresh().await;
    assert!(matches!(result, Err(VaultError::Sync(_))));

    let after: Vec<_> = fixture
        .bridge
        .list_items(true)
        .await
        .unwrap()
        .iter()
        .map(ItemView::from_item)
        .collect();
    assert_eq!(after, before);
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedIn);
}

#[tokio::test]
async fn refresh_picks_up_remote_changes() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    assert!(fixture.bridge.list_items(false).await.unwrap().is_empty());

    // Create through the bridge, then drop the local copy by reloading
    let id = fixture.bridge.create_item(github_draft()).await.unwrap();
    fixture.bridge.refresh().await.unwrap();

    assert!(contains(&fixture.bridge.list_items(false).await.unwrap(), &id));
    assert_eq!(fixture.runner.count_calls("sync"), 2);
}

#[tokio::test]
async fn timeout_keeps_session_and_cache() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    let id = fixture.bridge.create_item(github_draft()).await.unwrap();

    fixture.runner.fail_command("delete", ScriptedFailure::Timeout);
    let result = fixture.bridge.trash_item(id.clone()).await;

    assert!(matches!(result, Err(VaultError::ProcessTimeout(_))));
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedIn);
    assert!(contains(&fixture.bridge.list_items(false).await.unwrap(), &id));
}

#[tokio::test]
async fn rejected_session_logs_out() {
    let fixture = logged_in(ScriptedRunner::new()).await;
    fixture
        .runner
        .fail_command("create", ScriptedFailure::Exit("Vault is locked.".to_string()));

    let result = fixture.bridge.create_item(github_draft()).await;
    assert!(matches!(result, Err(VaultError::NotAuthenticated)));
    assert_eq!(fixture.bridge.session_state(), SessionState::LoggedOut);
    assert!(matches!(
        fixture.bridge.list_items(false).await,
        Err(VaultError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn sub_second_timeout_reports_one_second() {
    let options = BridgeOptions::default().with_timeout(Duration::from_millis(250));
    let fixture = Fixture::with_options(ScriptedRunner::new(), options);
    fixture.bridge.login(credentials("")).await.unwrap();
    let id = fixture.bridge.create_item(github_draft()).await.unwrap();

    fixture.runner.fail_command("delete", ScriptedFailure::Timeout);
    let result = fixture.bridge.trash_item(id).await;

    match result {
        Err(e @ VaultError::ProcessTimeout(1)) => {
            assert_eq!(e.to_string(), "Vault CLI timed out after 1 seconds");
        }
        other => panic!("expected a one second timeout, got {other:?}"),
    }
}

// ========== Concurrency ==========

#[tokio::test]
async fn reads_do_not_wait_for_writes() {
    let runner = ScriptedRunner::new()
        .with_item(json!({"type": 1, "name": "GitHub"}))
        .with_delay(Duration::from_millis(300));
    let fixture = logged_in(runner).await;
    let id = fixture.bridge.list_items(false).await.unwrap()[0].id.clone();

    let bridge = fixture.bridge.clone();
    let trash = tokio::spawn(async move { bridge.trash_item(id).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let items = tokio::time::timeout(Duration::from_millis(100), fixture.bridge.list_items(false))
        .await
        .expect("listing waited for the write")
        .unwrap();
    assert_eq!(items.len(), 1);
    assert!(!trash.is_finished());

    trash.await.unwrap().unwrap();
    assert!(fixture.bridge.list_items(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn writes_and_refreshes_do_not_overlap() {
    let runner = ScriptedRunner::new()
        .with_item(json!({"type": 1, "name": "GitHub"}))
        .with_delay(Duration::from_millis(20));
    let fixture = logged_in(runner).await;
    let id = fixture.bridge.list_items(false).await.unwrap()[0].id.clone();

    let (refreshed, trashed, created) = tokio::join!(
        fixture.bridge.refresh(),
        fixture.bridge.trash_item(id.clone()),
        fixture.bridge.create_item(github_draft()),
    );
    refreshed.unwrap();
    trashed.unwrap();
    let created = created.unwrap();

    assert_eq!(fixture.runner.max_concurrency(), 1);
    assert_eq!(fixture.runner.count_calls("sync"), 2);
    assert!(contains(&fixture.bridge.list_trash().await.unwrap(), &id));
    assert!(contains(&fixture.bridge.list_items(false).await.unwrap(), &created));
}

// ========== Password generation ==========

#[tokio::test]
async fn generated_password_follows_policy() {
    let fixture = logged_in(ScriptedRunner::new()).await;

    let default = fixture.bridge.generate_password(None).await.unwrap();
    assert_eq!(default.expose_secret().len(), 16);

    let policy = sealed_core::PasswordPolicy::default()
        .with_length(24)
        .with_letters(false, false);
    let digits = fixture.bridge.generate_password(Some(policy)).await.unwrap();
    assert_eq!(digits.expose_secret().len(), 24);
    assert!(digits.expose_secret().chars().all(|c| c.is_ascii_digit()));
}
