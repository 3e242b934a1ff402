//! The operation surface consumed by the view layer

use std::collections::BTreeSet;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::bitwarden::VaultStatus;
use crate::config::Configuration;
use crate::error::VaultResult;
use crate::models::{ItemDraft, ItemId, VaultItem};
use crate::password_generator::PasswordPolicy;
use crate::session::{LoginCredentials, LoginField, SessionState};
use crate::totp::{TotpCode, generate_totp};

/// Vault operations available to the view layer
///
/// Every operation except `login`, `required_login_fields`, `generate_totp`,
/// `get_configuration`, `set_server_url`, `set_crash_logs_enabled`,
/// `check_cli`, `status` and `cleanup` fails with
/// [`crate::VaultError::NotAuthenticated`] while logged out.
#[async_trait]
pub trait VaultOperations: Send + Sync {
    /// Logs in (or unlocks) and loads the vault into the cache
    ///
    /// While a session is open the credentials are checked against it and
    /// no second login runs.
    async fn login(&self, credentials: LoginCredentials) -> VaultResult<()>;

    /// Logs out and clears the cache
    async fn logout(&self) -> VaultResult<()>;

    /// Re-syncs and reloads the cache
    async fn refresh(&self) -> VaultResult<()>;

    /// Inputs the login form needs to show
    async fn required_login_fields(&self) -> VaultResult<BTreeSet<LoginField>>;

    /// Cached items; trashed ones are appended when `include_trashed` is set
    async fn list_items(&self, include_trashed: bool) -> VaultResult<Vec<VaultItem>>;

    /// Cached trashed items
    async fn list_trash(&self) -> VaultResult<Vec<VaultItem>>;

    /// Creates an item, returning its vault-assigned id
    async fn create_item(&self, draft: ItemDraft) -> VaultResult<ItemId>;

    /// Applies the fields set in `draft` to an existing item
    async fn edit_item(&self, id: ItemId, draft: ItemDraft) -> VaultResult<()>;

    /// Moves an item to the trash
    async fn trash_item(&self, id: ItemId) -> VaultResult<()>;

    /// Moves an item out of the trash
    async fn restore_item(&self, id: ItemId) -> VaultResult<()>;

    /// Deletes an item permanently
    async fn delete_item(&self, id: ItemId) -> VaultResult<()>;

    /// Generates a random password; `None` uses the default policy
    async fn generate_password(&self, policy: Option<PasswordPolicy>) -> VaultResult<SecretString>;

    /// Switches to another vault server, ending the current session
    async fn set_server_url(&self, url: String) -> VaultResult<()>;

    /// Persists the crash report opt-in
    async fn set_crash_logs_enabled(&self, enabled: bool) -> VaultResult<()>;

    /// Current persisted settings
    async fn get_configuration(&self) -> VaultResult<Configuration>;

    /// Ends the session at process teardown; safe to call repeatedly
    ///
    /// Does not touch the CLI when this process holds no session.
    async fn cleanup(&self) -> VaultResult<()>;

    /// Account state as reported by the vault CLI
    async fn status(&self) -> VaultResult<VaultStatus>;

    /// Verifies the vault CLI can be run and returns its version
    async fn check_cli(&self) -> VaultResult<String>;

    /// Whether this bridge holds a session
    fn session_state(&self) -> SessionState;

    /// Computes the current TOTP code for a secret, without any session
    fn generate_totp(&self, secret: &SecretString) -> VaultResult<TotpCode> {
        generate_totp(secret)
    }
}
