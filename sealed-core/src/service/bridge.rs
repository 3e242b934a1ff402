//! The vault session bridge
//!
//! [`VaultBridge`] implements [`VaultOperations`] on top of the vault CLI.
//! All state lives in one shared context:
//!
//! - the [`SessionStore`] sits behind an async mutex that also serialises
//!   every CLI call, since the CLI keeps one session and is not reentrant;
//! - the [`SharedItemCache`] is read without that mutex, so listing never
//!   waits for a slow CLI call;
//! - a `logged_in` flag mirrors the session state for those lock-free reads.
//!
//! Operations that touch the CLI run on their own tokio task. If the caller
//! goes away mid-call the task still finishes and updates the cache; only the
//! reply is lost.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, instrument, warn};

use super::operations::VaultOperations;
use crate::bitwarden::{VaultCli, VaultStatus, wire};
use crate::cache::SharedItemCache;
use crate::config::{ConfigManager, Configuration};
use crate::error::{VaultError, VaultResult};
use crate::models::{ItemDraft, ItemId, VaultItem};
use crate::password_generator::PasswordPolicy;
use crate::process::{CommandRunner, DEFAULT_TIMEOUT, ProcessRunner};
use crate::session::{LoginCredentials, LoginField, SessionKey, SessionState, SessionStore};

/// Environment variable naming the vault CLI executable
pub const BW_PATH_ENV: &str = "SEALED_BW_PATH";

/// Runtime options that are not persisted
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Vault CLI executable, looked up on `PATH` if not absolute
    pub cli_path: PathBuf,
    /// Directory where the CLI keeps its state; the CLI default if `None`
    pub data_dir: Option<PathBuf>,
    /// Timeout for each CLI invocation
    pub timeout: Duration,
    /// Policy used when `generate_password` gets none
    pub password_policy: PasswordPolicy,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            cli_path: PathBuf::from("bw"),
            data_dir: None,
            timeout: DEFAULT_TIMEOUT,
            password_policy: PasswordPolicy::default(),
        }
    }
}

impl BridgeOptions {
    /// Default options, with the executable taken from `SEALED_BW_PATH` if set
    #[must_use]
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(path) = std::env::var_os(BW_PATH_ENV).filter(|p| !p.is_empty()) {
            options.cli_path = PathBuf::from(path);
        }
        options
    }

    /// Sets the executable
    #[must_use]
    pub fn with_cli_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cli_path = path.into();
        self
    }

    /// Sets the CLI data directory
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Sets the per-invocation timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the default password policy
    #[must_use]
    pub const fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }
}

struct ConfigState {
    manager: ConfigManager,
    current: Configuration,
}

struct BridgeInner {
    cli: VaultCli,
    session: Mutex<SessionStore>,
    cache: SharedItemCache,
    logged_in: AtomicBool,
    config: Mutex<ConfigState>,
    password_policy: PasswordPolicy,
}

/// Vault operations backed by the Bitwarden CLI
///
/// Cloning is cheap; clones share the same session and cache.
#[derive(Clone)]
pub struct VaultBridge {
    inner: Arc<BridgeInner>,
}

impl fmt::Debug for VaultBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultBridge")
            .field("cli", &self.inner.cli)
            .field("logged_in", &self.inner.logged_in.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// Trims and checks a server URL before it is handed to the CLI
fn normalize_server_url(url: &str) -> VaultResult<String> {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(VaultError::Validation("Server URL is required".to_string()));
    }
    if url.starts_with('-') || url.contains(char::is_whitespace) {
        return Err(VaultError::Validation(format!("Invalid server URL: {url}")));
    }
    Ok(url.to_string())
}

fn is_out_of_date(err: &VaultError) -> bool {
    matches!(err, VaultError::RemoteWrite { reason, .. }
        if reason.to_lowercase().contains("out of date"))
}

impl VaultBridge {
    /// Creates a bridge that runs the vault CLI named in `options`
    ///
    /// # Errors
    /// Returns `VaultError::Config` if the configuration file is malformed.
    pub fn new(options: BridgeOptions, config: ConfigManager) -> VaultResult<Self> {
        let runner = Arc::new(CommandRunner::new(options.cli_path.clone()));
        Self::with_runner(runner, options, config)
    }

    /// Creates a bridge on top of a custom process runner
    ///
    /// # Errors
    /// Returns `VaultError::Config` if the configuration file is malformed.
    pub fn with_runner(
        runner: Arc<dyn ProcessRunner>,
        options: BridgeOptions,
        config: ConfigManager,
    ) -> VaultResult<Self> {
        let current = config.load()?;
        let mut cli = VaultCli::new(runner).with_timeout(options.timeout);
        if let Some(dir) = options.data_dir {
            cli = cli.with_data_dir(dir);
        }
        debug!(server_url = %current.server_url, "Vault bridge created");

        Ok(Self {
            inner: Arc::new(BridgeInner {
                cli,
                session: Mutex::new(SessionStore::new(current.server_url.clone())),
                cache: SharedItemCache::new(),
                logged_in: AtomicBool::new(false),
                config: Mutex::new(ConfigState {
                    manager: config,
                    current,
                }),
                password_policy: options.password_policy,
            }),
        })
    }

    /// Runs an operation on its own task so it completes even if the
    /// caller's future is dropped
    async fn detached<T, F, Fut>(&self, op: F) -> VaultResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<BridgeInner>) -> Fut,
        Fut: Future<Output = VaultResult<T>> + Send + 'static,
    {
        let task = tokio::spawn(op(Arc::clone(&self.inner)).in_current_span());
        task.await
            .map_err(|e| VaultError::Internal(format!("vault task failed: {e}")))?
    }
}

impl BridgeInner {
    fn require_login(&self) -> VaultResult<()> {
        if self.logged_in.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(VaultError::NotAuthenticated)
        }
    }

    /// Ends the local session if the CLI no longer accepts its key
    async fn expire_on_rejection<T>(
        &self,
        session: &mut SessionStore,
        result: VaultResult<T>,
    ) -> VaultResult<T> {
        if matches!(result, Err(VaultError::NotAuthenticated)) && session.is_logged_in() {
            warn!("Vault CLI rejected the session key, logging out");
            self.logged_in.store(false, Ordering::Release);
            session.invalidate();
            self.cache.clear().await;
        }
        result
    }

    async fn login(&self, credentials: &LoginCredentials) -> VaultResult<()> {
        let mut session = self.session.lock().await;
        if session.is_logged_in() {
            debug!("Already logged in, confirming credentials");
            let confirmed = session.confirm(&self.cli, credentials).await;
            self.expire_on_rejection(&mut session, confirmed).await?;
            if self.cache.is_loaded().await {
                return Ok(());
            }
        } else {
            session.unlock(&self.cli, credentials).await?;
            self.logged_in.store(true, Ordering::Release);
        }

        let result = self.cache.reload(&self.cli, session.current_key()?).await;
        self.expire_on_rejection(&mut session, result).await
    }

    async fn logout(&self) -> VaultResult<()> {
        let mut session = self.session.lock().await;
        if !session.is_logged_in() {
            return Err(VaultError::NotAuthenticated);
        }
        self.logged_in.store(false, Ordering::Release);
        self.cache.clear().await;
        session.teardown(&self.cli).await
    }

    async fn cleanup(&self) -> VaultResult<()> {
        let mut session = self.session.lock().await;
        self.logged_in.store(false, Ordering::Release);
        self.cache.clear().await;
        session.teardown(&self.cli).await
    }

    async fn refresh(&self) -> VaultResult<()> {
        let mut session = self.session.lock().await;
        let result = match session.current_key() {
            Ok(key) => self.cache.reload(&self.cli, key).await,
            Err(e) => Err(e),
        };
        self.expire_on_rejection(&mut session, result).await
    }

    async fn create_item(&self, draft: &ItemDraft) -> VaultResult<ItemId> {
        let mut session = self.session.lock().await;
        let result = match session.current_key() {
            Ok(key) => self.submit_create(key, draft).await,
            Err(e) => Err(e),
        };
        self.expire_on_rejection(&mut session, result).await
    }

    async fn submit_create(&self, key: &SessionKey, draft: &ItemDraft) -> VaultResult<ItemId> {
        let payload = wire::new_item_payload(draft);
        let action = format!("create {}", draft.kind());
        let item = self.cli.create_item(key, &payload, &action).await?;
        let id = item.id.clone();
        self.cache.upsert(item).await;
        Ok(id)
    }

    async fn edit_item(&self, id: &ItemId, draft: &ItemDraft) -> VaultResult<()> {
        let mut session = self.session.lock().await;
        let result = match session.current_key() {
            Ok(key) => self.submit_edit(key, id, draft).await,
            Err(e) => Err(e),
        };
        self.expire_on_rejection(&mut session, result).await
    }

    async fn submit_edit(&self, key: &SessionKey, id: &ItemId, draft: &ItemDraft) -> VaultResult<()> {
        let cached = self
            .cache
            .get(id)
            .await
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;
        if !cached.kind().is_editable() || cached.kind() != draft.kind() {
            return Err(VaultError::Validation(format!(
                "Item {id} is a {}, it cannot be edited as a {}",
                cached.kind(),
                draft.kind()
            )));
        }

        let action = format!("update {}", draft.kind());
        let edited = match self.patch_and_submit(key, id, draft, &action).await {
            Err(e) if is_out_of_date(&e) => {
                info!(id = %id, "Item out of date, syncing and retrying");
                self.cli.sync(key).await?;
                self.patch_and_submit(key, id, draft, &action).await
            }
            other => other,
        };

        match edited {
            Ok(item) => {
                self.cache.upsert(item).await;
                Ok(())
            }
            Err(VaultError::NotFound(missing)) => {
                self.cache.remove(id).await;
                Err(VaultError::NotFound(missing))
            }
            Err(e) => Err(e),
        }
    }

    async fn patch_and_submit(
        &self,
        key: &SessionKey,
        id: &ItemId,
        draft: &ItemDraft,
        action: &str,
    ) -> VaultResult<VaultItem> {
        let mut raw = self.cli.get_raw_item(key, id).await?;
        wire::apply_draft(&mut raw, draft)?;
        self.cli.edit_item(key, id, &raw, action).await
    }

    async fn set_trashed(&self, id: &ItemId, trashed: bool) -> VaultResult<()> {
        let mut session = self.session.lock().await;
        let result = match session.current_key() {
            Ok(key) => self.submit_trashed(key, id, trashed).await,
            Err(e) => Err(e),
        };
        self.expire_on_rejection(&mut session, result).await
    }

    async fn submit_trashed(&self, key: &SessionKey, id: &ItemId, trashed: bool) -> VaultResult<()> {
        match self.cache.trashed_state(id).await {
            None => return Err(VaultError::NotFound(id.to_string())),
            Some(current) if current == trashed => {
                debug!(id = %id, trashed, "Item already in target state");
                return Ok(());
            }
            Some(_) => {}
        }

        let written = if trashed {
            self.cli.delete_item(key, id, false).await
        } else {
            self.cli.restore_item(key, id).await
        };
        match written {
            Ok(()) => {
                self.cache.set_trashed(id, trashed).await;
                Ok(())
            }
            Err(VaultError::NotFound(missing)) => {
                self.cache.remove(id).await;
                Err(VaultError::NotFound(missing))
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_item(&self, id: &ItemId) -> VaultResult<()> {
        let mut session = self.session.lock().await;
        let result = match session.current_key() {
            Ok(key) => self.submit_delete(key, id).await,
            Err(e) => Err(e),
        };
        self.expire_on_rejection(&mut session, result).await
    }

    async fn submit_delete(&self, key: &SessionKey, id: &ItemId) -> VaultResult<()> {
        if self.cache.trashed_state(id).await.is_none() {
            debug!(id = %id, "Item already deleted");
            return Ok(());
        }
        match self.cli.delete_item(key, id, true).await {
            Ok(()) | Err(VaultError::NotFound(_)) => {
                self.cache.remove(id).await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn generate_password(&self, policy: &PasswordPolicy) -> VaultResult<SecretString> {
        let mut session = self.session.lock().await;
        let result = match session.current_key() {
            Ok(key) => self.cli.generate_password(key, policy).await,
            Err(e) => Err(e),
        };
        self.expire_on_rejection(&mut session, result).await
    }

    async fn set_server_url(&self, url: String) -> VaultResult<()> {
        let mut session = self.session.lock().await;

        self.logged_in.store(false, Ordering::Release);
        self.cache.clear().await;
        session.invalidate();
        // The CLI refuses a server change while any account is logged in
        if let Err(e) = self.cli.logout().await {
            warn!("Logout before server change failed: {e}");
        }

        self.cli.configure_server(&url).await?;

        let mut config = self.config.lock().await;
        let mut next = config.current.clone();
        next.server_url = url;
        config.manager.save(&next)?;
        session.set_server_url(next.server_url.clone());
        info!(server_url = %next.server_url, "Vault server changed");
        config.current = next;
        Ok(())
    }

    async fn status(&self) -> VaultResult<VaultStatus> {
        let session = self.session.lock().await;
        self.cli.status(session.current_key().ok()).await
    }

    async fn required_login_fields(&self) -> VaultResult<BTreeSet<LoginField>> {
        let session = self.session.lock().await;
        session.required_login_fields(&self.cli).await
    }
}

#[async_trait]
impl VaultOperations for VaultBridge {
    #[instrument(skip_all)]
    async fn login(&self, credentials: LoginCredentials) -> VaultResult<()> {
        self.detached(move |inner| async move { inner.login(&credentials).await })
            .await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> VaultResult<()> {
        self.detached(|inner| async move { inner.logout().await }).await
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> VaultResult<()> {
        self.inner.require_login()?;
        self.detached(|inner| async move { inner.refresh().await }).await
    }

    #[instrument(skip(self))]
    async fn required_login_fields(&self) -> VaultResult<BTreeSet<LoginField>> {
        self.detached(|inner| async move { inner.required_login_fields().await })
            .await
    }

    async fn list_items(&self, include_trashed: bool) -> VaultResult<Vec<VaultItem>> {
        self.inner.require_login()?;
        Ok(self.inner.cache.list(include_trashed).await)
    }

    async fn list_trash(&self) -> VaultResult<Vec<VaultItem>> {
        self.inner.require_login()?;
        Ok(self.inner.cache.list_trash().await)
    }

    #[instrument(skip_all, fields(kind = %draft.kind()))]
    async fn create_item(&self, draft: ItemDraft) -> VaultResult<ItemId> {
        self.inner.require_login()?;
        draft.validate_for_create()?;
        self.detached(move |inner| async move { inner.create_item(&draft).await })
            .await
    }

    #[instrument(skip(self, draft), fields(kind = %draft.kind()))]
    async fn edit_item(&self, id: ItemId, draft: ItemDraft) -> VaultResult<()> {
        self.inner.require_login()?;
        draft.validate_for_edit()?;
        self.detached(move |inner| async move { inner.edit_item(&id, &draft).await })
            .await
    }

    #[instrument(skip(self))]
    async fn trash_item(&self, id: ItemId) -> VaultResult<()> {
        self.inner.require_login()?;
        self.detached(move |inner| async move { inner.set_trashed(&id, true).await })
            .await
    }

    #[instrument(skip(self))]
    async fn restore_item(&self, id: ItemId) -> VaultResult<()> {
        self.inner.require_login()?;
        self.detached(move |inner| async move { inner.set_trashed(&id, false).await })
            .await
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, id: ItemId) -> VaultResult<()> {
        self.inner.require_login()?;
        self.detached(move |inner| async move { inner.delete_item(&id).await })
            .await
    }

    #[instrument(skip(self))]
    async fn generate_password(&self, policy: Option<PasswordPolicy>) -> VaultResult<SecretString> {
        self.inner.require_login()?;
        let policy = policy.unwrap_or(self.inner.password_policy);
        policy.validate()?;
        self.detached(move |inner| async move { inner.generate_password(&policy).await })
            .await
    }

    #[instrument(skip(self))]
    async fn set_server_url(&self, url: String) -> VaultResult<()> {
        let url = normalize_server_url(&url)?;
        self.detached(move |inner| async move { inner.set_server_url(url).await })
            .await
    }

    #[instrument(skip(self))]
    async fn set_crash_logs_enabled(&self, enabled: bool) -> VaultResult<()> {
        let mut config = self.inner.config.lock().await;
        let mut next = config.current.clone();
        next.crash_logs_enabled = enabled;
        config.manager.save(&next)?;
        config.current = next;
        Ok(())
    }

    async fn get_configuration(&self) -> VaultResult<Configuration> {
        Ok(self.inner.config.lock().await.current.clone())
    }

    #[instrument(skip(self))]
    async fn cleanup(&self) -> VaultResult<()> {
        self.detached(|inner| async move { inner.cleanup().await }).await
    }

    async fn status(&self) -> VaultResult<VaultStatus> {
        self.detached(|inner| async move { inner.status().await }).await
    }

    async fn check_cli(&self) -> VaultResult<String> {
        let version = self.inner.cli.version().await?;
        debug!(version = %version, "Vault CLI available");
        Ok(version)
    }

    fn session_state(&self) -> SessionState {
        if self.inner.logged_in.load(Ordering::Acquire) {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        }
    }
}
