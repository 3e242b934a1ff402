//! Bitwarden CLI adapter
//!
//! [`VaultCli`] translates vault operations into `bw` invocations and turns
//! their output back into typed values. It is the only code that knows the
//! CLI's argument conventions; the JSON format is fenced off further in
//! [`wire`].
//!
//! Secrets never appear on the command line: the session key travels in
//! `BW_SESSION`, the master password in `BW_PASSWORD` (read by
//! `--passwordenv`) and item payloads on stdin.

pub mod outcome;
pub mod wire;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{VaultError, VaultResult, summarize_output};
use crate::models::{ItemId, VaultItem};
use crate::password_generator::PasswordPolicy;
use crate::process::{DEFAULT_TIMEOUT, ProcessOutput, ProcessRequest, ProcessRunner};
use crate::session::SessionKey;

/// Environment variable carrying the session key
pub const SESSION_ENV: &str = "BW_SESSION";

/// Environment variable carrying the master password
pub const PASSWORD_ENV: &str = "BW_PASSWORD";

/// Environment variable selecting the CLI data directory
pub const APPDATA_ENV: &str = "BITWARDENCLI_APPDATA_DIR";

/// Account state reported by `bw status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultStatus {
    /// No account is logged in
    Unauthenticated,
    /// An account is logged in but the vault is locked
    Locked,
    /// The vault is unlocked
    Unlocked,
}

impl VaultStatus {
    fn parse(status: &str) -> VaultResult<Self> {
        match status {
            "unauthenticated" => Ok(Self::Unauthenticated),
            "locked" => Ok(Self::Locked),
            "unlocked" => Ok(Self::Unlocked),
            other => Err(VaultError::Parse(format!("unknown vault status: {other}"))),
        }
    }
}

/// Result of `bw login`
#[derive(Debug)]
pub enum LoginOutcome {
    /// Login succeeded and unlocked the vault
    Unlocked(SessionKey),
    /// The CLI already holds a logged-in account; unlock it instead
    AlreadyLoggedIn,
}

/// Client for the `bw` executable
#[derive(Clone)]
pub struct VaultCli {
    runner: Arc<dyn ProcessRunner>,
    data_dir: Option<PathBuf>,
    timeout: Duration,
}

impl fmt::Debug for VaultCli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultCli")
            .field("program", &self.runner.program())
            .field("data_dir", &self.data_dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn check_id(id: &ItemId) -> VaultResult<&str> {
    let id = id.as_str();
    if id.is_empty() || id.starts_with('-') {
        return Err(VaultError::Validation(format!("Invalid item id: {id:?}")));
    }
    Ok(id)
}

impl VaultCli {
    /// Creates a client running the CLI through `runner`
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            data_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Keeps the CLI's state in `dir` instead of its default location
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

    /// Returns the CLI data directory, if one is configured
    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    fn request<I, S>(&self, args: I, session: Option<&SessionKey>) -> ProcessRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut request = ProcessRequest::new(args)
            .arg("--nointeraction")
            .with_timeout(self.timeout);
        if let Some(dir) = &self.data_dir {
            request = request.with_env(APPDATA_ENV, dir.display().to_string());
        }
        if let Some(key) = session {
            request = request.with_secret_env(SESSION_ENV, key.secret().clone());
        }
        request
    }

    fn raw_request<I, S>(&self, args: I, session: Option<&SessionKey>) -> ProcessRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request(args, session).arg("--raw")
    }

    async fn invoke(&self, request: ProcessRequest) -> VaultResult<ProcessOutput> {
        self.runner.run(request).await
    }

    /// Returns the CLI version (`bw --version`)
    ///
    /// # Errors
    /// Returns `VaultError::ProcessSpawn` if the executable cannot be run.
    pub async fn version(&self) -> VaultResult<String> {
        let output = self
            .invoke(ProcessRequest::new(["--version"]).with_timeout(self.timeout))
            .await?;
        if !output.success() {
            return Err(VaultError::ProcessSpawn {
                program: self.runner.program(),
                reason: summarize_output(output.failure_text()),
            });
        }
        Ok(output.stdout.trim().to_string())
    }

    /// Queries the account state
    ///
    /// # Errors
    /// Returns `VaultError::Parse` if the status output is malformed.
    pub async fn status(&self, session: Option<&SessionKey>) -> VaultResult<VaultStatus> {
        let output = self.invoke(self.raw_request(["status"], session)).await?;
        if !output.success() {
            return Err(outcome::remote_failure(&output, VaultError::Sync));
        }
        let status = wire::parse_status(&output.stdout)?;
        debug!(status = %status.status, "Vault status");
        VaultStatus::parse(&status.status)
    }

    /// Logs in with email and master password, optionally with a two-step code
    ///
    /// # Errors
    /// Returns `VaultError::TwoFactorRequired` when the server asks for a code
    /// that was not supplied, `VaultError::Authentication` on bad credentials
    /// and `VaultError::Network` when the server is unreachable.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
        code: Option<&str>,
    ) -> VaultResult<LoginOutcome> {
        let mut request = self
            .raw_request(["login", email, "--passwordenv", PASSWORD_ENV], None)
            .with_secret_env(PASSWORD_ENV, password.clone());
        if let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) {
            request = request.arg("--method").arg("0").arg("--code").arg(code);
        }

        let output = self.invoke(request).await?;
        if output.success() {
            return SessionKey::from_cli_output(&output.stdout).map(LoginOutcome::Unlocked);
        }
        if outcome::is_already_logged_in(&output) {
            debug!("Account already logged in, unlocking instead");
            return Ok(LoginOutcome::AlreadyLoggedIn);
        }
        Err(outcome::auth_failure(&output))
    }

    /// Unlocks the logged-in account with the master password
    ///
    /// # Errors
    /// Returns `VaultError::Authentication` on a wrong password and
    /// `VaultError::NotAuthenticated` if no account is logged in.
    pub async fn unlock(&self, password: &SecretString) -> VaultResult<SessionKey> {
        let request = self
            .raw_request(["unlock", "--passwordenv", PASSWORD_ENV], None)
            .with_secret_env(PASSWORD_ENV, password.clone());
        let output = self.invoke(request).await?;
        if output.success() {
            return SessionKey::from_cli_output(&output.stdout);
        }
        if outcome::is_not_logged_in(&output) && !outcome::is_network_failure(&output) {
            return Err(VaultError::NotAuthenticated);
        }
        Err(outcome::auth_failure(&output))
    }

    /// Logs the account out of the CLI; succeeds if nobody was logged in
    ///
    /// # Errors
    /// Returns `VaultError::Sync` if the CLI reports another failure.
    pub async fn logout(&self) -> VaultResult<()> {
        let output = self.invoke(self.raw_request(["logout"], None)).await?;
        if output.success() || outcome::is_not_logged_in(&output) {
            return Ok(());
        }
        Err(VaultError::Sync(summarize_output(output.failure_text())))
    }

    /// Pulls the latest vault state from the server
    ///
    /// # Errors
    /// Returns `VaultError::Sync`, `VaultError::Network` or
    /// `VaultError::NotAuthenticated` if the sync fails.
    pub async fn sync(&self, session: &SessionKey) -> VaultResult<()> {
        let output = self.invoke(self.raw_request(["sync"], Some(session))).await?;
        if output.success() {
            Ok(())
        } else {
            Err(outcome::remote_failure(&output, VaultError::Sync))
        }
    }

    /// Lists active items, or trashed items when `trash` is set
    ///
    /// # Errors
    /// Returns `VaultError::Parse` on malformed output and `VaultError::Sync`
    /// if the CLI fails.
    pub async fn list_items(&self, session: &SessionKey, trash: bool) -> VaultResult<Vec<VaultItem>> {
        let mut request = self.raw_request(["list", "items"], Some(session));
        if trash {
            request = request.arg("--trash");
        }
        let output = self.invoke(request).await?;
        if !output.success() {
            return Err(outcome::remote_failure(&output, VaultError::Sync));
        }
        let items = wire::parse_item_list(&output.stdout, trash)?;
        debug!(count = items.len(), trash, "Listed vault items");
        Ok(items)
    }

    /// Fetches an item as raw JSON, for patching before an edit
    ///
    /// # Errors
    /// Returns `VaultError::NotFound` if the vault has no such item.
    pub async fn get_raw_item(&self, session: &SessionKey, id: &ItemId) -> VaultResult<Value> {
        let id_arg = check_id(id)?;
        let output = self
            .invoke(self.raw_request(["get", "item", id_arg], Some(session)))
            .await?;
        if output.success() {
            return wire::parse_raw_item(&output.stdout);
        }
        if outcome::is_not_found(&output) {
            return Err(VaultError::NotFound(id.to_string()));
        }
        Err(outcome::remote_failure(&output, VaultError::Sync))
    }

    /// Creates an item from a `bw create item` payload
    ///
    /// # Errors
    /// Returns `VaultError::RemoteWrite` with `action` if the CLI rejects it.
    pub async fn create_item(
        &self,
        session: &SessionKey,
        payload: &Value,
        action: &str,
    ) -> VaultResult<VaultItem> {
        let request = self
            .raw_request(["create", "item"], Some(session))
            .with_stdin(wire::encode_payload(payload));
        let output = self.invoke(request).await?;
        if !output.success() {
            return Err(outcome::remote_failure(&output, |reason| {
                VaultError::RemoteWrite {
                    action: action.to_string(),
                    reason,
                }
            }));
        }
        let item = wire::parse_item(&output.stdout)?;
        info!(id = %item.id, "Created vault item");
        Ok(item)
    }

    /// Replaces an item with an edited payload
    ///
    /// # Errors
    /// Returns `VaultError::NotFound` if the item no longer exists and
    /// `VaultError::RemoteWrite` with `action` if the CLI rejects the edit.
    pub async fn edit_item(
        &self,
        session: &SessionKey,
        id: &ItemId,
        payload: &Value,
        action: &str,
    ) -> VaultResult<VaultItem> {
        let id_arg = check_id(id)?;
        let request = self
            .raw_request(["edit", "item", id_arg], Some(session))
            .with_stdin(wire::encode_payload(payload));
        let output = self.invoke(request).await?;
        if !output.success() {
            if outcome::is_not_found(&output) {
                return Err(VaultError::NotFound(id.to_string()));
            }
            return Err(outcome::remote_failure(&output, |reason| {
                VaultError::RemoteWrite {
                    action: action.to_string(),
                    reason,
                }
            }));
        }
        let item = wire::parse_item(&output.stdout)?;
        info!(id = %item.id, "Updated vault item");
        Ok(item)
    }

    /// Moves an item to the trash, or deletes it outright when `permanent`
    ///
    /// # Errors
    /// Returns `VaultError::NotFound` if the vault has no such item and
    /// `VaultError::RemoteWrite` if the CLI rejects the deletion.
    pub async fn delete_item(
        &self,
        session: &SessionKey,
        id: &ItemId,
        permanent: bool,
    ) -> VaultResult<()> {
        let id_arg = check_id(id)?;
        let mut request = self.raw_request(["delete", "item", id_arg], Some(session));
        if permanent {
            request = request.arg("--permanent");
        }
        let output = self.invoke(request).await?;
        if output.success() {
            info!(id = %id, permanent, "Deleted vault item");
            return Ok(());
        }
        if outcome::is_not_found(&output) {
            return Err(VaultError::NotFound(id.to_string()));
        }
        let action = if permanent { "delete item" } else { "move item to trash" };
        Err(outcome::remote_failure(&output, |reason| {
            VaultError::RemoteWrite {
                action: action.to_string(),
                reason,
            }
        }))
    }

    /// Restores an item from the trash
    ///
    /// # Errors
    /// Returns `VaultError::NotFound` if the vault has no such item and
    /// `VaultError::RemoteWrite` if the CLI rejects the restore.
    pub async fn restore_item(&self, session: &SessionKey, id: &ItemId) -> VaultResult<()> {
        let id_arg = check_id(id)?;
        let output = self
            .invoke(self.raw_request(["restore", "item", id_arg], Some(session)))
            .await?;
        if output.success() {
            info!(id = %id, "Restored vault item");
            return Ok(());
        }
        if outcome::is_not_found(&output) {
            return Err(VaultError::NotFound(id.to_string()));
        }
        Err(outcome::remote_failure(&output, |reason| {
            VaultError::RemoteWrite {
                action: "restore item".to_string(),
                reason,
            }
        }))
    }

    /// Generates a password with the CLI's generator
    ///
    /// # Errors
    /// Returns `VaultError::Validation` for an unusable policy and
    /// `VaultError::Parse` if the CLI prints nothing.
    pub async fn generate_password(
        &self,
        session: &SessionKey,
        policy: &PasswordPolicy,
    ) -> VaultResult<SecretString> {
        policy.validate()?;
        let output = self
            .invoke(self.raw_request(policy.to_cli_args(), Some(session)))
            .await?;
        if !output.success() {
            return Err(outcome::remote_failure(&output, VaultError::Sync));
        }
        let password = output.stdout.trim_end_matches(['\r', '\n']);
        if password.is_empty() {
            return Err(VaultError::Parse(
                "password generator returned nothing".to_string(),
            ));
        }
        Ok(SecretString::from(password))
    }

    /// Points the CLI at another server
    ///
    /// The CLI refuses this while an account is logged in; callers log out
    /// first.
    ///
    /// # Errors
    /// Returns `VaultError::Config` if the CLI rejects the URL.
    pub async fn configure_server(&self, url: &str) -> VaultResult<()> {
        let output = self
            .invoke(self.raw_request(["config", "server", url], None))
            .await?;
        if output.success() {
            info!(server_url = %url, "Configured vault server");
            Ok(())
        } else {
            Err(VaultError::Config(summarize_output(output.failure_text())))
        }
    }
}
