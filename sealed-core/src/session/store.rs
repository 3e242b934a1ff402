//! Session lifecycle: unlock, teardown and login-field discovery

use std::collections::BTreeSet;
use std::fmt;

use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::key::SessionKey;
use crate::bitwarden::{LoginOutcome, VaultCli, VaultStatus};
use crate::error::{VaultError, VaultResult};

/// Whether the bridge holds an unlocked session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session key is held
    LoggedOut,
    /// A session key is held
    LoggedIn,
}

/// Input the login form must collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginField {
    /// Account email
    Email,
    /// Master password
    Password,
    /// Two-step login code
    Totp,
}

/// Credentials for [`SessionStore::unlock`]
///
/// An empty email unlocks the account the CLI already has logged in.
#[derive(Clone)]
pub struct LoginCredentials {
    /// Account email
    pub email: String,
    /// Master password
    pub password: SecretString,
    /// Two-step login code, if the server asked for one
    pub totp: Option<String>,
}

impl LoginCredentials {
    /// Creates credentials from the three login form fields
    ///
    /// Blank email or code are treated as absent.
    #[must_use]
    pub fn new(email: impl Into<String>, password: SecretString, totp: impl Into<String>) -> Self {
        let totp = totp.into();
        Self {
            email: email.into().trim().to_string(),
            password,
            totp: Some(totp.trim().to_string()).filter(|t| !t.is_empty()),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("totp", &self.totp.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Process-wide authentication state
///
/// The state is derived from the key itself, so `LoggedIn` without a key
/// cannot be represented.
#[derive(Debug, Default)]
pub struct SessionStore {
    key: Option<SessionKey>,
    account: Option<String>,
    server_url: String,
}

impl SessionStore {
    /// Creates a logged-out session for `server_url`
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            key: None,
            account: None,
            server_url: server_url.into(),
        }
    }

    /// Returns the current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        if self.key.is_some() {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        }
    }

    /// Returns true if a session key is held
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.key.is_some()
    }

    /// Returns the server this session belongs to
    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Email the session was opened with, if one was given
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Returns the session key
    ///
    /// # Errors
    /// Returns `VaultError::NotAuthenticated` when logged out.
    pub fn current_key(&self) -> VaultResult<&SessionKey> {
        self.key.as_ref().ok_or(VaultError::NotAuthenticated)
    }

    /// Runs the CLI login or unlock exchange and stores the session key
    ///
    /// With an email the account is logged in (falling back to unlock if the
    /// CLI already has it logged in); without one the current account is
    /// unlocked. The stored key is only replaced on success.
    ///
    /// # Errors
    /// Returns `VaultError::Authentication`, `VaultError::TwoFactorRequired`
    /// or `VaultError::Network` as reported by the CLI.
    pub async fn unlock(
        &mut self,
        cli: &VaultCli,
        credentials: &LoginCredentials,
    ) -> VaultResult<&SessionKey> {
        let key = if credentials.email.is_empty() {
            cli.unlock(&credentials.password).await?
        } else {
            match cli
                .login(
                    &credentials.email,
                    &credentials.password,
                    credentials.totp.as_deref(),
                )
                .await?
            {
                LoginOutcome::Unlocked(key) => key,
                LoginOutcome::AlreadyLoggedIn => cli.unlock(&credentials.password).await?,
            }
        };

        info!(server_url = %self.server_url, "Vault unlocked");
        self.account = Some(credentials.email.clone()).filter(|e| !e.is_empty());
        Ok(&*self.key.insert(key))
    }

    /// Checks credentials against the session that is already open
    ///
    /// A different email is refused without contacting the CLI. The master
    /// password is checked with `bw unlock`, whose fresh key replaces the
    /// held one. The two-step code is not needed once logged in.
    ///
    /// # Errors
    /// Returns `VaultError::NotAuthenticated` when logged out and
    /// `VaultError::Authentication` when the credentials do not match.
    pub async fn confirm(
        &mut self,
        cli: &VaultCli,
        credentials: &LoginCredentials,
    ) -> VaultResult<()> {
        if self.key.is_none() {
            return Err(VaultError::NotAuthenticated);
        }
        if let Some(account) = &self.account
            && !credentials.email.is_empty()
            && !account.eq_ignore_ascii_case(&credentials.email)
        {
            warn!("Login refused: another account holds the session");
            return Err(VaultError::Authentication {
                reason: "Another account is logged in".to_string(),
            });
        }

        let key = cli.unlock(&credentials.password).await?;
        debug!("Session credentials confirmed");
        self.key = Some(key);
        Ok(())
    }

    /// Drops the local session without contacting the CLI
    ///
    /// Used when the server changes or the CLI reports the key as expired.
    pub fn invalidate(&mut self) {
        self.account = None;
        if self.key.take().is_some() {
            debug!("Session invalidated");
        }
    }

    /// Points the session at another server, dropping the current key
    pub fn set_server_url(&mut self, url: impl Into<String>) {
        self.invalidate();
        self.server_url = url.into();
    }

    /// Logs out of the CLI and forgets the session key
    ///
    /// The local state is reset first, so the bridge is logged out even if
    /// the CLI logout fails. Without a held key this does nothing: an account
    /// the CLI has logged in for someone else is left alone.
    ///
    /// # Errors
    /// Returns the CLI failure, if any, after the local state is reset.
    pub async fn teardown(&mut self, cli: &VaultCli) -> VaultResult<()> {
        self.account = None;
        if self.key.take().is_none() {
            debug!("No session to tear down");
            return Ok(());
        }
        match cli.logout().await {
            Ok(()) => {
                info!("Logged out of vault");
                Ok(())
            }
            Err(e) => {
                warn!("Vault CLI logout failed: {e}");
                Err(e)
            }
        }
    }

    /// Determines which login inputs are needed right now
    ///
    /// # Errors
    /// Propagates CLI failures of `bw status`.
    pub async fn required_login_fields(&self, cli: &VaultCli) -> VaultResult<BTreeSet<LoginField>> {
        if self.key.is_some() {
            return Ok(BTreeSet::new());
        }
        let fields = match cli.status(None).await? {
            VaultStatus::Unauthenticated => {
                BTreeSet::from([LoginField::Email, LoginField::Password, LoginField::Totp])
            }
            VaultStatus::Locked | VaultStatus::Unlocked => BTreeSet::from([LoginField::Password]),
        };
        Ok(fields)
    }
}
