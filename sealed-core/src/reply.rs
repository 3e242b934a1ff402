//! Structured replies for the view layer
//!
//! Every operation result is turned into a [`Reply`], a flat record with
//! `success`, an optional human-readable `message`, an optional
//! machine-readable `error_kind` and the operation's payload fields.

use std::collections::BTreeSet;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use zeroize::Zeroize;

use crate::bitwarden::VaultStatus;
use crate::config::Configuration;
use crate::error::{ErrorKind, VaultResult};
use crate::models::{ItemId, ItemView, VaultItem, sort_for_display};
use crate::session::{LoginField, SessionState};
use crate::totp::TotpCode;

/// Result record returned to the view layer
#[derive(Debug, Clone, Serialize)]
pub struct Reply<T: Serialize> {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable failure category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Machine-readable failure kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Operation-specific fields, present on success
    #[serde(flatten)]
    pub payload: Option<T>,
}

impl<T: Serialize> Reply<T> {
    /// A successful reply carrying `payload`
    pub const fn ok(payload: T) -> Self {
        Self {
            success: true,
            message: None,
            error_kind: None,
            payload: Some(payload),
        }
    }

    /// A failed reply
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            error_kind: Some(kind),
            payload: None,
        }
    }

    /// Converts the payload of a successful reply
    pub fn map<U: Serialize>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        Reply {
            success: self.success,
            message: self.message,
            error_kind: self.error_kind,
            payload: self.payload.map(f),
        }
    }
}

impl<T: Serialize> From<VaultResult<T>> for Reply<T> {
    fn from(result: VaultResult<T>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(e) => Self::failure(e.kind(), e.user_message()),
        }
    }
}

/// Payload of operations that return nothing
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Empty {}

impl From<()> for Empty {
    fn from((): ()) -> Self {
        Self {}
    }
}

/// Items in display order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemsPayload {
    /// Rendered items
    pub items: Vec<ItemView>,
}

impl ItemsPayload {
    /// Renders items keeping their cache order
    #[must_use]
    pub fn from_items(items: &[VaultItem]) -> Self {
        Self {
            items: items.iter().map(ItemView::from_item).collect(),
        }
    }

    /// Reorders the items favourites first, then by name
    #[must_use]
    pub fn sorted(mut self) -> Self {
        sort_for_display(&mut self.items);
        self
    }
}

/// Id of a newly created item
#[derive(Debug, Clone, Serialize)]
pub struct CreatedPayload {
    /// Vault-assigned id
    pub id: String,
}

impl From<ItemId> for CreatedPayload {
    fn from(id: ItemId) -> Self {
        Self { id: id.to_string() }
    }
}

/// A TOTP code and its remaining validity
#[derive(Debug, Clone, Serialize)]
pub struct TotpPayload {
    /// The code
    pub code: String,
    /// Seconds until the code changes
    pub remaining_seconds: u64,
    /// Window length in seconds
    pub period: u64,
}

impl From<TotpCode> for TotpPayload {
    fn from(code: TotpCode) -> Self {
        Self {
            code: code.code,
            remaining_seconds: code.remaining_seconds,
            period: code.period,
        }
    }
}

/// A generated password, exposed for display
///
/// The plain copy is wiped when the payload is dropped.
#[derive(Clone, Serialize)]
pub struct PasswordPayload {
    password: String,
}

impl PasswordPayload {
    /// Exposes a generated password for the reply
    #[must_use]
    pub fn reveal(password: &SecretString) -> Self {
        Self {
            password: password.expose_secret().to_string(),
        }
    }

    /// The plain password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for PasswordPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordPayload")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Drop for PasswordPayload {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// Inputs the login form must show
#[derive(Debug, Clone, Serialize)]
pub struct LoginFieldsPayload {
    /// Required fields, in form order
    pub fields: Vec<LoginField>,
}

impl From<BTreeSet<LoginField>> for LoginFieldsPayload {
    fn from(fields: BTreeSet<LoginField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }
}

/// Persisted settings
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationPayload {
    /// Vault server
    pub server_url: String,
    /// Crash report opt-in
    pub crash_logs: bool,
}

impl From<Configuration> for ConfigurationPayload {
    fn from(config: Configuration) -> Self {
        Self {
            server_url: config.server_url,
            crash_logs: config.crash_logs_enabled,
        }
    }
}

/// Account state
#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload {
    /// State reported by the vault CLI
    pub status: VaultStatus,
    /// Whether this process holds a session
    pub session: SessionState,
}

/// Vault CLI version
#[derive(Debug, Clone, Serialize)]
pub struct VersionPayload {
    /// Version string printed by the CLI
    pub version: String,
}
