//! Error types for the vault session bridge
//!
//! Every failure surfaced to the view layer is a [`VaultError`]. Each variant
//! maps to a stable [`ErrorKind`] and a human-readable category message, so
//! callers can render failures without inspecting internals.

use serde::Serialize;
use thiserror::Error;

/// Maximum length of CLI output quoted inside an error message
const MAX_REASON_LEN: usize = 200;

/// Errors produced by vault operations
#[derive(Debug, Error)]
pub enum VaultError {
    /// Input rejected locally, before any subprocess call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation requires an unlocked session
    #[error("Not logged in")]
    NotAuthenticated,

    /// The vault server rejected the credentials
    #[error("Authentication failed: {reason}")]
    Authentication {
        /// Reason reported by the vault CLI
        reason: String,
    },

    /// The server requires a second factor that was not supplied
    #[error("Two-step login code required")]
    TwoFactorRequired,

    /// Transport failure talking to the vault server
    #[error("Network error: {0}")]
    Network(String),

    /// The vault CLI could not be located or started
    #[error("Failed to start vault CLI `{program}`: {reason}")]
    ProcessSpawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// The vault CLI did not finish in time and was terminated
    #[error("Vault CLI timed out after {0} seconds")]
    ProcessTimeout(u64),

    /// The vault CLI ran but reported a failed write
    #[error("Failed to {action}: {reason}")]
    RemoteWrite {
        /// What was being written, e.g. "update card"
        action: String,
        /// Reason reported by the vault CLI
        reason: String,
    },

    /// The item id is not present in the local cache
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Reloading the cache failed; the previous contents were kept
    #[error("Failed to sync vault: {0}")]
    Sync(String),

    /// The vault CLI produced output that could not be understood
    #[error("Failed to parse vault CLI output: {0}")]
    Parse(String),

    /// Configuration could not be read or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// The TOTP shared secret is malformed
    #[error("Invalid TOTP secret: {0}")]
    Totp(String),

    /// A background task running the operation failed
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Machine-readable error category exposed to the view layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`VaultError::Validation`]
    Validation,
    /// See [`VaultError::NotAuthenticated`]
    NotAuthenticated,
    /// See [`VaultError::Authentication`]
    Authentication,
    /// See [`VaultError::TwoFactorRequired`]
    TwoFactorRequired,
    /// See [`VaultError::Network`]
    Network,
    /// See [`VaultError::ProcessSpawn`]
    ProcessSpawn,
    /// See [`VaultError::ProcessTimeout`]
    ProcessTimeout,
    /// See [`VaultError::RemoteWrite`]
    RemoteWrite,
    /// See [`VaultError::NotFound`]
    NotFound,
    /// See [`VaultError::Sync`]
    Sync,
    /// See [`VaultError::Parse`]
    Parse,
    /// See [`VaultError::Config`]
    Config,
    /// See [`VaultError::Totp`]
    Totp,
    /// See [`VaultError::Internal`]
    Internal,
}

impl VaultError {
    /// Returns the error category
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::TwoFactorRequired => ErrorKind::TwoFactorRequired,
            Self::Network(_) => ErrorKind::Network,
            Self::ProcessSpawn { .. } => ErrorKind::ProcessSpawn,
            Self::ProcessTimeout(_) => ErrorKind::ProcessTimeout,
            Self::RemoteWrite { .. } => ErrorKind::RemoteWrite,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Sync(_) => ErrorKind::Sync,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Config(_) => ErrorKind::Config,
            Self::Totp(_) => ErrorKind::Totp,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns a message suitable for showing to the user
    ///
    /// The message names the failure category and, where it helps, the
    /// action that failed. It never contains secret material.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotAuthenticated => "Not logged in".to_string(),
            Self::Authentication { reason } => format!("Login failed: {reason}"),
            Self::TwoFactorRequired => "Enter your two-step login code".to_string(),
            Self::Network(_) => "Could not reach the vault server".to_string(),
            Self::ProcessSpawn { .. } => "The vault tool is not available".to_string(),
            Self::ProcessTimeout(_) => "The vault tool did not respond in time".to_string(),
            Self::RemoteWrite { action, .. } => format!("Failed to {action}"),
            Self::NotFound(_) => "Item no longer exists".to_string(),
            Self::Sync(_) => "Failed to sync".to_string(),
            Self::Parse(_) => "Unexpected response from the vault tool".to_string(),
            Self::Config(_) => "Failed to save settings".to_string(),
            Self::Totp(_) => "Invalid authenticator key".to_string(),
            Self::Internal(_) => "Something went wrong".to_string(),
        }
    }

    /// Wraps a failure that happened while reloading the cache
    ///
    /// Session and timeout failures keep their own kind; everything else
    /// becomes [`VaultError::Sync`].
    #[must_use]
    pub fn into_sync(self) -> Self {
        match self {
            Self::NotAuthenticated | Self::ProcessTimeout(_) | Self::Sync(_) => self,
            other => Self::Sync(other.to_string()),
        }
    }
}

/// Reduces CLI output to a short single-line reason
///
/// Takes the first non-empty line and caps its length so that large or
/// multi-line payloads never end up in error messages or logs.
#[must_use]
pub fn summarize_output(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output");
    if line.chars().count() > MAX_REASON_LEN {
        let truncated: String = line.chars().take(MAX_REASON_LEN).collect();
        format!("{truncated}…")
    } else {
        line.to_string()
    }
}
