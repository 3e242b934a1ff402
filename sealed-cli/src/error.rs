//! CLI error types and exit codes.

use sealed_core::{ErrorKind, VaultError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - input, configuration, output or local failures
    pub const GENERAL_ERROR: i32 = 1;
    /// Login failed or the vault session is missing
    pub const AUTH_FAILURE: i32 = 2;
    /// The vault server or the vault CLI reported a failure
    pub const REMOTE_FAILURE: i32 = 3;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A vault operation failed
    #[error("{message}")]
    Vault {
        /// Failure category
        kind: ErrorKind,
        /// Human-readable message
        message: String,
    },

    /// Invalid command-line input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Output could not be written
    #[error("Output error: {0}")]
    Output(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VaultError> for CliError {
    fn from(err: VaultError) -> Self {
        Self::Vault {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (input, configuration, IO)
    /// - 2: Authentication or session failure
    /// - 3: Remote vault failure (network, sync, rejected write)
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Vault { kind, .. } => match kind {
                ErrorKind::NotAuthenticated
                | ErrorKind::Authentication
                | ErrorKind::TwoFactorRequired => exit_codes::AUTH_FAILURE,
                ErrorKind::Network
                | ErrorKind::ProcessTimeout
                | ErrorKind::RemoteWrite
                | ErrorKind::NotFound
                | ErrorKind::Sync
                | ErrorKind::Parse => exit_codes::REMOTE_FAILURE,
                ErrorKind::Validation
                | ErrorKind::ProcessSpawn
                | ErrorKind::Config
                | ErrorKind::Totp
                | ErrorKind::Internal => exit_codes::GENERAL_ERROR,
            },
            Self::Input(_) | Self::Output(_) | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
