//! Sealed core library
//!
//! Drives an external vault CLI (Bitwarden `bw`) on behalf of a password
//! manager front end: it owns the single CLI session, keeps an in-memory
//! cache of vault items and exposes a typed set of vault operations.
//!
//! # Crate Structure
//!
//! - [`service`] - The [`VaultOperations`] trait and its [`VaultBridge`] implementation
//! - [`session`] - Session key ownership and login/unlock
//! - [`cache`] - Active and trashed item partitions
//! - [`bitwarden`] - CLI adapter and wire format
//! - [`process`] - Subprocess runner
//! - [`models`] - Items, drafts and display views
//! - [`config`] - Persisted settings
//! - [`totp`] / [`password_generator`] - Code and password generation
//! - [`reply`] - Structured results for the view layer
//! - [`testing`] - Scripted stand-in for the vault CLI

#![warn(missing_docs)]

pub mod bitwarden;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod password_generator;
pub mod process;
pub mod reply;
pub mod service;
pub mod session;
pub mod testing;
pub mod totp;
pub mod tracing;

pub use bitwarden::{VaultCli, VaultStatus};
pub use cache::{ItemCache, SharedItemCache};
pub use config::{ConfigManager, Configuration};
pub use error::{ErrorKind, VaultError, VaultResult};
pub use models::{
    CardDraft, ItemDraft, ItemId, ItemKind, ItemPayload, ItemView, LoginDraft, VaultItem,
};
pub use password_generator::PasswordPolicy;
pub use process::{CommandRunner, ProcessOutput, ProcessRequest, ProcessRunner};
pub use reply::Reply;
pub use service::{BridgeOptions, VaultBridge, VaultOperations};
pub use session::{LoginCredentials, LoginField, SessionState};
pub use totp::{TotpCode, generate_totp};
