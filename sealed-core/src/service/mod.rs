//! Vault operations service
//!
//! [`VaultOperations`] is the surface the view layer calls; [`VaultBridge`]
//! implements it on top of the Bitwarden CLI.

mod bridge;
mod operations;

pub use bridge::{BW_PATH_ENV, BridgeOptions, VaultBridge};
pub use operations::VaultOperations;
