//! Authentication state of the bridge
//!
//! The [`SessionStore`] owns the only copy of the [`SessionKey`]. It is held
//! by the vault service behind its single-writer lock; nothing else in the
//! process can read the key.

mod key;
mod store;

pub use key::SessionKey;
pub use store::{LoginCredentials, LoginField, SessionState, SessionStore};
