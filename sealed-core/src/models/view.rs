//! Display representation of vault items
//!
//! [`ItemView`] is the only place where secret item fields are exposed as
//! plain strings. The view layer builds it explicitly when it renders an
//! item; the cache and service never hand out plain secrets otherwise.

use std::cmp::Ordering;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::item::{ItemPayload, VaultItem};

/// Flat, serializable view of an item
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ItemView {
    /// Item id
    pub id: String,
    /// Display name
    pub name: String,
    /// Item kind ("login", "card", "secure_note", "identity")
    pub item_type: String,
    /// Favourite flag
    pub favorite: bool,
    /// Whether the item is in the trash
    pub trashed: bool,
    /// Notes, empty when unset
    pub notes: String,
    /// Creation time, RFC 3339, empty when unknown
    pub created: String,
    /// Revision time, RFC 3339, empty when unknown
    pub updated: String,
    /// Login username
    pub username: String,
    /// Login password
    pub password: String,
    /// Login TOTP secret
    pub totp: String,
    /// Cardholder name
    pub cardholder_name: String,
    /// Card brand
    pub brand: String,
    /// Card number
    pub number: String,
    /// Expiry month, two digits
    pub expiry_month: String,
    /// Expiry year, four digits
    pub expiry_year: String,
    /// Card security code
    pub code: String,
}

fn exposed(value: Option<&SecretString>) -> String {
    value
        .map(|s| s.expose_secret().to_string())
        .unwrap_or_default()
}

/// Left-pads a numeric string with zeros to `width`
///
/// Non-numeric input is returned unchanged.
#[must_use]
pub fn zero_pad(value: &str, width: usize) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }
    format!("{trimmed:0>width$}")
}

impl ItemView {
    /// Builds a view of an item, exposing its secret fields
    #[must_use]
    pub fn from_item(item: &VaultItem) -> Self {
        let mut view = Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            item_type: item.kind().as_str().to_string(),
            favorite: item.favorite,
            trashed: item.trashed,
            notes: item.notes.clone().unwrap_or_default(),
            created: item.created.map(|t| t.to_rfc3339()).unwrap_or_default(),
            updated: item.updated.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ..Self::default()
        };

        match &item.payload {
            ItemPayload::Login(login) => {
                view.username = login.username.clone().unwrap_or_default();
                view.password = exposed(login.password.as_ref());
                view.totp = exposed(login.totp.as_ref());
            }
            ItemPayload::Card(card) => {
                view.cardholder_name = card.cardholder_name.clone().unwrap_or_default();
                view.brand = card.brand.clone().unwrap_or_default();
                view.number = exposed(card.number.as_ref());
                view.expiry_month = card
                    .exp_month
                    .as_deref()
                    .map(|m| zero_pad(m, 2))
                    .unwrap_or_default();
                view.expiry_year = card
                    .exp_year
                    .as_deref()
                    .map(|y| zero_pad(y, 4))
                    .unwrap_or_default();
                view.code = exposed(card.code.as_ref());
            }
            ItemPayload::SecureNote | ItemPayload::Identity => {}
        }

        view
    }
}

/// Orders views for display: favourites first, then by name
pub fn sort_for_display(views: &mut [ItemView]) {
    views.sort_by(|a, b| match (a.favorite, b.favorite) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
}
