//! Vault item model
//!
//! Items are decrypted copies of what the remote vault holds. Secret fields
//! (passwords, TOTP keys, card numbers, security codes) are `SecretString`s,
//! zeroized on drop and redacted from `Debug` output.

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::error::{VaultError, VaultResult};

/// Vault-assigned item identifier
///
/// Immutable once assigned. Items under construction are [`ItemDraft`]s and
/// carry no id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    /// Wraps a vault-assigned id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Item variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Website or service login
    Login,
    /// Free-form secure note (read-only here)
    SecureNote,
    /// Payment card
    Card,
    /// Personal identity (read-only here)
    Identity,
}

impl ItemKind {
    /// Returns the numeric type code used by the vault CLI
    #[must_use]
    pub const fn type_code(self) -> u8 {
        match self {
            Self::Login => 1,
            Self::SecureNote => 2,
            Self::Card => 3,
            Self::Identity => 4,
        }
    }

    /// Maps a vault CLI type code to a kind
    ///
    /// Returns `None` for types this client does not display.
    #[must_use]
    pub const fn from_type_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Login),
            2 => Some(Self::SecureNote),
            3 => Some(Self::Card),
            4 => Some(Self::Identity),
            _ => None,
        }
    }

    /// Returns true if the client can create and edit this kind
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Login | Self::Card)
    }

    /// Lowercase name used in replies and messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::SecureNote => "secure_note",
            Self::Card => "card",
            Self::Identity => "identity",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login payload
#[derive(Debug, Clone, Default)]
pub struct LoginData {
    /// Account username
    pub username: Option<String>,
    /// Account password
    pub password: Option<SecretString>,
    /// TOTP shared secret (base32 or `otpauth://` URI)
    pub totp: Option<SecretString>,
}

/// Card payload
#[derive(Debug, Clone, Default)]
pub struct CardData {
    /// Name printed on the card
    pub cardholder_name: Option<String>,
    /// Card brand, e.g. "Visa"
    pub brand: Option<String>,
    /// Card number
    pub number: Option<SecretString>,
    /// Expiry month as stored by the vault ("1".."12")
    pub exp_month: Option<String>,
    /// Expiry year as stored by the vault
    pub exp_year: Option<String>,
    /// Security code
    pub code: Option<SecretString>,
}

/// Variant-specific item data
#[derive(Debug, Clone)]
pub enum ItemPayload {
    /// Login item
    Login(LoginData),
    /// Card item
    Card(CardData),
    /// Secure note (content lives in `notes`)
    SecureNote,
    /// Identity item
    Identity,
}

impl ItemPayload {
    /// Returns the kind of this payload
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self {
            Self::Login(_) => ItemKind::Login,
            Self::Card(_) => ItemKind::Card,
            Self::SecureNote => ItemKind::SecureNote,
            Self::Identity => ItemKind::Identity,
        }
    }
}

/// A decrypted vault item
#[derive(Debug, Clone)]
pub struct VaultItem {
    /// Vault-assigned id
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Favourite flag
    pub favorite: bool,
    /// Server creation time
    pub created: Option<DateTime<Utc>>,
    /// Server revision time
    pub updated: Option<DateTime<Utc>>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Whether the item sits in the vault trash
    pub trashed: bool,
    /// Variant data
    pub payload: ItemPayload,
}

impl VaultItem {
    /// Returns the item kind
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        self.payload.kind()
    }

    /// Returns the login payload, if this is a login
    #[must_use]
    pub const fn login(&self) -> Option<&LoginData> {
        match &self.payload {
            ItemPayload::Login(login) => Some(login),
            _ => None,
        }
    }

    /// Returns the card payload, if this is a card
    #[must_use]
    pub const fn card(&self) -> Option<&CardData> {
        match &self.payload {
            ItemPayload::Card(card) => Some(card),
            _ => None,
        }
    }
}

/// Login fields supplied for create or edit
///
/// `None` leaves a field untouched on edit; an empty value clears it.
#[derive(Debug, Clone, Default)]
pub struct LoginDraft {
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<SecretString>,
    /// TOTP shared secret
    pub totp: Option<SecretString>,
}

/// Card fields supplied for create or edit
///
/// `None` leaves a field untouched on edit; an empty value clears it.
#[derive(Debug, Clone, Default)]
pub struct CardDraft {
    /// Cardholder name
    pub cardholder_name: Option<String>,
    /// Brand
    pub brand: Option<String>,
    /// Card number
    pub number: Option<SecretString>,
    /// Expiry month (1-12, leading zeros allowed)
    pub exp_month: Option<String>,
    /// Expiry year (leading zeros allowed)
    pub exp_year: Option<String>,
    /// Security code
    pub code: Option<SecretString>,
}

/// Variant-specific draft fields
#[derive(Debug, Clone)]
pub enum DraftFields {
    /// Login draft
    Login(LoginDraft),
    /// Card draft
    Card(CardDraft),
}

/// An item under construction or a set of edits to an existing item
#[derive(Debug, Clone)]
pub struct ItemDraft {
    /// Item name; required on create
    pub name: Option<String>,
    /// Notes
    pub notes: Option<String>,
    /// Favourite flag
    pub favorite: Option<bool>,
    /// Variant fields
    pub fields: DraftFields,
}

impl ItemDraft {
    /// Creates an empty login draft
    #[must_use]
    pub fn login() -> Self {
        Self {
            name: None,
            notes: None,
            favorite: None,
            fields: DraftFields::Login(LoginDraft::default()),
        }
    }

    /// Creates an empty card draft
    #[must_use]
    pub fn card() -> Self {
        Self {
            name: None,
            notes: None,
            favorite: None,
            fields: DraftFields::Card(CardDraft::default()),
        }
    }

    /// Sets the name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the notes
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the favourite flag
    #[must_use]
    pub const fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = Some(favorite);
        self
    }

    /// Replaces the login fields; ignored for card drafts
    #[must_use]
    pub fn with_login(mut self, login: LoginDraft) -> Self {
        if let DraftFields::Login(_) = self.fields {
            self.fields = DraftFields::Login(login);
        }
        self
    }

    /// Replaces the card fields; ignored for login drafts
    #[must_use]
    pub fn with_card(mut self, card: CardDraft) -> Self {
        if let DraftFields::Card(_) = self.fields {
            self.fields = DraftFields::Card(card);
        }
        self
    }

    /// Returns the kind this draft creates or edits
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self.fields {
            DraftFields::Login(_) => ItemKind::Login,
            DraftFields::Card(_) => ItemKind::Card,
        }
    }

    /// Validates the draft for creating a new item
    ///
    /// # Errors
    /// Returns `VaultError::Validation` if the name is missing or blank, or
    /// the card expiry is malformed.
    pub fn validate_for_create(&self) -> VaultResult<()> {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {}
            _ => return Err(VaultError::Validation("Name is required".to_string())),
        }
        self.validate_fields()
    }

    /// Validates the draft as an edit of an existing item
    ///
    /// # Errors
    /// Returns `VaultError::Validation` if the name is set but blank, or the
    /// card expiry is malformed.
    pub fn validate_for_edit(&self) -> VaultResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(VaultError::Validation("Name cannot be empty".to_string()));
            }
        }
        self.validate_fields()
    }

    fn validate_fields(&self) -> VaultResult<()> {
        if let DraftFields::Card(card) = &self.fields {
            if let Some(month) = card.exp_month.as_deref().filter(|m| !m.trim().is_empty()) {
                match month.trim().parse::<u8>() {
                    Ok(1..=12) => {}
                    _ => {
                        return Err(VaultError::Validation(format!(
                            "Invalid expiry month: {month}"
                        )));
                    }
                }
            }
            if let Some(year) = card.exp_year.as_deref().filter(|y| !y.trim().is_empty()) {
                if year.trim().parse::<u16>().is_err() {
                    return Err(VaultError::Validation(format!("Invalid expiry year: {year}")));
                }
            }
        }
        Ok(())
    }
}
