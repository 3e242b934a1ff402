//! JSON wire format of the Bitwarden CLI
//!
//! Everything that knows the shape of `bw` output and input lives here:
//! parsing item listings into [`VaultItem`]s, building the payload for
//! `bw create item`, and patching a raw item for `bw edit item` so that
//! attributes this client does not model (URIs, custom fields, password
//! history) are preserved.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{VaultError, VaultResult};
use crate::models::{
    CardData, CardDraft, DraftFields, ItemDraft, ItemId, ItemKind, ItemPayload, LoginData,
    LoginDraft, VaultItem,
};

/// Item as printed by `bw list items` / `bw get item`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    id: String,
    #[serde(rename = "type")]
    item_type: u8,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    favorite: bool,
    #[serde(default)]
    creation_date: Option<String>,
    #[serde(default)]
    revision_date: Option<String>,
    #[serde(default)]
    deleted_date: Option<String>,
    #[serde(default)]
    login: Option<WireLogin>,
    #[serde(default)]
    card: Option<WireCard>,
}

#[derive(Debug, Deserialize)]
struct WireLogin {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    totp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCard {
    #[serde(default)]
    cardholder_name: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    exp_month: Option<String>,
    #[serde(default)]
    exp_year: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Response of `bw status`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// "unauthenticated", "locked" or "unlocked"
    pub status: String,
    /// Configured server
    #[serde(default)]
    pub server_url: Option<String>,
    /// Logged-in account
    #[serde(default)]
    pub user_email: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn secret(value: Option<String>) -> Option<SecretString> {
    non_empty(value).map(SecretString::from)
}

fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .filter(|v| !v.is_empty())
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|t| t.with_timezone(&Utc))
}

impl WireItem {
    fn into_item(self, from_trash: bool) -> Option<VaultItem> {
        let Some(kind) = ItemKind::from_type_code(self.item_type) else {
            debug!(item_type = self.item_type, "Skipping unsupported item type");
            return None;
        };

        let payload = match kind {
            ItemKind::Login => {
                let login = self.login.unwrap_or(WireLogin {
                    username: None,
                    password: None,
                    totp: None,
                });
                ItemPayload::Login(LoginData {
                    username: non_empty(login.username),
                    password: secret(login.password),
                    totp: secret(login.totp),
                })
            }
            ItemKind::Card => {
                let card = self.card.unwrap_or(WireCard {
                    cardholder_name: None,
                    brand: None,
                    number: None,
                    exp_month: None,
                    exp_year: None,
                    code: None,
                });
                ItemPayload::Card(CardData {
                    cardholder_name: non_empty(card.cardholder_name),
                    brand: non_empty(card.brand),
                    number: secret(card.number),
                    exp_month: non_empty(card.exp_month),
                    exp_year: non_empty(card.exp_year),
                    code: secret(card.code),
                })
            }
            ItemKind::SecureNote => ItemPayload::SecureNote,
            ItemKind::Identity => ItemPayload::Identity,
        };

        Some(VaultItem {
            id: ItemId::new(self.id),
            name: self.name.unwrap_or_default(),
            favorite: self.favorite,
            created: parse_date(self.creation_date.as_deref()),
            updated: parse_date(self.revision_date.as_deref()),
            notes: non_empty(self.notes),
            trashed: from_trash || self.deleted_date.as_deref().is_some_and(|d| !d.is_empty()),
            payload,
        })
    }
}

/// Parses the output of `bw list items`
///
/// Items of types this client does not display are skipped.
///
/// # Errors
/// Returns `VaultError::Parse` if the output is not a JSON array of items.
pub fn parse_item_list(output: &str, from_trash: bool) -> VaultResult<Vec<VaultItem>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let items: Vec<WireItem> = serde_json::from_str(trimmed)
        .map_err(|e| VaultError::Parse(format!("item list: {e}")))?;
    Ok(items
        .into_iter()
        .filter_map(|item| item.into_item(from_trash))
        .collect())
}

/// Parses a single item, as printed by `bw get/create/edit item`
///
/// # Errors
/// Returns `VaultError::Parse` if the output is not an item of a supported type.
pub fn parse_item(output: &str) -> VaultResult<VaultItem> {
    let item: WireItem = serde_json::from_str(output.trim())
        .map_err(|e| VaultError::Parse(format!("item: {e}")))?;
    let item_type = item.item_type;
    item.into_item(false)
        .ok_or_else(|| VaultError::Parse(format!("unsupported item type {item_type}")))
}

/// Parses a raw item without interpreting it, for patching before edit
///
/// # Errors
/// Returns `VaultError::Parse` if the output is not a JSON object.
pub fn parse_raw_item(output: &str) -> VaultResult<Value> {
    let value: Value = serde_json::from_str(output.trim())
        .map_err(|e| VaultError::Parse(format!("item: {e}")))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(VaultError::Parse("item is not a JSON object".to_string()))
    }
}

/// Parses the output of `bw status`
///
/// # Errors
/// Returns `VaultError::Parse` if the output is not a status object.
pub fn parse_status(output: &str) -> VaultResult<StatusResponse> {
    serde_json::from_str(output.trim()).map_err(|e| VaultError::Parse(format!("status: {e}")))
}

fn text_value(value: Option<&str>) -> Value {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Value::String(v.to_string()),
        _ => Value::Null,
    }
}

/// Secrets are stored verbatim; only an empty value becomes null
fn secret_value(value: Option<&SecretString>) -> Value {
    match value.map(|s| s.expose_secret()) {
        Some(v) if !v.is_empty() => Value::String(v.to_string()),
        _ => Value::Null,
    }
}

/// Normalises an expiry component the way the vault stores it ("07" -> "7")
fn expiry_value(value: Option<&str>) -> Value {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v
            .parse::<u16>()
            .map_or_else(|_| Value::String(v.to_string()), |n| Value::String(n.to_string())),
        _ => Value::Null,
    }
}

fn login_object(login: &LoginDraft) -> Value {
    json!({
        "uris": [],
        "username": text_value(login.username.as_deref()),
        "password": secret_value(login.password.as_ref()),
        "totp": secret_value(login.totp.as_ref()),
        "fido2Credentials": [],
    })
}

fn card_object(card: &CardDraft) -> Value {
    json!({
        "cardholderName": text_value(card.cardholder_name.as_deref()),
        "brand": text_value(card.brand.as_deref()),
        "number": secret_value(card.number.as_ref()),
        "expMonth": expiry_value(card.exp_month.as_deref()),
        "expYear": expiry_value(card.exp_year.as_deref()),
        "code": secret_value(card.code.as_ref()),
    })
}

/// Builds the item template for `bw create item`
#[must_use]
pub fn new_item_payload(draft: &ItemDraft) -> Value {
    let (login, card) = match &draft.fields {
        DraftFields::Login(login) => (login_object(login), Value::Null),
        DraftFields::Card(card) => (Value::Null, card_object(card)),
    };

    json!({
        "passwordHistory": [],
        "revisionDate": null,
        "creationDate": null,
        "deletedDate": null,
        "organizationId": null,
        "collectionIds": null,
        "folderId": null,
        "type": draft.kind().type_code(),
        "name": text_value(draft.name.as_deref()),
        "notes": text_value(draft.notes.as_deref()),
        "favorite": draft.favorite.unwrap_or(false),
        "fields": [],
        "login": login,
        "secureNote": null,
        "card": card,
        "identity": null,
        "sshKey": null,
        "reprompt": 0,
    })
}

fn take_section(raw: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match raw.remove(key) {
        Some(Value::Object(section)) => section,
        _ => Map::new(),
    }
}

fn patch(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

/// Applies the fields set in `draft` to a raw item from `bw get item`
///
/// Fields left as `None` in the draft keep their current value; empty
/// values clear the field.
///
/// # Errors
/// Returns `VaultError::Parse` if `raw` is not a JSON object.
pub fn apply_draft(raw: &mut Value, draft: &ItemDraft) -> VaultResult<()> {
    let Value::Object(map) = raw else {
        return Err(VaultError::Parse("item is not a JSON object".to_string()));
    };

    patch(map, "name", draft.name.as_deref().map(|n| text_value(Some(n))));
    patch(map, "notes", draft.notes.as_deref().map(|n| text_value(Some(n))));
    patch(map, "favorite", draft.favorite.map(Value::Bool));

    match &draft.fields {
        DraftFields::Login(login) => {
            let mut target = take_section(map, "login");
            patch(&mut target, "username", login.username.as_deref().map(|v| text_value(Some(v))));
            patch(&mut target, "password", login.password.as_ref().map(|v| secret_value(Some(v))));
            patch(&mut target, "totp", login.totp.as_ref().map(|v| secret_value(Some(v))));
            map.insert("login".to_string(), Value::Object(target));
        }
        DraftFields::Card(card) => {
            let mut target = take_section(map, "card");
            patch(
                &mut target,
                "cardholderName",
                card.cardholder_name.as_deref().map(|v| text_value(Some(v))),
            );
            patch(&mut target, "brand", card.brand.as_deref().map(|v| text_value(Some(v))));
            patch(&mut target, "number", card.number.as_ref().map(|v| secret_value(Some(v))));
            patch(&mut target, "expMonth", card.exp_month.as_deref().map(|v| expiry_value(Some(v))));
            patch(&mut target, "expYear", card.exp_year.as_deref().map(|v| expiry_value(Some(v))));
            patch(&mut target, "code", card.code.as_ref().map(|v| secret_value(Some(v))));
            map.insert("card".to_string(), Value::Object(target));
        }
    }
    Ok(())
}

/// Returns the type code stored in a raw item
#[must_use]
pub fn raw_item_kind(raw: &Value) -> Option<ItemKind> {
    raw.get("type")
        .and_then(Value::as_u64)
        .and_then(|code| u8::try_from(code).ok())
        .and_then(ItemKind::from_type_code)
}

/// Encodes an item payload the way `bw create/edit` expect it
///
/// The result is secret: it contains every field of the item.
#[must_use]
pub fn encode_payload(payload: &Value) -> SecretString {
    SecretString::from(STANDARD.encode(payload.to_string()))
}

/// Decodes an encoded payload (inverse of [`encode_payload`])
///
/// # Errors
/// Returns `VaultError::Parse` if the input is not base64-encoded JSON.
pub fn decode_payload(encoded: &str) -> VaultResult<Value> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| VaultError::Parse(format!("payload encoding: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| VaultError::Parse(format!("payload: {e}")))
}
