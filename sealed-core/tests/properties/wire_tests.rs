//! Property-based tests for the CLI wire format

use proptest::prelude::*;
use secrecy::SecretString;
use sealed_core::bitwarden::wire::{apply_draft, decode_payload, encode_payload, parse_item_list};
use sealed_core::{ItemDraft, LoginDraft};
use serde_json::{Value, json};

/// Strategy for generating a raw item of any type code, trashed or not
fn arb_raw_item() -> impl Strategy<Value = (u8, bool, String)> {
    (1u8..=6, any::<bool>(), "[A-Za-z0-9 ]{0,24}")
}

fn raw(index: usize, type_code: u8, trashed: bool, name: &str) -> Value {
    json!({
        "id": format!("id-{index}"),
        "type": type_code,
        "name": name,
        "revisionDate": "2025-01-02T03:04:05.000Z",
        "deletedDate": if trashed { json!("2025-02-01T00:00:00.000Z") } else { Value::Null },
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: supported types are kept in order, unsupported ones skipped,
    /// and the trashed flag follows `deletedDate`
    #[test]
    fn prop_listing_keeps_supported_items(items in prop::collection::vec(arb_raw_item(), 0..20)) {
        let listing: Vec<Value> = items
            .iter()
            .enumerate()
            .map(|(i, (code, trashed, name))| raw(i, *code, *trashed, name))
            .collect();
        let parsed = parse_item_list(&Value::Array(listing).to_string(), false).unwrap();

        let expected: Vec<_> = items
            .iter()
            .enumerate()
            .filter(|(_, (code, _, _))| (1..=4).contains(code))
            .collect();
        prop_assert_eq!(parsed.len(), expected.len());
        for (item, (index, (_, trashed, name))) in parsed.iter().zip(expected) {
            prop_assert_eq!(item.id.as_str(), format!("id-{index}"));
            prop_assert_eq!(&item.name, name);
            prop_assert_eq!(item.trashed, *trashed);
            prop_assert!(item.updated.is_some());
        }
    }

    /// Property: editing never drops attributes the client does not model
    #[test]
    fn prop_apply_draft_preserves_unknown_fields(
        key in "x[a-z]{1,10}",
        value in "[ -~]{0,30}",
        password in "[ -~]{1,30}",
    ) {
        let mut item = json!({
            "id": "abc",
            "type": 1,
            "name": "GitHub",
            "login": {"username": "ada", "password": "old", "uris": [{"uri": "https://github.com"}]},
        });
        item[key.as_str()] = Value::String(value.clone());

        let draft = ItemDraft::login().with_login(LoginDraft {
            password: Some(SecretString::from(password.clone())),
            ..LoginDraft::default()
        });
        apply_draft(&mut item, &draft).unwrap();

        prop_assert_eq!(&item[key.as_str()], &Value::String(value));
        prop_assert_eq!(&item["login"]["password"], &Value::String(password));
        prop_assert_eq!(&item["login"]["username"], "ada");
        prop_assert_eq!(&item["login"]["uris"][0]["uri"], "https://github.com");
        prop_assert_eq!(&item["name"], "GitHub");
    }

    /// Property: stdin payloads decode to the JSON that was encoded
    #[test]
    fn prop_payload_encoding_is_lossless(name in "\\PC{0,40}", notes in "\\PC{0,80}") {
        let payload = json!({"type": 2, "name": name, "notes": notes});
        let encoded = encode_payload(&payload);
        let decoded = decode_payload(secrecy::ExposeSecret::expose_secret(&encoded)).unwrap();
        prop_assert_eq!(decoded, payload);
    }
}
