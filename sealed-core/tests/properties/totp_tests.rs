//! Property-based tests for TOTP code generation

use data_encoding::BASE32_NOPAD;
use proptest::prelude::*;
use secrecy::SecretString;
use sealed_core::totp::{TotpParams, generate_totp_at};

/// Strategy for generating a shared secret of 10 to 64 bytes
fn arb_key() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 10..64)
}

/// Strategy for generating Unix times up to the year 2286
fn arb_time() -> impl Strategy<Value = u64> {
    0u64..10_000_000_000
}

fn uri(secret: &str, digits: u32, period: u64, algorithm: &str) -> String {
    format!("otpauth://totp/Test:ada?secret={secret}&digits={digits}&period={period}&algorithm={algorithm}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: codes have the configured number of digits and are numeric
    #[test]
    fn prop_code_shape(
        key in arb_key(),
        time in arb_time(),
        digits in 6u32..=8,
        period in 1u64..=120,
        algorithm in prop::sample::select(vec!["SHA1", "SHA256", "SHA512"]),
    ) {
        let secret = BASE32_NOPAD.encode(&key);
        let params = TotpParams::parse(&uri(&secret, digits, period, algorithm)).unwrap();
        let code = params.code_at(time);

        prop_assert_eq!(code.code.len(), digits as usize);
        prop_assert!(code.code.chars().all(|c| c.is_ascii_digit()));
        prop_assert!(code.remaining_seconds >= 1 && code.remaining_seconds <= period);
    }

    /// Property: a code is the same for every second of its window
    #[test]
    fn prop_code_constant_within_window(key in arb_key(), time in arb_time()) {
        let secret = SecretString::from(BASE32_NOPAD.encode(&key));
        let window_start = time - time % 30;

        let at_start = generate_totp_at(&secret, window_start).unwrap();
        let at_time = generate_totp_at(&secret, time).unwrap();
        prop_assert_eq!(at_start.code, at_time.code);
        prop_assert_eq!(at_time.remaining_seconds, 30 - time % 30);
    }

    /// Property: lower case, spaces and padding do not change the code
    #[test]
    fn prop_secret_formatting_is_ignored(key in arb_key(), time in arb_time()) {
        let canonical = BASE32_NOPAD.encode(&key);
        let messy: String = canonical
            .to_lowercase()
            .chars()
            .enumerate()
            .flat_map(|(i, c)| if i % 4 == 3 { vec![c, ' '] } else { vec![c] })
            .collect();
        let padded = format!("{messy}====");

        let expected = generate_totp_at(&SecretString::from(canonical), time).unwrap();
        let actual = generate_totp_at(&SecretString::from(padded), time).unwrap();
        prop_assert_eq!(expected, actual);
    }

    /// Property: a plain secret is a SHA1, 6 digit, 30 second URI
    #[test]
    fn prop_plain_secret_matches_default_uri(key in arb_key(), time in arb_time()) {
        let secret = BASE32_NOPAD.encode(&key);
        let plain = TotpParams::parse(&secret).unwrap().code_at(time);
        let from_uri = TotpParams::parse(&uri(&secret, 6, 30, "SHA1")).unwrap().code_at(time);
        prop_assert_eq!(plain, from_uri);
    }
}
