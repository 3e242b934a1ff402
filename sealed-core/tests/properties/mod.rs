//! Property tests grouped by component

mod cache_tests;
mod totp_tests;
mod wire_tests;
