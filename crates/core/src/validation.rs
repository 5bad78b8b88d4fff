//! Input validation utilities.
//!
//! Functions for checking user inputs before they reach the store.

use crate::{RxError, RxResult};

/// Validates that a store key is safe to use as a file stem.
///
/// Keys become file names inside the data directory, so they must be non-empty, bounded in
/// length and restricted to ASCII letters, digits, `-` and `_`. This rules out path
/// separators and `..`.
///
/// # Errors
///
/// Returns `RxError::InvalidStoreKey` if the key is invalid.
pub fn validate_store_key(key: &str) -> RxResult<()> {
    const MAX_KEY_LEN: usize = 64;

    if key.is_empty() {
        return Err(RxError::InvalidStoreKey("key cannot be empty".into()));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(RxError::InvalidStoreKey(format!(
            "key exceeds maximum length of {} characters",
            MAX_KEY_LEN
        )));
    }

    let ok = key
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_'));

    if !ok {
        return Err(RxError::InvalidStoreKey(format!(
            "{key:?} contains invalid characters (only alphanumeric, '-', '_' allowed)"
        )));
    }

    Ok(())
}

/// Returns `true` when `value` is a well-formed 24-hour `HH:MM` time.
///
/// Equivalent to `^([01]\d|2[0-3]):([0-5]\d)$`.
pub fn is_hh_mm(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }

    let hour_ok = match (bytes[0], bytes[1]) {
        (b'0' | b'1', b'0'..=b'9') => true,
        (b'2', b'0'..=b'3') => true,
        _ => false,
    };
    let minute_ok = matches!((bytes[3], bytes[4]), (b'0'..=b'5', b'0'..=b'9'));

    hour_ok && minute_ok
}
