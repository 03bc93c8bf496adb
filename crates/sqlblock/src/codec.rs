use alloy_primitives::hex;
use alloy_primitives::U256;
use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::model::Uint256;


impl Uint256 {
    /// Renders the value as a plain decimal string, recognizing any
    /// base prefix of the source format. Unparsable input becomes `0`.
    pub fn to_decimal(&self) -> String {
        self.0
            .parse::<U256>()
            .map(|value| value.to_string())
            .unwrap_or_else(|_| "0".to_string())
    }
}


/// Normalizes a hex string (with or without `0x` prefix) into raw bytes
/// for a `bytea` parameter. Empty input means "no value", never an empty blob.
pub fn hex_bytes(raw: &str) -> anyhow::Result<Option<Vec<u8>>> {
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    if raw.is_empty() {
        return Ok(None);
    }
    let bytes = hex::decode(raw).with_context(|| format!("invalid hex string '{raw}'"))?;
    Ok(Some(bytes))
}


/// Decodes a base58 hash the way the upstream feed is consumed:
/// missing or malformed input degrades to "no value".
pub fn base58_bytes(raw: &str) -> Option<Vec<u8>> {
    let bytes = bs58::decode(raw).into_vec().unwrap_or_default();
    (!bytes.is_empty()).then_some(bytes)
}


pub fn bytes_opt(bytes: &[u8]) -> Option<Vec<u8>> {
    (!bytes.is_empty()).then(|| bytes.to_vec())
}


/// Truncates a nanosecond timestamp to whole seconds.
pub fn timestamp_secs(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(nanos / 1_000_000_000, 0).unwrap_or_default()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint256_parses_hex_and_decimal() {
        assert_eq!(Uint256("0x10".to_string()).to_decimal(), "16");
        assert_eq!(Uint256("1000000".to_string()).to_decimal(), "1000000");
        assert_eq!(
            Uint256("0xffffffffffffffffffffffffffffffff".to_string()).to_decimal(),
            "340282366920938463463374607431768211455"
        );
    }

    #[test]
    fn uint256_defaults_to_zero_on_garbage() {
        assert_eq!(Uint256("".to_string()).to_decimal(), "0");
        assert_eq!(Uint256("not a number".to_string()).to_decimal(), "0");
        assert_eq!(Uint256("-5".to_string()).to_decimal(), "0");
    }

    #[test]
    fn hex_bytes_normalizes_prefix() {
        assert_eq!(hex_bytes("0xdead").unwrap(), Some(vec![0xde, 0xad]));
        assert_eq!(hex_bytes("dead").unwrap(), Some(vec![0xde, 0xad]));
    }

    #[test]
    fn hex_bytes_maps_empty_to_null() {
        assert_eq!(hex_bytes("").unwrap(), None);
        assert_eq!(hex_bytes("0x").unwrap(), None);
    }

    #[test]
    fn hex_bytes_rejects_malformed_input() {
        assert!(hex_bytes("0xzz").is_err());
        assert!(hex_bytes("abc").is_err());
    }

    #[test]
    fn base58_decodes_near_hashes() {
        let bytes = base58_bytes("6gCQ9VSkBprHHZzoxXZ5N9TLGWA5qnvESGdebeGGJkiV").unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(base58_bytes(""), None);
        assert_eq!(base58_bytes("0OIl"), None);
    }

    #[test]
    fn timestamps_truncate_to_seconds() {
        let ts = timestamp_secs(1_650_000_000_999_999_999);
        assert_eq!(ts.timestamp(), 1_650_000_000);
        assert_eq!(ts.timestamp_subsec_nanos(), 0);
    }
}
