//! Hex handling and conversions between bytes and field elements.

use anyhow::Result;
use pasta_curves::group::ff::{Field, PrimeField};
use pasta_curves::pallas;

/// Scalar field element used for commitments, nullifier hashes and tree nodes.
pub type FieldElement = pallas::Base;

/// Length of a canonical field element encoding in bytes.
pub const FIELD_BYTES: usize = 32;

fn is_valid_hex_string(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

fn strip_hex_prefix(input: &str) -> &str {
    let trimmed = input.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

/// Validates and strips hex prefix from a string.
///
/// # Arguments
///
/// * `input` - The hex string to validate (may include "0x" or "0X" prefix)
/// * `expected_len` - Expected length of the hex string after stripping prefix
///
/// # Errors
/// Returns an error if:
/// - The hex string has incorrect length
/// - The hex string contains non-hex characters
///
/// # Examples
///
/// ```
/// use privacy_pool::utils::validate_and_strip_hex;
///
/// let result = validate_and_strip_hex("0x1234abcd", 8).unwrap();
/// assert_eq!(result, "1234abcd");
/// ```
pub fn validate_and_strip_hex(input: &str, expected_len: usize) -> Result<String> {
    let stripped = strip_hex_prefix(input);

    if stripped.len() != expected_len {
        return Err(anyhow::anyhow!(
            "Invalid hex string: must be {} characters (got {})",
            expected_len,
            stripped.len()
        ));
    }

    if !is_valid_hex_string(stripped) {
        return Err(anyhow::anyhow!(
            "Invalid hex string: contains non-hex characters"
        ));
    }

    Ok(stripped.to_string())
}

const BASE_U64: u64 = 256;

/// Reduces 32 arbitrary bytes into the Pallas base field.
///
/// The bytes are read as a big-endian base-256 number and reduced modulo the
/// field order, so every input maps to some element. This is a coercion, not
/// the inverse of [`field_to_bytes`].
#[inline]
#[must_use]
pub fn bytes_to_field(bytes: &[u8; 32]) -> FieldElement {
    let mut value = FieldElement::ZERO;
    let base = FieldElement::from(BASE_U64);

    for &byte in bytes.iter() {
        value = value * base + FieldElement::from(u64::from(byte));
    }

    value
}

/// Canonical little-endian encoding of a field element.
#[inline]
#[must_use]
pub fn field_to_bytes(field: FieldElement) -> [u8; FIELD_BYTES] {
    field.to_repr()
}

/// Decodes a canonical little-endian encoding, rejecting values outside the field.
pub fn field_from_bytes(bytes: [u8; FIELD_BYTES]) -> Result<FieldElement> {
    Option::<FieldElement>::from(FieldElement::from_repr(bytes))
        .ok_or_else(|| anyhow::anyhow!("Non-canonical field element encoding"))
}

/// Lowercase hex of the canonical encoding, without prefix.
#[must_use]
pub fn field_to_hex(field: FieldElement) -> String {
    hex::encode(field_to_bytes(field))
}

/// Parses a 64-character hex string (optional `0x`) into a field element.
///
/// # Examples
///
/// ```
/// use privacy_pool::utils::{field_from_hex, field_to_hex, FieldElement};
///
/// let value = FieldElement::from(42);
/// assert_eq!(field_from_hex(&field_to_hex(value)).unwrap(), value);
/// ```
pub fn field_from_hex(input: &str) -> Result<FieldElement> {
    let stripped = validate_and_strip_hex(input, FIELD_BYTES * 2)?;
    let decoded = hex::decode(stripped)?;
    let mut bytes = [0u8; FIELD_BYTES];
    bytes.copy_from_slice(&decoded);
    field_from_bytes(bytes)
}

/// Serde adapter storing a field element as hex text.
pub mod hex_field {
    use super::{field_from_hex, field_to_hex, FieldElement};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &FieldElement, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&field_to_hex(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FieldElement, D::Error> {
        let text = String::deserialize(deserializer)?;
        field_from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for a sequence of hex-encoded field elements.
pub mod hex_field_vec {
    use super::{field_from_hex, field_to_hex, FieldElement};
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        values: &[FieldElement],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&field_to_hex(*value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<FieldElement>, D::Error> {
        let texts = Vec::<String>::deserialize(deserializer)?;
        texts
            .iter()
            .map(|text| field_from_hex(text).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_and_strip_hex_valid() {
        let result = validate_and_strip_hex("0x1234abcd", 8);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "1234abcd");
    }

    #[test]
    fn test_validate_and_strip_hex_uppercase_prefix() {
        let result = validate_and_strip_hex("0X1234ABCD", 8);
        assert_eq!(result.unwrap(), "1234ABCD");
    }

    #[test]
    fn test_validate_and_strip_hex_with_whitespace() {
        let result = validate_and_strip_hex("  0x1234abcd  ", 8);
        assert_eq!(result.unwrap(), "1234abcd");
    }

    #[test]
    fn test_validate_and_strip_hex_wrong_length() {
        let result = validate_and_strip_hex("0x1234abcd", 10);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must be 10 characters"));
    }

    #[test]
    fn test_validate_and_strip_hex_invalid_characters() {
        let result = validate_and_strip_hex("0x1234xyzw", 8);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("non-hex characters"));
    }

    #[test]
    fn test_bytes_to_field_distinguishes_inputs() {
        let one = bytes_to_field(&[1u8; 32]);
        let two = bytes_to_field(&[2u8; 32]);
        assert_ne!(one, FieldElement::ZERO);
        assert_ne!(one, two);
    }

    #[test]
    fn test_bytes_to_field_small_value() {
        let mut bytes = [0u8; 32];
        bytes[31] = 7;
        assert_eq!(bytes_to_field(&bytes), FieldElement::from(7));
    }

    #[test]
    fn test_field_hex_accepts_prefix() {
        let value = FieldElement::from(0xdead_beef);
        let text = format!("0x{}", field_to_hex(value));
        assert_eq!(field_from_hex(&text).unwrap(), value);
    }

    #[test]
    fn test_field_from_hex_rejects_non_canonical() {
        let result = field_from_hex(&"ff".repeat(32));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Non-canonical"));
    }
}
