//! URL-safe encodings used for signatures, timestamps and cache keys.
//!
//! - A positional base-64 integer encoding over `0-9a-zA-Z-_`
//! - RFC 4648 base32, lower-cased, padding stripped
//! - URL-safe base64, padding stripped

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use data_encoding::{BASE32, BASE32_NOPAD};

/// Digit alphabet for [`encode_int`], least significant value first.
const INT_ALPHABET: &[u8; 64] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_";

/// Radix of the integer encoding.
const INT_RADIX: i64 = INT_ALPHABET.len() as i64;

/// Encode a non-negative integer, most significant digit first.
pub fn encode_int(value: i64) -> Result<String> {
    if value < 0 {
        return Err(Error::Internal(format!("bad int for encoding: {value}")));
    }

    let mut digits = Vec::new();
    let mut rest = value;
    loop {
        let digit = (rest % INT_RADIX) as usize;
        digits.push(INT_ALPHABET[digit]);
        rest /= INT_RADIX;
        if rest == 0 {
            break;
        }
    }
    digits.reverse();

    // Every alphabet byte is ASCII.
    Ok(digits.into_iter().map(char::from).collect())
}

/// Decode a string produced by [`encode_int`]. The empty string decodes to 0.
pub fn decode_int(s: &str) -> Result<i64> {
    s.bytes().try_fold(0i64, |acc, c| {
        let digit = int_digit(c)
            .ok_or_else(|| Error::Decode(format!("invalid integer digit {:?}", c as char)))?;
        acc.checked_mul(INT_RADIX)
            .and_then(|shifted| shifted.checked_add(digit))
            .ok_or_else(|| Error::Decode(format!("integer overflow decoding {s:?}")))
    })
}

fn int_digit(c: u8) -> Option<i64> {
    let value = match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'z' => c - b'a' + 10,
        b'A'..=b'Z' => c - b'A' + 36,
        b'-' => 62,
        b'_' => 63,
        _ => return None,
    };
    Some(i64::from(value))
}

/// Encode bytes as lower-case base32 without padding.
pub fn encode_base32(bytes: &[u8]) -> String {
    BASE32_NOPAD.encode(bytes).to_ascii_lowercase()
}

/// Encode bytes as lower-case base32 with `=` padding to a multiple of 8.
pub fn encode_base32_padded(bytes: &[u8]) -> String {
    BASE32.encode(bytes).to_ascii_lowercase()
}

/// Decode base32 with or without padding, in either case.
pub fn decode_base32(s: &str) -> Result<Vec<u8>> {
    let normalized = s.trim_end_matches('=').to_ascii_uppercase();
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|e| Error::Decode(format!("invalid base32: {e}")))
}

/// Encode bytes as URL-safe base64 without padding.
pub fn encode_base64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe base64 with or without padding.
pub fn decode_base64(s: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|e| Error::Decode(format!("invalid base64: {e}")))
}
