//! Byte-level helpers shared by every decoder.
//!
//! Transports deliver the same device stream either as raw bytes (serial) or as a
//! lowercase hex string (wireless notifications). These helpers move between the two
//! representations and pull fixed-width fields out of hex text.

use crate::core::FrameData;
use std::borrow::Cow;

/// True when `text` is a non-empty, even-length run of lowercase hex digits.
///
/// Only strings of this shape are hex-decoded by [`normalize`]; anything else is taken
/// to be plain ASCII already.
pub fn looks_like_hex(text: &str) -> bool {
    !text.is_empty()
        && text.len() % 2 == 0
        && text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Reduce a frame payload to raw bytes.
pub fn normalize<'a>(data: &FrameData<'a>) -> Cow<'a, [u8]> {
    match *data {
        FrameData::Bytes(bytes) => Cow::Borrowed(bytes),
        FrameData::Text(text) if looks_like_hex(text) => match hex::decode(text) {
            Ok(bytes) => Cow::Owned(bytes),
            Err(_) => Cow::Borrowed(text.as_bytes()),
        },
        FrameData::Text(text) => Cow::Borrowed(text.as_bytes()),
    }
}

/// Express a frame payload as compact lowercase hex text.
///
/// Bytes are hex-encoded. Text is stripped of whitespace and lowercased, and otherwise
/// passed through untouched (it may still contain non-hex garbage).
pub fn to_hex<'a>(data: &FrameData<'a>) -> Cow<'a, str> {
    match *data {
        FrameData::Bytes(bytes) => Cow::Owned(hex::encode(bytes)),
        FrameData::Text(text) => {
            if text
                .chars()
                .any(|c| c.is_whitespace() || c.is_ascii_uppercase())
            {
                Cow::Owned(
                    text.chars()
                        .filter(|c| !c.is_whitespace())
                        .map(|c| c.to_ascii_lowercase())
                        .collect(),
                )
            } else {
                Cow::Borrowed(text)
            }
        }
    }
}

/// Reinterpret bytes as text, one char per byte.
pub fn ascii_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode the two hex characters starting at `offset`.
pub fn hex_byte_at(hex: &str, offset: usize) -> Option<u8> {
    let field = hex.as_bytes().get(offset..offset + 2)?;
    Some((nibble(field[0])? << 4) | nibble(field[1])?)
}

/// Assemble a little-endian 16-bit unsigned integer.
pub fn le_u16(low: u8, high: u8) -> u16 {
    u16::from_le_bytes([low, high])
}

/// Read a little-endian `u16` stored as four hex characters at `offset`.
pub fn hex_le_u16_at(hex: &str, offset: usize) -> Option<u16> {
    Some(le_u16(hex_byte_at(hex, offset)?, hex_byte_at(hex, offset + 2)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_hex() {
        assert!(looks_like_hex("4c3a"));
        assert!(looks_like_hex("0d0a"));
        assert!(!looks_like_hex(""));
        assert!(!looks_like_hex("abc"));
        assert!(!looks_like_hex("4C3A"));
        assert!(!looks_like_hex("12R3"));
    }

    #[test]
    fn test_normalize_hex_text() {
        let data = FrameData::Text("312e320d0a");
        assert_eq!(normalize(&data).as_ref(), b"1.2\r\n");
    }

    #[test]
    fn test_normalize_plain_text_and_bytes() {
        assert_eq!(normalize(&FrameData::Text("12R")).as_ref(), b"12R");
        assert_eq!(normalize(&FrameData::Bytes(&[0x4c, 0x3a])).as_ref(), &[0x4c, 0x3a]);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&FrameData::Bytes(&[0x4c, 0x3a, 0x01])), "4c3a01");
        assert_eq!(to_hex(&FrameData::Text("4C 3A\n01")), "4c3a01");
        assert!(matches!(to_hex(&FrameData::Text("4c3a")), Cow::Borrowed(_)));
    }

    #[test]
    fn test_hex_byte_at() {
        assert_eq!(hex_byte_at("4c3a", 0), Some(0x4c));
        assert_eq!(hex_byte_at("4c3a", 2), Some(0x3a));
        assert_eq!(hex_byte_at("4c3a", 3), None);
        assert_eq!(hex_byte_at("+f", 0), None);
        assert_eq!(hex_byte_at("zz", 0), None);
    }

    #[test]
    fn test_le_u16() {
        assert_eq!(le_u16(0x01, 0x00), 1);
        assert_eq!(le_u16(0x00, 0x01), 256);
        assert_eq!(hex_le_u16_at("e803", 0), Some(1000));
    }

    #[test]
    fn test_ascii_text() {
        assert_eq!(ascii_text(b"2.7\r\n"), "2.7\r\n");
    }
}
