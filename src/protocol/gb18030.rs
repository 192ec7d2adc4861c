//! # GB18030 Encoding
//!
//! Converts Unicode strings to GB18030 multi-byte encoding for label text.
//!
//! The supported printer firmware expects command lines in GB18030, so CJK
//! and Latin content share one label without codepage switches. ASCII
//! (U+0000–U+007F) passes through unchanged; other characters become 2- or
//! 4-byte sequences.
//!
//! GB18030 covers all of Unicode except U+E5E5, the one code point the
//! encoding reserves, so in practice [`encode`] fails only on that
//! character. Failures never produce partial output: the caller gets the
//! error and nothing was written anywhere.

use encoding_rs::GB18030;
use thiserror::Error;

/// A character in label text has no GB18030 byte sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Character {character:?} has no GB18030 encoding")]
pub struct EncodingError {
    /// The first character that failed to encode.
    pub character: char,
}

/// Encode a Unicode string as GB18030 bytes.
///
/// - ASCII: passed through as-is (GB18030 is ASCII-compatible)
/// - Other characters: 2- or 4-byte GB18030 sequences
/// - Unencodable input: `Err` naming the first offending character
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::gb18030::encode;
///
/// assert_eq!(encode("CLS").unwrap(), b"CLS");
/// assert_eq!(encode("中").unwrap(), vec![0xD6, 0xD0]);
/// ```
pub fn encode(text: &str) -> Result<Vec<u8>, EncodingError> {
    if text.is_ascii() {
        return Ok(text.as_bytes().to_vec());
    }

    let (bytes, _, had_unmappable) = GB18030.encode(text);
    if had_unmappable {
        return Err(EncodingError {
            character: first_unmappable(text),
        });
    }
    Ok(bytes.into_owned())
}

/// Walk the input again to name the character the encoder flagged.
fn first_unmappable(text: &str) -> char {
    let mut buf = [0u8; 4];
    text.chars()
        .find(|ch| GB18030.encode(ch.encode_utf8(&mut buf)).2)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}
