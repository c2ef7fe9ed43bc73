//! Byte-fallback pieces and lossy UTF-8 assembly.
//!
//! SentencePiece represents each raw byte that has no better piece as a
//! dedicated vocabulary entry spelled `<0xXY>`, where `XY` is the byte value
//! in hexadecimal:
//!
//! - `<0x41>` is the byte `A`
//! - `<0xE2>` is the first byte of a three-byte UTF-8 sequence
//!
//! Decoding a run of byte pieces yields arbitrary bytes, which are turned
//! back into text with one replacement character (U+FFFD) per byte that does
//! not start a complete, valid UTF-8 sequence. This is stricter than
//! [`String::from_utf8_lossy`], which replaces a whole maximal invalid
//! subsequence with a single U+FFFD, and matches SentencePiece output
//! byte for byte.

use std::sync::LazyLock;

/// Spelling of every byte piece, indexed by byte value.
static BYTE_PIECES: LazyLock<[String; 256]> =
    LazyLock::new(|| std::array::from_fn(|b| format!("<0x{:02X}>", b)));

/// The canonical `<0xXY>` text of a byte piece.
#[inline]
pub fn byte_piece_text(byte: u8) -> &'static str {
    &BYTE_PIECES[byte as usize]
}

/// Parse a `<0xXY>` piece into the byte it represents.
///
/// Exactly two hex digits are accepted, in either case. Anything else,
/// including `0x12>`, `<x12>` and `<0xTA>`, yields `None`.
pub fn convert_hex_value(piece: &str) -> Option<u8> {
    let digits = piece.strip_prefix("<0x")?.strip_suffix('>')?;
    if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Outcome of decoding the first character of a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Utf8Step {
    /// A complete character and its encoded length.
    Char(char, usize),
    /// The first byte can never start a valid sequence here.
    Invalid,
    /// The buffer holds a proper prefix of a valid sequence.
    Incomplete,
}

/// Decode the first UTF-8 character of `buf`.
pub(crate) fn next_char(buf: &[u8]) -> Utf8Step {
    if buf.is_empty() {
        return Utf8Step::Incomplete;
    }
    let head = &buf[..buf.len().min(4)];
    let valid = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(e) if e.valid_up_to() > 0 => match std::str::from_utf8(&head[..e.valid_up_to()]) {
            Ok(s) => s,
            Err(_) => return Utf8Step::Invalid,
        },
        Err(e) => {
            return match e.error_len() {
                Some(_) => Utf8Step::Invalid,
                None => Utf8Step::Incomplete,
            }
        }
    };
    match valid.chars().next() {
        Some(c) => Utf8Step::Char(c, c.len_utf8()),
        None => Utf8Step::Invalid,
    }
}

/// Append `bytes` to `out`, replacing each undecodable byte with U+FFFD.
///
/// The buffer is treated as complete: a truncated sequence at the end is
/// replaced byte by byte as well.
pub fn decode_utf8_lossy(bytes: &[u8], out: &mut String) {
    if let Ok(s) = std::str::from_utf8(bytes) {
        out.push_str(s);
        return;
    }

    let mut rest = bytes;
    while !rest.is_empty() {
        match next_char(rest) {
            Utf8Step::Char(c, len) => {
                out.push(c);
                rest = &rest[len..];
            }
            Utf8Step::Invalid | Utf8Step::Incomplete => {
                out.push(char::REPLACEMENT_CHARACTER);
                rest = &rest[1..];
            }
        }
    }
}
