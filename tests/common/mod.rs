//! Shared fixture model for the integration tests.
//!
//! Layout:
//! - 0 `<unk>`, 1 `<s>`, 2 `</s>`
//! - 3 `<table>`, 4 `</table>`, 5 `<th>`, 6 `</th>` (user-defined)
//! - 7..=262 byte pieces, so byte `b` has id `7 + b`
//! - single characters, then merged pieces with descending scores

#![allow(dead_code)]

use piecetok::{byte_piece_text, Piece, PieceType, Processor, TrainerSpec};

pub const UNK: u32 = 0;
pub const BOS: u32 = 1;
pub const EOS: u32 = 2;
pub const TABLE: u32 = 3;
pub const TABLE_END: u32 = 4;
pub const TH: u32 = 5;
pub const TH_END: u32 = 6;

pub fn byte_id(b: u8) -> u32 {
    7 + b as u32
}

const SINGLES: &[&str] = &["h", "e", "l", "o", "▁", "w", "r", "d", "a", "b", "c"];

const MERGES: &[(&str, f32)] = &[
    ("ll", -1.0),
    ("▁w", -1.5),
    ("he", -2.0),
    ("or", -2.5),
    ("ld", -2.6),
    ("hell", -3.0),
    ("▁wor", -3.5),
    ("hello", -4.0),
    ("▁world", -4.5),
];

/// Pieces of the fixture model, optionally including the 256 byte pieces.
pub fn pieces(with_bytes: bool) -> Vec<Piece> {
    let mut pieces = vec![
        Piece::new("<unk>", 0.0, PieceType::Unknown),
        Piece::new("<s>", 0.0, PieceType::Control),
        Piece::new("</s>", 0.0, PieceType::Control),
        Piece::new("<table>", 0.0, PieceType::UserDefined),
        Piece::new("</table>", 0.0, PieceType::UserDefined),
        Piece::new("<th>", 0.0, PieceType::UserDefined),
        Piece::new("</th>", 0.0, PieceType::UserDefined),
    ];
    if with_bytes {
        for b in 0..=255u8 {
            pieces.push(Piece::new(byte_piece_text(b), 0.0, PieceType::Byte));
        }
    }
    pieces.extend(SINGLES.iter().map(|s| Piece::normal(*s, -10.0)));
    pieces.extend(MERGES.iter().map(|&(s, score)| Piece::normal(s, score)));
    pieces
}

/// Fixture model with byte fallback enabled.
pub fn processor() -> Processor {
    Processor::new(pieces(true), TrainerSpec::with_byte_fallback())
        .expect("fixture model should be valid")
}

/// The same model without byte pieces or byte fallback.
pub fn processor_without_fallback() -> Processor {
    Processor::new(pieces(false), TrainerSpec::default())
        .expect("fixture model should be valid")
}
