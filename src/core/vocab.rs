//! Vocabulary table built from parsed SentencePiece pieces.
//!
//! The table is constructed once from the ordered piece list of a model (the
//! index of a piece is its token id) and is read-only afterwards. It splits
//! the pieces into two lookup maps:
//!
//! - `pieces`: NORMAL, USER_DEFINED and UNUSED pieces. These are the only
//!   valid targets of a BPE merge.
//! - `reserved`: UNKNOWN, CONTROL and BYTE pieces. They can be emitted when a
//!   final symbol spells them exactly, but are never merged into.
//!
//! When byte fallback is enabled it also holds the 256 byte pieces in both
//! directions (byte → token, id → byte).
//!
//! All model validation happens here; once a table exists, encoding and
//! decoding cannot fail.

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::byte_piece::convert_hex_value;
use super::model::{ModelType, Piece, PieceType, Token, TrainerSpec};

/// Errors that can occur when building a vocabulary table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabError {
    #[error("Unknown piece is not defined")]
    MissingUnknown,
    #[error("Unknown piece redefined at id {second} (first defined at id {first})")]
    DuplicateUnknown { first: u32, second: u32 },
    #[error("Malformed byte piece {piece:?} at id {id}")]
    MalformedBytePiece { id: u32, piece: String },
    #[error("Byte value 0x{byte:02X} not found")]
    IncompleteByteCoverage { byte: u8 },
    #[error("Byte piece {piece:?} at id {id} found although byte_fallback=false")]
    BytePieceWithoutFallback { id: u32, piece: String },
    #[error("Model type {0} not supported")]
    UnsupportedModelType(ModelType),
    #[error(
        "Normalizer options not supported: add_dummy_prefix={add_dummy_prefix}, \
         remove_extra_whitespaces={remove_extra_whitespaces}"
    )]
    UnsupportedNormalizerOptions {
        add_dummy_prefix: bool,
        remove_extra_whitespaces: bool,
    },
    #[error("Vocabulary has {0} pieces, more than token ids can address")]
    TooManyPieces(usize),
}

/// Immutable lookup tables for one model.
#[derive(Debug, Clone)]
pub struct VocabTable {
    entries: Vec<Piece>,
    pieces: FxHashMap<String, u32>,
    reserved: FxHashMap<String, u32>,
    /// Indexed by byte value; empty unless byte fallback is enabled.
    byte_to_token: Vec<Token>,
    id_to_byte: FxHashMap<u32, u8>,
    unknown_id: u32,
    spec: TrainerSpec,
}

impl VocabTable {
    /// Validate `entries` against `spec` and build the lookup tables.
    pub fn build(entries: Vec<Piece>, spec: TrainerSpec) -> Result<Self, VocabError> {
        if spec.model_type != ModelType::Bpe {
            return Err(VocabError::UnsupportedModelType(spec.model_type));
        }
        if spec.add_dummy_prefix || spec.remove_extra_whitespaces {
            return Err(VocabError::UnsupportedNormalizerOptions {
                add_dummy_prefix: spec.add_dummy_prefix,
                remove_extra_whitespaces: spec.remove_extra_whitespaces,
            });
        }
        if u32::try_from(entries.len()).is_err() {
            return Err(VocabError::TooManyPieces(entries.len()));
        }

        let mut pieces = FxHashMap::default();
        let mut reserved = FxHashMap::default();
        let mut byte_slots: Vec<Option<Token>> = vec![None; 256];
        let mut id_to_byte = FxHashMap::default();
        let mut unknown_id: Option<u32> = None;

        for (id, piece) in (0u32..).zip(entries.iter()) {
            if piece.kind.is_mergeable() {
                pieces.insert(piece.text.clone(), id);
            } else {
                reserved.insert(piece.text.clone(), id);
            }

            match piece.kind {
                PieceType::Unknown => {
                    if let Some(first) = unknown_id {
                        return Err(VocabError::DuplicateUnknown { first, second: id });
                    }
                    unknown_id = Some(id);
                }
                PieceType::Byte => {
                    if !spec.byte_fallback {
                        return Err(VocabError::BytePieceWithoutFallback {
                            id,
                            piece: piece.text.clone(),
                        });
                    }
                    let byte = convert_hex_value(&piece.text).ok_or_else(|| {
                        VocabError::MalformedBytePiece {
                            id,
                            piece: piece.text.clone(),
                        }
                    })?;
                    byte_slots[byte as usize] = Some(Token::new(id, piece.text.clone()));
                    id_to_byte.insert(id, byte);
                }
                _ => {}
            }
        }

        let unknown_id = unknown_id.ok_or(VocabError::MissingUnknown)?;

        // With byte fallback every one of the 256 byte values must be present.
        let byte_to_token = if spec.byte_fallback {
            (0u8..=255)
                .zip(byte_slots)
                .map(|(byte, slot)| slot.ok_or(VocabError::IncompleteByteCoverage { byte }))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            entries,
            pieces,
            reserved,
            byte_to_token,
            id_to_byte,
            unknown_id,
            spec,
        })
    }

    /// Number of pieces, i.e. one past the largest token id.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn unknown_id(&self) -> u32 {
        self.unknown_id
    }

    #[inline]
    pub fn byte_fallback(&self) -> bool {
        self.spec.byte_fallback
    }

    #[inline]
    pub fn spec(&self) -> &TrainerSpec {
        &self.spec
    }

    /// Piece at `id`, if the id is in range.
    #[inline]
    pub fn piece(&self, id: u32) -> Option<&Piece> {
        self.entries.get(id as usize)
    }

    /// Id of a mergeable piece spelled `text`.
    #[inline]
    pub fn mergeable_id(&self, text: &str) -> Option<u32> {
        self.pieces.get(text).copied()
    }

    /// Score of a mergeable piece spelled `text`.
    #[inline]
    pub fn merge_score(&self, text: &str) -> Option<f32> {
        self.mergeable_id(text)
            .and_then(|id| self.piece(id))
            .map(|piece| piece.score)
    }

    /// Id of the piece spelled `text`, reserved pieces first.
    #[inline]
    pub fn lookup(&self, text: &str) -> Option<u32> {
        self.reserved
            .get(text)
            .or_else(|| self.pieces.get(text))
            .copied()
    }

    /// Id for a final symbol, falling back to the unknown id.
    #[inline]
    pub fn symbol_to_id(&self, symbol: &str) -> u32 {
        self.lookup(symbol).unwrap_or(self.unknown_id)
    }

    /// The byte-fallback token for `byte`, if byte fallback is enabled.
    #[inline]
    pub fn byte_token(&self, byte: u8) -> Option<&Token> {
        self.byte_to_token.get(byte as usize)
    }

    /// The byte a BYTE piece id stands for.
    #[inline]
    pub fn id_to_byte(&self, id: u32) -> Option<u8> {
        self.id_to_byte.get(&id).copied()
    }

    #[inline]
    pub fn is_byte(&self, id: u32) -> bool {
        self.kind(id) == Some(PieceType::Byte)
    }

    #[inline]
    pub fn is_control(&self, id: u32) -> bool {
        self.kind(id) == Some(PieceType::Control)
    }

    #[inline]
    fn kind(&self, id: u32) -> Option<PieceType> {
        self.piece(id).map(|piece| piece.kind)
    }

    /// Texts of all USER_DEFINED pieces, in id order.
    pub fn user_defined(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|piece| piece.kind == PieceType::UserDefined)
            .map(|piece| piece.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::byte_piece::byte_piece_text;

    fn base_pieces() -> Vec<Piece> {
        vec![
            Piece::new("<unk>", 0.0, PieceType::Unknown),
            Piece::new("<s>", 0.0, PieceType::Control),
            Piece::new("</s>", 0.0, PieceType::Control),
            Piece::normal("a", -1.0),
            Piece::normal("b", -2.0),
            Piece::normal("ab", -0.5),
            Piece::new("<mask>", 0.0, PieceType::UserDefined),
        ]
    }

    fn with_bytes(mut pieces: Vec<Piece>) -> Vec<Piece> {
        for b in 0..=255u8 {
            pieces.push(Piece::new(byte_piece_text(b), 0.0, PieceType::Byte));
        }
        pieces
    }

    #[test]
    fn test_build_splits_maps() {
        let table = VocabTable::build(base_pieces(), TrainerSpec::default()).unwrap();
        assert_eq!(table.len(), 7);
        assert_eq!(table.unknown_id(), 0);
        assert_eq!(table.mergeable_id("ab"), Some(5));
        assert_eq!(table.mergeable_id("<mask>"), Some(6));
        assert_eq!(table.mergeable_id("<s>"), None);
        assert_eq!(table.lookup("<s>"), Some(1));
        assert_eq!(table.merge_score("ab"), Some(-0.5));
        assert_eq!(table.symbol_to_id("zzz"), 0);
        assert!(table.is_control(2));
        assert!(!table.is_control(3));
        assert!(table.byte_token(0x41).is_none());
        assert_eq!(table.user_defined().collect::<Vec<_>>(), vec!["<mask>"]);
    }

    #[test]
    fn test_byte_tables_are_inverse() {
        let table =
            VocabTable::build(with_bytes(base_pieces()), TrainerSpec::with_byte_fallback())
                .unwrap();
        for b in 0..=255u8 {
            let token = table.byte_token(b).unwrap();
            assert_eq!(token.text, byte_piece_text(b));
            assert_eq!(table.id_to_byte(token.id), Some(b));
            assert!(table.is_byte(token.id));
        }
    }

    #[test]
    fn test_missing_unknown() {
        let pieces = vec![Piece::normal("a", 0.0)];
        let err = VocabTable::build(pieces, TrainerSpec::default()).unwrap_err();
        assert_eq!(err, VocabError::MissingUnknown);

        let err = VocabTable::build(Vec::new(), TrainerSpec::default()).unwrap_err();
        assert_eq!(err, VocabError::MissingUnknown);
    }

    #[test]
    fn test_duplicate_unknown() {
        let mut pieces = base_pieces();
        pieces.push(Piece::new("<unk2>", 0.0, PieceType::Unknown));
        let err = VocabTable::build(pieces, TrainerSpec::default()).unwrap_err();
        assert_eq!(err, VocabError::DuplicateUnknown { first: 0, second: 7 });
    }

    #[test]
    fn test_malformed_byte_piece() {
        let mut pieces = with_bytes(base_pieces());
        pieces.push(Piece::new("<0xZZ>", 0.0, PieceType::Byte));
        let err = VocabTable::build(pieces, TrainerSpec::with_byte_fallback()).unwrap_err();
        assert!(matches!(err, VocabError::MalformedBytePiece { ref piece, .. } if piece == "<0xZZ>"));
    }

    #[test]
    fn test_incomplete_byte_coverage() {
        let pieces: Vec<Piece> = with_bytes(base_pieces())
            .into_iter()
            .filter(|p| p.text != "<0x7F>")
            .collect();
        let err = VocabTable::build(pieces, TrainerSpec::with_byte_fallback()).unwrap_err();
        assert_eq!(err, VocabError::IncompleteByteCoverage { byte: 0x7F });
        assert_eq!(err.to_string(), "Byte value 0x7F not found");
    }

    #[test]
    fn test_byte_piece_without_fallback() {
        let err =
            VocabTable::build(with_bytes(base_pieces()), TrainerSpec::default()).unwrap_err();
        assert!(matches!(err, VocabError::BytePieceWithoutFallback { id: 7, .. }));
    }

    #[test]
    fn test_unsupported_model_type() {
        let spec = TrainerSpec {
            model_type: ModelType::Unigram,
            ..TrainerSpec::default()
        };
        let err = VocabTable::build(base_pieces(), spec).unwrap_err();
        assert_eq!(err, VocabError::UnsupportedModelType(ModelType::Unigram));
        assert_eq!(err.to_string(), "Model type UNIGRAM not supported");
    }

    #[test]
    fn test_unsupported_normalizer_options() {
        for (add_dummy_prefix, remove_extra_whitespaces) in [(true, false), (false, true)] {
            let spec = TrainerSpec {
                add_dummy_prefix,
                remove_extra_whitespaces,
                ..TrainerSpec::default()
            };
            let err = VocabTable::build(base_pieces(), spec).unwrap_err();
            assert_eq!(
                err,
                VocabError::UnsupportedNormalizerOptions {
                    add_dummy_prefix,
                    remove_extra_whitespaces,
                }
            );
        }
    }
}
