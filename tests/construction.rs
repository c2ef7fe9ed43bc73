//! Integration tests for building a processor from model pieces.
//!
//! These tests verify that malformed or unsupported models are rejected with
//! the right error, and that the accessors report the model as given.

mod common;

use common::{byte_id, BOS, TABLE, UNK};
use piecetok::{byte_piece_text, ModelType, Piece, PieceType, Processor, TrainerSpec, VocabError};

#[test]
fn test_fixture_accessors() {
    let processor = common::processor();

    assert_eq!(processor.vocabulary_size(), 7 + 256 + 11 + 9);
    assert_eq!(processor.unknown_id(), UNK);
    assert_eq!(processor.id_to_piece(TABLE), Some("<table>"));
    assert_eq!(processor.id_to_piece(byte_id(0x41)), Some("<0x41>"));
    assert_eq!(processor.id_to_piece(u32::MAX), None);
    assert_eq!(processor.piece_to_id("<s>"), Some(BOS));
    assert_eq!(processor.piece_to_id("▁world"), Some(282));
    assert_eq!(processor.piece_to_id("zzz"), None);

    assert!(processor.is_byte(byte_id(0)));
    assert!(!processor.is_byte(TABLE));
    assert!(processor.is_control(BOS));
    assert!(!processor.is_control(UNK));

    assert!(processor.trainer_spec().byte_fallback);
    assert_eq!(processor.trainer_spec().model_type, ModelType::Bpe);
    assert!(!processor.options().debug_encode);
}

#[test]
fn test_missing_unknown() {
    let pieces: Vec<Piece> = common::pieces(false)
        .into_iter()
        .filter(|piece| piece.kind != PieceType::Unknown)
        .collect();

    let err = Processor::new(pieces, TrainerSpec::default()).unwrap_err();
    assert_eq!(err, VocabError::MissingUnknown);
}

#[test]
fn test_duplicate_unknown() {
    let mut pieces = common::pieces(false);
    pieces.push(Piece::new("<unk2>", 0.0, PieceType::Unknown));
    let second = pieces.len() as u32 - 1;

    let err = Processor::new(pieces, TrainerSpec::default()).unwrap_err();
    assert_eq!(err, VocabError::DuplicateUnknown { first: 0, second });
}

#[test]
fn test_byte_pieces_require_fallback() {
    let err = Processor::new(common::pieces(true), TrainerSpec::default()).unwrap_err();
    assert_eq!(
        err,
        VocabError::BytePieceWithoutFallback {
            id: byte_id(0),
            piece: "<0x00>".to_string(),
        }
    );
}

#[test]
fn test_incomplete_byte_coverage() {
    let pieces: Vec<Piece> = common::pieces(true)
        .into_iter()
        .filter(|piece| piece.text != byte_piece_text(0x41))
        .collect();

    let err = Processor::new(pieces, TrainerSpec::with_byte_fallback()).unwrap_err();
    assert_eq!(err, VocabError::IncompleteByteCoverage { byte: 0x41 });
    assert_eq!(err.to_string(), "Byte value 0x41 not found");
}

#[test]
fn test_malformed_byte_piece() {
    let mut pieces = common::pieces(true);
    pieces.push(Piece::new("<0xZZ>", 0.0, PieceType::Byte));
    let id = pieces.len() as u32 - 1;

    let err = Processor::new(pieces, TrainerSpec::with_byte_fallback()).unwrap_err();
    assert_eq!(
        err,
        VocabError::MalformedBytePiece {
            id,
            piece: "<0xZZ>".to_string(),
        }
    );
}

#[test]
fn test_unsupported_model_type() {
    let spec = TrainerSpec {
        model_type: ModelType::Unigram,
        ..TrainerSpec::default()
    };
    let err = Processor::new(common::pieces(false), spec).unwrap_err();
    assert_eq!(err, VocabError::UnsupportedModelType(ModelType::Unigram));
    assert_eq!(err.to_string(), "Model type UNIGRAM not supported");
}

#[test]
fn test_unsupported_normalizer_options() {
    let spec = TrainerSpec {
        add_dummy_prefix: true,
        ..TrainerSpec::default()
    };
    let err = Processor::new(common::pieces(false), spec).unwrap_err();
    assert_eq!(
        err,
        VocabError::UnsupportedNormalizerOptions {
            add_dummy_prefix: true,
            remove_extra_whitespaces: false,
        }
    );
}

/// Test that a cloned processor behaves like the original.
#[test]
fn test_clone() {
    let processor = common::processor();
    let copy = processor.clone();
    assert_eq!(
        copy.encode_ids("hello world"),
        processor.encode_ids("hello world")
    );
}
