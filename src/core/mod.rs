//! Core tokenization engine for piecetok.
//!
//! This module contains a SentencePiece-compatible BPE processor with:
//! - Greedy score-ordered merging over an array-backed symbol list
//! - Lazy deletion of stale merge candidates from a comparator-driven heap
//! - Trie matching of user-defined pieces, which are never merged
//! - Byte fallback for symbols missing from the vocabulary
//! - UTF-8 safe streaming decoder for generated output
//!
//! # Architecture
//!
//! - [`Processor`]: encoding/decoding API, Rayon batch helpers
//! - [`VocabTable`]: validated, immutable piece lookup tables
//! - [`PrefixMatcher`]: longest-prefix trie over user-defined pieces
//! - [`PriorityQueue`]: generic max-heap with an external comparator
//! - [`StreamingDecoder`]: token-by-token decoding of byte-fallback output
//! - [`byte_piece`]: `<0xXY>` literals and lossy UTF-8 assembly
//!
//! Reading a serialized model is out of scope: callers pass the already
//! parsed pieces and a [`TrainerSpec`].

pub mod byte_piece;
mod model;
mod prefix_matcher;
mod priority_queue;
mod processor;
mod streaming;
mod vocab;

pub use byte_piece::{byte_piece_text, convert_hex_value, decode_utf8_lossy};
pub use model::{ModelType, Piece, PieceType, Token, TrainerSpec, DEFAULT_UNK_SURFACE};
pub use prefix_matcher::PrefixMatcher;
pub use priority_queue::PriorityQueue;
pub use processor::{Processor, ProcessorOptions, WHITESPACE_SEPARATOR};
pub use streaming::StreamingDecoder;
pub use vocab::{VocabError, VocabTable};
