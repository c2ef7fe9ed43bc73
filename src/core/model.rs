//! Vocabulary entries and construction-time configuration.
//!
//! These types describe an already-parsed SentencePiece model: the ordered
//! list of pieces (the index of a piece is its token id) and the handful of
//! trainer/normalizer flags the processor needs to know about. Reading the
//! serialized model file is left to the caller.

use std::fmt;

/// Default text emitted when decoding the unknown token (`" ⁇ "`).
pub const DEFAULT_UNK_SURFACE: &str = " \u{2047} ";

/// Kind of a vocabulary piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PieceType {
    /// Regular subword produced by training.
    #[default]
    Normal,
    /// The unknown piece (`<unk>`); exactly one per vocabulary.
    Unknown,
    /// Control symbols such as `<s>` and `</s>`; decode to nothing.
    Control,
    /// User-defined symbols; always matched whole and never merged.
    UserDefined,
    /// Pieces kept in the vocabulary but not produced by training.
    Unused,
    /// Byte-fallback pieces of the form `<0xXY>`.
    Byte,
}

impl PieceType {
    /// Parse the upper-case type name used by SentencePiece model dumps.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NORMAL" => Some(Self::Normal),
            "UNKNOWN" => Some(Self::Unknown),
            "CONTROL" => Some(Self::Control),
            "USER_DEFINED" => Some(Self::UserDefined),
            "UNUSED" => Some(Self::Unused),
            "BYTE" => Some(Self::Byte),
            _ => None,
        }
    }

    /// Whether pieces of this kind live in the mergeable piece map.
    ///
    /// Everything else is "reserved": it can be emitted, but is never the
    /// target of a merge.
    #[inline]
    pub fn is_mergeable(self) -> bool {
        matches!(self, Self::Normal | Self::UserDefined | Self::Unused)
    }
}

/// One vocabulary entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    pub text: String,
    pub score: f32,
    pub kind: PieceType,
}

impl Piece {
    pub fn new(text: impl Into<String>, score: f32, kind: PieceType) -> Self {
        Self {
            text: text.into(),
            score,
            kind,
        }
    }

    pub fn normal(text: impl Into<String>, score: f32) -> Self {
        Self::new(text, score, PieceType::Normal)
    }
}

/// Segmentation algorithm a model was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelType {
    Unigram,
    #[default]
    Bpe,
    Word,
    Char,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unigram => "UNIGRAM",
            Self::Bpe => "BPE",
            Self::Word => "WORD",
            Self::Char => "CHAR",
        };
        f.write_str(name)
    }
}

impl ModelType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "UNIGRAM" => Some(Self::Unigram),
            "BPE" => Some(Self::Bpe),
            "WORD" => Some(Self::Word),
            "CHAR" => Some(Self::Char),
            _ => None,
        }
    }
}

/// Trainer and normalizer flags that affect encoding and decoding.
///
/// Only BPE models without dummy-prefix insertion or whitespace collapsing
/// are supported; [`Processor::new`](crate::Processor::new) rejects anything
/// else.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerSpec {
    pub model_type: ModelType,
    /// Decompose unknown symbols into `<0xXY>` byte pieces.
    pub byte_fallback: bool,
    pub add_dummy_prefix: bool,
    pub remove_extra_whitespaces: bool,
    /// Text emitted when decoding the unknown token.
    pub unk_surface: String,
}

impl Default for TrainerSpec {
    fn default() -> Self {
        Self {
            model_type: ModelType::Bpe,
            byte_fallback: false,
            add_dummy_prefix: false,
            remove_extra_whitespaces: false,
            unk_surface: DEFAULT_UNK_SURFACE.to_string(),
        }
    }
}

impl TrainerSpec {
    /// Default BPE spec with byte fallback enabled.
    pub fn with_byte_fallback() -> Self {
        Self {
            byte_fallback: true,
            ..Self::default()
        }
    }
}

/// A unit of tokenizer output: the piece id and the text it covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub id: u32,
    pub text: String,
}

impl Token {
    pub fn new(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}
