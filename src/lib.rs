pub mod core;
#[cfg(feature = "python")]
mod python;

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub use core::{
    byte_piece_text, convert_hex_value, ModelType, Piece, PieceType, PrefixMatcher,
    PriorityQueue, Processor, ProcessorOptions, StreamingDecoder, Token, TrainerSpec,
    VocabError, VocabTable, DEFAULT_UNK_SURFACE, WHITESPACE_SEPARATOR,
};

/// piecetok - SentencePiece-compatible BPE tokenizer with Python bindings
///
/// A tokenizer for pretrained SentencePiece BPE vocabularies featuring:
/// - Score-ordered BPE merges with lazy candidate invalidation
/// - Trie matching of user-defined pieces
/// - Byte fallback for out-of-vocabulary characters
/// - Rayon parallelism for batch encoding
/// - UTF-8 streaming decoder for LLM output
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyProcessor>()?;
    m.add_class::<python::PyStreamingDecoder>()?;
    m.add("WHITESPACE_SEPARATOR", WHITESPACE_SEPARATOR.to_string())?;
    Ok(())
}
