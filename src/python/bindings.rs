//! Python bindings for the piecetok processor.
//!
//! This module provides PyO3 wrappers around the core Rust processor,
//! exposing a Python-friendly API while keeping encoding in Rust.
//!
//! # Thread Safety
//!
//! The processor is immutable and can be shared across Python threads.
//! Batch operations use Rayon and release the GIL during Rust computation.
//!
//! # Example
//!
//! ```python
//! from piecetok import Processor
//!
//! pieces = [("<unk>", 0.0, "UNKNOWN"), ("▁hello", -1.0, "NORMAL"), ...]
//! processor = Processor(pieces, byte_fallback=True)
//!
//! ids = processor.encode_ids("hello world")
//! text = processor.decode(ids)
//!
//! decoder = processor.streaming_decoder()
//! for token_id in token_stream:
//!     if text := decoder.add_token(token_id):
//!         print(text, end="", flush=True)
//! print(decoder.flush())
//! ```

use std::sync::Arc;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::core::{
    ModelType, Piece, PieceType, Processor, ProcessorOptions, StreamingDecoder, TrainerSpec,
    DEFAULT_UNK_SURFACE,
};

/// Python wrapper for the Rust Processor.
#[pyclass(name = "Processor")]
pub struct PyProcessor {
    inner: Arc<Processor>,
}

#[pymethods]
impl PyProcessor {
    /// Create a processor from parsed model pieces.
    ///
    /// Args:
    ///     pieces: List of (text, score, type) tuples in id order; type is one
    ///         of NORMAL, UNKNOWN, CONTROL, USER_DEFINED, UNUSED, BYTE
    ///     model_type: Model type name (only "BPE" is supported)
    ///     byte_fallback: Whether unknown symbols decompose into byte pieces
    ///     unk_surface: Text emitted when decoding the unknown piece
    ///     debug_encode: Log the symbol list while encoding
    #[new]
    #[pyo3(signature = (
        pieces,
        model_type="BPE",
        byte_fallback=false,
        add_dummy_prefix=false,
        remove_extra_whitespaces=false,
        unk_surface=None,
        debug_encode=false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        pieces: Vec<(String, f32, String)>,
        model_type: &str,
        byte_fallback: bool,
        add_dummy_prefix: bool,
        remove_extra_whitespaces: bool,
        unk_surface: Option<String>,
        debug_encode: bool,
    ) -> PyResult<Self> {
        let pieces = parse_pieces(pieces)?;
        let model_type = ModelType::from_name(model_type)
            .ok_or_else(|| PyValueError::new_err(format!("Unknown model type: {model_type}")))?;

        let spec = TrainerSpec {
            model_type,
            byte_fallback,
            add_dummy_prefix,
            remove_extra_whitespaces,
            unk_surface: unk_surface.unwrap_or_else(|| DEFAULT_UNK_SURFACE.to_string()),
        };
        let options = ProcessorOptions { debug_encode };

        let inner = Processor::with_options(pieces, spec, options)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Encode text to a list of (id, piece) tuples.
    fn encode(&self, py: Python<'_>, text: &str) -> Vec<(u32, String)> {
        py.allow_threads(|| {
            self.inner
                .encode(text)
                .into_iter()
                .map(|token| (token.id, token.text))
                .collect()
        })
    }

    /// Encode text to a list of token IDs.
    fn encode_ids(&self, py: Python<'_>, text: &str) -> Vec<u32> {
        py.allow_threads(|| self.inner.encode_ids(text))
    }

    /// Number of tokens the text encodes to.
    fn count_tokens(&self, py: Python<'_>, text: &str) -> usize {
        py.allow_threads(|| self.inner.count_tokens(text))
    }

    /// Decode token IDs to a string.
    fn decode(&self, ids: Vec<u32>) -> String {
        self.inner.decode(&ids)
    }

    /// Batch encode multiple texts in parallel, returning token ID lists.
    fn encode_batch(&self, py: Python<'_>, texts: Vec<String>) -> Vec<Vec<u32>> {
        py.allow_threads(|| {
            self.inner
                .encode_batch(&texts)
                .into_iter()
                .map(|tokens| tokens.into_iter().map(|token| token.id).collect())
                .collect()
        })
    }

    /// Batch decode multiple token ID lists in parallel.
    fn decode_batch(&self, py: Python<'_>, id_lists: Vec<Vec<u32>>) -> Vec<String> {
        py.allow_threads(|| self.inner.decode_batch(&id_lists))
    }

    /// Text of the piece with the given ID, or None.
    fn id_to_piece(&self, id: u32) -> Option<String> {
        self.inner.id_to_piece(id).map(str::to_string)
    }

    /// ID of the piece spelled exactly `piece`, or None.
    fn piece_to_id(&self, piece: &str) -> Option<u32> {
        self.inner.piece_to_id(piece)
    }

    /// Number of pieces in the model.
    #[getter]
    fn vocab_size(&self) -> usize {
        self.inner.vocabulary_size()
    }

    /// ID of the unknown piece.
    #[getter]
    fn unknown_id(&self) -> u32 {
        self.inner.unknown_id()
    }

    /// Create a streaming decoder for UTF-8 safe token-by-token decoding.
    fn streaming_decoder(&self) -> PyStreamingDecoder {
        PyStreamingDecoder {
            processor: Arc::clone(&self.inner),
            pending: Vec::new(),
        }
    }

    /// String representation.
    fn __repr__(&self) -> String {
        format!("Processor(vocab_size={})", self.inner.vocabulary_size())
    }
}

/// Convert Python piece tuples into core pieces.
fn parse_pieces(pieces: Vec<(String, f32, String)>) -> PyResult<Vec<Piece>> {
    pieces
        .into_iter()
        .map(|(text, score, kind)| {
            let kind = PieceType::from_name(&kind)
                .ok_or_else(|| PyValueError::new_err(format!("Unknown piece type: {kind}")))?;
            Ok(Piece::new(text, score, kind))
        })
        .collect()
}

/// Python wrapper for the streaming decoder.
///
/// Holds a shared reference to the processor and the pending bytes between
/// calls, since a Python object cannot borrow from another.
#[pyclass(name = "StreamingDecoder")]
pub struct PyStreamingDecoder {
    processor: Arc<Processor>,
    pending: Vec<u8>,
}

impl PyStreamingDecoder {
    fn with_decoder<R>(&mut self, f: impl FnOnce(&mut StreamingDecoder<'_>) -> R) -> R {
        let mut decoder =
            StreamingDecoder::resume(&self.processor, std::mem::take(&mut self.pending));
        let result = f(&mut decoder);
        self.pending = decoder.into_pending();
        result
    }
}

#[pymethods]
impl PyStreamingDecoder {
    /// Add a token and return any complete text, or None if still buffering.
    fn add_token(&mut self, token_id: u32) -> Option<String> {
        self.with_decoder(|decoder| decoder.add_token(token_id))
    }

    /// Add multiple tokens at once and return any complete text.
    fn add_tokens(&mut self, token_ids: Vec<u32>) -> Option<String> {
        self.with_decoder(|decoder| decoder.add_tokens(&token_ids))
    }

    /// Flush buffered bytes, replacing unfinished characters with U+FFFD.
    fn flush(&mut self) -> String {
        self.with_decoder(|decoder| decoder.flush())
    }

    /// Discard any buffered bytes.
    fn reset(&mut self) {
        self.pending.clear();
    }

    /// Whether bytes are waiting for completion.
    #[getter]
    fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of buffered bytes.
    #[getter]
    fn pending_bytes(&self) -> usize {
        self.pending.len()
    }

    fn __repr__(&self) -> String {
        format!("StreamingDecoder(pending_bytes={})", self.pending.len())
    }
}
