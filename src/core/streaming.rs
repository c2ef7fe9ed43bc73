//! UTF-8 safe streaming decoder for token-by-token output.
//!
//! Byte-fallback tokens carry one raw byte each, so a multi-byte character
//! generated through byte fallback arrives spread over several tokens. The
//! [`StreamingDecoder`] buffers those bytes and only emits text once it is
//! decidable: a complete character, or a replacement character for a byte
//! that can no longer start a valid sequence.
//!
//! The concatenation of everything it returns, followed by a final
//! [`flush`](StreamingDecoder::flush), is exactly what
//! [`Processor::decode`] returns for the same ids.

use super::byte_piece::{decode_utf8_lossy, next_char, Utf8Step};
use super::processor::Processor;

/// A streaming decoder that handles byte pieces split across tokens.
///
/// # Example
///
/// ```ignore
/// let mut decoder = processor.streaming_decoder();
///
/// for token_id in token_stream {
///     if let Some(text) = decoder.add_token(token_id) {
///         print!("{}", text);
///     }
/// }
/// // Flush any remaining buffered bytes
/// print!("{}", decoder.flush());
/// ```
pub struct StreamingDecoder<'a> {
    processor: &'a Processor,
    buffer: Vec<u8>,
}

impl<'a> StreamingDecoder<'a> {
    /// Create a new streaming decoder for the given processor.
    pub fn new(processor: &'a Processor) -> Self {
        Self {
            processor,
            buffer: Vec::with_capacity(16),
        }
    }

    /// Continue decoding with bytes left pending by an earlier decoder.
    pub fn resume(processor: &'a Processor, pending: Vec<u8>) -> Self {
        Self {
            processor,
            buffer: pending,
        }
    }

    /// Consume the decoder, returning the bytes still waiting for completion.
    pub fn into_pending(self) -> Vec<u8> {
        self.buffer
    }

    /// Add a token and return any text that is now complete.
    ///
    /// Returns `None` if nothing can be emitted yet, either because the
    /// token's byte is still part of an incomplete character or because the
    /// token decodes to nothing (control pieces).
    pub fn add_token(&mut self, token_id: u32) -> Option<String> {
        let mut out = String::new();
        self.push_token(token_id, &mut out);
        non_empty(out)
    }

    /// Add multiple tokens at once and return the completed text.
    pub fn add_tokens(&mut self, token_ids: &[u32]) -> Option<String> {
        let mut out = String::new();
        for &token_id in token_ids {
            self.push_token(token_id, &mut out);
        }
        non_empty(out)
    }

    /// Flush any remaining buffered bytes.
    ///
    /// Bytes of an unfinished character are each replaced with U+FFFD.
    pub fn flush(&mut self) -> String {
        let mut out = String::new();
        self.flush_into(&mut out);
        out
    }

    /// Reset the decoder state, discarding any buffered bytes.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Check if there are buffered bytes waiting for completion.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Get the number of pending bytes in the buffer.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn push_token(&mut self, token_id: u32, out: &mut String) {
        if let Some(byte) = self.byte_of(token_id) {
            self.buffer.push(byte);
            self.drain_complete(out);
        } else {
            // Any other piece ends the current byte run.
            self.flush_into(out);
            self.processor.decode_piece_into(token_id, out);
        }
    }

    #[inline]
    fn byte_of(&self, token_id: u32) -> Option<u8> {
        if self.processor.is_byte(token_id) {
            self.processor.id_to_byte(token_id)
        } else {
            None
        }
    }

    fn flush_into(&mut self, out: &mut String) {
        if !self.buffer.is_empty() {
            decode_utf8_lossy(&self.buffer, out);
            self.buffer.clear();
        }
    }

    /// Emit every decidable character at the front of the buffer, keeping a
    /// trailing incomplete sequence.
    fn drain_complete(&mut self, out: &mut String) {
        let mut consumed = 0;
        loop {
            match next_char(&self.buffer[consumed..]) {
                Utf8Step::Char(c, len) => {
                    out.push(c);
                    consumed += len;
                }
                Utf8Step::Invalid => {
                    out.push(char::REPLACEMENT_CHARACTER);
                    consumed += 1;
                }
                Utf8Step::Incomplete => break,
            }
        }
        self.buffer.drain(..consumed);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
