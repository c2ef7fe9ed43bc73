use rayon::prelude::*;
use std::borrow::Cow;
use std::cmp::Ordering;

use super::byte_piece::decode_utf8_lossy;
use super::model::{Piece, Token, TrainerSpec};
use super::prefix_matcher::PrefixMatcher;
use super::priority_queue::PriorityQueue;
use super::streaming::StreamingDecoder;
use super::vocab::{VocabError, VocabTable};

/// Word boundary marker SentencePiece substitutes for spaces (U+2581).
pub const WHITESPACE_SEPARATOR: char = '\u{2581}';

/// Sentinel for "no neighbour" in the symbol list.
const NONE: isize = -1;

/// Runtime options fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// Dump the symbol list and every merge through `log` while encoding.
    pub debug_encode: bool,
}

/// One live or dead element of the per-call symbol list.
///
/// Symbols always cover a contiguous byte range of the normalized text, so
/// they are stored as `start..start + len` instead of owned strings. A symbol
/// merged into its left neighbour keeps its slot with `len == 0`.
#[derive(Debug, Clone, Copy)]
struct Symbol {
    prev: isize,
    next: isize,
    no_merge: bool,
    start: usize,
    len: usize,
}

impl Symbol {
    #[inline]
    fn text<'t>(&self, text: &'t str) -> &'t str {
        &text[self.start..self.start + self.len]
    }
}

#[derive(Debug, Clone, Copy)]
struct MergeCandidate {
    left: usize,
    right: usize,
    /// Combined byte length when proposed; any change marks it stale.
    length: usize,
    score: f32,
}

/// Higher score first; on equal scores the leftmost pair wins.
fn merge_priority(a: &MergeCandidate, b: &MergeCandidate) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.left.cmp(&a.left))
}

type MergeOrder = fn(&MergeCandidate, &MergeCandidate) -> Ordering;
type MergeQueue = PriorityQueue<MergeCandidate, MergeOrder>;

/// SentencePiece BPE processor: converts text to tokens and back.
///
/// The processor is immutable after construction. Every `encode` call builds
/// its own symbol list and merge queue, so a single instance can be shared
/// across threads without locking.
#[derive(Debug, Clone)]
pub struct Processor {
    vocab: VocabTable,
    user_defined: PrefixMatcher,
    options: ProcessorOptions,
}

impl Processor {
    /// Create a processor from the ordered pieces of a model.
    ///
    /// The position of a piece in `pieces` is its token id.
    ///
    /// # Errors
    /// Returns a [`VocabError`] if the model is not a plain BPE model, lacks a
    /// unique unknown piece, or has an inconsistent set of byte pieces.
    pub fn new(pieces: Vec<Piece>, spec: TrainerSpec) -> Result<Self, VocabError> {
        Self::with_options(pieces, spec, ProcessorOptions::default())
    }

    /// Create a processor with explicit runtime options.
    pub fn with_options(
        pieces: Vec<Piece>,
        spec: TrainerSpec,
        options: ProcessorOptions,
    ) -> Result<Self, VocabError> {
        let vocab = VocabTable::build(pieces, spec)?;
        let user_defined = PrefixMatcher::new(vocab.user_defined());

        log::debug!(
            "built BPE processor: {} pieces, {} user-defined, byte_fallback={}",
            vocab.len(),
            user_defined.len(),
            vocab.byte_fallback()
        );

        Ok(Self {
            vocab,
            user_defined,
            options,
        })
    }

    /// Encode text into tokens.
    pub fn encode(&self, text: &str) -> Vec<Token> {
        let normalized = normalize(text);
        let text: &str = &normalized;

        let mut symbols = self.segment(text);
        if symbols.is_empty() {
            return Vec::new();
        }
        self.debug_symbols("initial", text, &symbols);

        let mut queue: MergeQueue =
            PriorityQueue::with_capacity(symbols.len(), merge_priority as MergeOrder);
        for i in 1..symbols.len() {
            self.suggest_new_merge_pair(text, &symbols, &mut queue, i as isize - 1, i as isize);
        }

        while !queue.is_empty() {
            let candidate = queue.pop_max();
            let left = symbols[candidate.left];
            let right = symbols[candidate.right];

            // Skip candidates whose endpoints changed since they were queued.
            if left.len == 0 || right.len == 0 || left.len + right.len != candidate.length {
                continue;
            }

            if self.options.debug_encode {
                log::trace!(
                    "merge [{}] {:?} + [{}] {:?} (score {})",
                    candidate.left,
                    left.text(text),
                    candidate.right,
                    right.text(text),
                    candidate.score
                );
            }

            symbols[candidate.left].len += right.len;
            symbols[candidate.left].next = right.next;
            if right.next != NONE {
                symbols[right.next as usize].prev = candidate.left as isize;
            }
            symbols[candidate.right].len = 0;

            let merged = candidate.left as isize;
            self.suggest_new_merge_pair(text, &symbols, &mut queue, left.prev, merged);
            self.suggest_new_merge_pair(text, &symbols, &mut queue, merged, right.next);
        }
        self.debug_symbols("merged", text, &symbols);

        self.emit_tokens(text, &symbols)
    }

    /// Encode text and return only the token ids.
    pub fn encode_ids(&self, text: &str) -> Vec<u32> {
        self.encode(text).into_iter().map(|token| token.id).collect()
    }

    /// Number of tokens `text` encodes to.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.encode(text).len()
    }

    /// Split normalized text into initial symbols: whole user-defined pieces,
    /// otherwise single characters.
    fn segment(&self, text: &str) -> Vec<Symbol> {
        let mut symbols = Vec::with_capacity(text.len());
        let mut start = 0;

        while start < text.len() {
            let (len, user_defined) = self.symbol_match(&text[start..]);
            let index = symbols.len() as isize;
            symbols.push(Symbol {
                prev: index - 1,
                next: index + 1,
                no_merge: user_defined,
                start,
                len,
            });
            start += len;
        }

        if let Some(last) = symbols.last_mut() {
            last.next = NONE;
        }
        symbols
    }

    /// Length of the first symbol in `text`, and whether it is user-defined.
    fn symbol_match(&self, text: &str) -> (usize, bool) {
        let prefix_len = self.user_defined.find_prefix_len(text);
        if prefix_len > 0 {
            return (prefix_len, true);
        }
        let char_len = text.chars().next().map_or(text.len(), char::len_utf8);
        (char_len, false)
    }

    /// Queue the pair `(left, right)` if both may merge and their
    /// concatenation is a vocabulary piece.
    fn suggest_new_merge_pair(
        &self,
        text: &str,
        symbols: &[Symbol],
        queue: &mut MergeQueue,
        left: isize,
        right: isize,
    ) {
        if left == NONE || right == NONE {
            return;
        }
        let (l, r) = (&symbols[left as usize], &symbols[right as usize]);
        if l.no_merge || r.no_merge {
            return;
        }

        // Live neighbours are adjacent in the text, so the merged symbol is a
        // single slice.
        let merged = &text[l.start..r.start + r.len];
        if let Some(score) = self.vocab.merge_score(merged) {
            queue.insert(MergeCandidate {
                left: left as usize,
                right: right as usize,
                length: merged.len(),
                score,
            });
        }
    }

    /// Walk the surviving symbols and resolve them to tokens.
    fn emit_tokens(&self, text: &str, symbols: &[Symbol]) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(symbols.len());
        let mut i = 0isize;

        while i != NONE {
            let symbol = &symbols[i as usize];
            let piece = symbol.text(text);
            let id = self.vocab.symbol_to_id(piece);

            if id == self.vocab.unknown_id() && self.vocab.byte_fallback() {
                tokens.extend(
                    piece
                        .bytes()
                        .filter_map(|b| self.vocab.byte_token(b))
                        .cloned(),
                );
            } else {
                tokens.push(Token::new(id, piece));
            }
            i = symbol.next;
        }

        tokens
    }

    fn debug_symbols(&self, stage: &str, text: &str, symbols: &[Symbol]) {
        if !self.options.debug_encode || !log::log_enabled!(log::Level::Debug) {
            return;
        }
        log::debug!("{stage} symbol list ({} entries)", symbols.len());
        for (i, s) in symbols.iter().enumerate() {
            log::debug!(
                "[{i:3}]: [prev: {:3}, next: {:3}, noMerge: {}] {:?}",
                s.prev,
                s.next,
                s.no_merge,
                s.text(text)
            );
        }
    }

    /// Decode token ids back into text.
    ///
    /// Runs of byte pieces are reassembled into UTF-8, with one U+FFFD per
    /// byte that does not form a valid character. Control pieces decode to
    /// nothing, the unknown piece to the model's `unk_surface`, and ids outside
    /// the vocabulary are skipped.
    pub fn decode(&self, ids: &[u32]) -> String {
        let mut out = String::with_capacity(ids.len() * 4);
        let mut bytes = Vec::new();
        let mut i = 0;

        while i < ids.len() {
            let run_end = i + ids[i..]
                .iter()
                .take_while(|&&id| self.vocab.is_byte(id))
                .count();

            if run_end > i {
                bytes.clear();
                bytes.extend(
                    ids[i..run_end]
                        .iter()
                        .filter_map(|&id| self.vocab.id_to_byte(id)),
                );
                decode_utf8_lossy(&bytes, &mut out);
            }

            let Some(&id) = ids.get(run_end) else {
                break;
            };
            self.decode_piece_into(id, &mut out);
            i = run_end + 1;
        }

        out
    }

    /// Decode tokens as returned by [`encode`](Self::encode); only the ids are
    /// used.
    pub fn decode_tokens(&self, tokens: &[Token]) -> String {
        let ids: Vec<u32> = tokens.iter().map(|token| token.id).collect();
        self.decode(&ids)
    }

    /// Append the text of a single non-byte piece.
    pub(crate) fn decode_piece_into(&self, id: u32, out: &mut String) {
        if self.vocab.is_control(id) {
            return;
        }
        if id == self.vocab.unknown_id() {
            out.push_str(&self.vocab.spec().unk_surface);
            return;
        }
        if let Some(piece) = self.vocab.piece(id) {
            out.push_str(&replace_separators_by_space(&piece.text));
        }
    }

    /// Batch encode multiple texts in parallel.
    pub fn encode_batch(&self, texts: &[String]) -> Vec<Vec<Token>> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Batch decode multiple id lists in parallel.
    pub fn decode_batch(&self, id_lists: &[Vec<u32>]) -> Vec<String> {
        id_lists.par_iter().map(|ids| self.decode(ids)).collect()
    }

    /// A streaming decoder for token-by-token output.
    pub fn streaming_decoder(&self) -> StreamingDecoder<'_> {
        StreamingDecoder::new(self)
    }

    /// Number of pieces in the model.
    pub fn vocabulary_size(&self) -> usize {
        self.vocab.len()
    }

    /// Text of the piece with the given id.
    pub fn id_to_piece(&self, id: u32) -> Option<&str> {
        self.vocab.piece(id).map(|piece| piece.text.as_str())
    }

    /// Id of the piece spelled exactly `piece`, without unknown fallback.
    pub fn piece_to_id(&self, piece: &str) -> Option<u32> {
        self.vocab.lookup(piece)
    }

    pub fn unknown_id(&self) -> u32 {
        self.vocab.unknown_id()
    }

    pub fn is_byte(&self, id: u32) -> bool {
        self.vocab.is_byte(id)
    }

    pub fn is_control(&self, id: u32) -> bool {
        self.vocab.is_control(id)
    }

    /// The byte a byte-piece id stands for.
    pub(crate) fn id_to_byte(&self, id: u32) -> Option<u8> {
        self.vocab.id_to_byte(id)
    }

    pub fn trainer_spec(&self) -> &TrainerSpec {
        self.vocab.spec()
    }

    pub fn options(&self) -> ProcessorOptions {
        self.options
    }
}

/// Replace every space with [`WHITESPACE_SEPARATOR`].
fn normalize(text: &str) -> Cow<'_, str> {
    if text.contains(' ') {
        Cow::Owned(text.replace(' ', "\u{2581}"))
    } else {
        Cow::Borrowed(text)
    }
}

fn replace_separators_by_space(piece: &str) -> Cow<'_, str> {
    if piece.contains(WHITESPACE_SEPARATOR) {
        Cow::Owned(piece.replace(WHITESPACE_SEPARATOR, " "))
    } else {
        Cow::Borrowed(piece)
    }
}
