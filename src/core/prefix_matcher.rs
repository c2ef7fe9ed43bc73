//! Longest-prefix matching over a fixed set of words.
//!
//! User-defined pieces must be matched whole before any BPE merging happens.
//! [`PrefixMatcher`] stores them in a character trie and answers, for a given
//! string, the byte length of the longest registered word it starts with.

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: FxHashMap<char, TrieNode>,
    is_word_end: bool,
}

/// Character trie answering longest-prefix queries.
///
/// Built once and never mutated afterwards, so it can be shared freely
/// between threads.
#[derive(Debug, Clone, Default)]
pub struct PrefixMatcher {
    root: TrieNode,
    words: usize,
}

impl PrefixMatcher {
    /// Build a matcher from a set of words. Empty words are ignored.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matcher = Self::default();
        for word in words {
            matcher.insert(word.as_ref());
        }
        matcher
    }

    fn insert(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }
        let mut node = &mut self.root;
        for c in word.chars() {
            node = node.children.entry(c).or_default();
        }
        if !node.is_word_end {
            node.is_word_end = true;
            self.words += 1;
        }
    }

    /// Byte length of the longest registered word that is a prefix of `text`,
    /// or 0 if there is none.
    pub fn find_prefix_len(&self, text: &str) -> usize {
        let mut node = &self.root;
        let mut longest = 0;

        for (offset, c) in text.char_indices() {
            match node.children.get(&c) {
                Some(child) => node = child,
                None => break,
            }
            if node.is_word_end {
                longest = offset + c.len_utf8();
            }
        }

        longest
    }

    /// Number of distinct registered words.
    pub fn len(&self) -> usize {
        self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words == 0
    }
}
