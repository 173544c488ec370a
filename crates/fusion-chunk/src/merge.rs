//! Chunk-merge engine shared by every size-based splitter.
//!
//! Fragments are buffered greedily. When the next fragment would push the
//! buffer past `chunk_size`, the buffer is emitted and then trimmed from the
//! front until what remains fits inside `chunk_overlap`; that remainder seeds
//! the next chunk.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::warn;

use fusion_core::{validate_sizes, KeepSeparator, Result, SplitterConfig};

/// Measures text in the units `chunk_size` is expressed in.
pub type LengthFn = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Validated size/overlap settings plus merge behaviour.
#[derive(Clone)]
pub struct ChunkSettings {
    chunk_size: usize,
    chunk_overlap: usize,
    length: LengthFn,
    keep_separator: KeepSeparator,
    strip_whitespace: bool,
    add_start_index: bool,
}

impl std::fmt::Debug for ChunkSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkSettings")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("keep_separator", &self.keep_separator)
            .field("strip_whitespace", &self.strip_whitespace)
            .field("add_start_index", &self.add_start_index)
            .finish_non_exhaustive()
    }
}

impl ChunkSettings {
    /// Create settings measuring length in characters.
    ///
    /// Fails when `chunk_size` is zero or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_sizes(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
            length: Arc::new(|s: &str| s.chars().count()),
            keep_separator: KeepSeparator::Discard,
            strip_whitespace: true,
            add_start_index: false,
        })
    }

    /// Build settings from a splitter configuration section.
    pub fn from_config(config: &SplitterConfig) -> Result<Self> {
        Ok(Self::new(config.chunk_size, config.chunk_overlap)?
            .with_keep_separator(config.keep_separator)
            .with_strip_whitespace(config.strip_whitespace)
            .with_start_index(config.add_start_index))
    }

    /// Use a custom length function (e.g. a token counter).
    pub fn with_length_function<F>(mut self, length: F) -> Self
    where
        F: Fn(&str) -> usize + Send + Sync + 'static,
    {
        self.length = Arc::new(length);
        self
    }

    pub fn with_keep_separator(mut self, keep_separator: KeepSeparator) -> Self {
        self.keep_separator = keep_separator;
        self
    }

    pub fn with_strip_whitespace(mut self, strip_whitespace: bool) -> Self {
        self.strip_whitespace = strip_whitespace;
        self
    }

    pub fn with_start_index(mut self, add_start_index: bool) -> Self {
        self.add_start_index = add_start_index;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn keep_separator(&self) -> KeepSeparator {
        self.keep_separator
    }

    pub fn strip_whitespace(&self) -> bool {
        self.strip_whitespace
    }

    pub fn add_start_index(&self) -> bool {
        self.add_start_index
    }

    /// Measure text with the configured length function.
    pub fn measure(&self, text: &str) -> usize {
        (self.length)(text)
    }

    /// Join fragments into a chunk. `None` if the result is empty.
    fn join(&self, fragments: &VecDeque<&str>, separator: &str) -> Option<String> {
        let mut text = String::new();
        for (i, fragment) in fragments.iter().enumerate() {
            if i > 0 {
                text.push_str(separator);
            }
            text.push_str(fragment);
        }

        let text = if self.strip_whitespace {
            text.trim().to_string()
        } else {
            text
        };

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Merge ordered fragments into chunks of at most `chunk_size`.
    ///
    /// A single fragment longer than `chunk_size` is emitted whole. Empty
    /// fragments are skipped.
    pub fn merge_splits<S: AsRef<str>>(&self, splits: &[S], separator: &str) -> Vec<String> {
        let separator_len = self.measure(separator);
        let joined_len = |count: usize| if count > 0 { separator_len } else { 0 };

        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let split = split.as_ref();
            if split.is_empty() {
                continue;
            }
            let len = self.measure(split);

            if total + len + joined_len(current.len()) > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, self.chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(chunk) = self.join(&current, separator) {
                        chunks.push(chunk);
                    }

                    // Keep at most `chunk_overlap` of the tail, and make room for `split`.
                    while total > self.chunk_overlap
                        || (total + len + joined_len(current.len()) > self.chunk_size && total > 0)
                    {
                        let Some(first) = current.pop_front() else {
                            break;
                        };
                        let dropped = self.measure(first) + joined_len(current.len());
                        total = total.saturating_sub(dropped);
                    }
                }
            }

            total += len + joined_len(current.len());
            current.push_back(split);
        }

        if let Some(chunk) = self.join(&current, separator) {
            chunks.push(chunk);
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(text: &str) -> Vec<&str> {
        text.split(' ').collect()
    }

    #[test]
    fn test_invalid_settings() {
        assert!(ChunkSettings::new(0, 0).is_err());
        assert!(ChunkSettings::new(10, 10).is_err());
        assert!(ChunkSettings::new(10, 11).is_err());
        assert!(ChunkSettings::new(10, 9).is_ok());
    }

    #[test]
    fn test_merge_without_overlap() {
        let settings = ChunkSettings::new(10, 0).unwrap();
        let chunks = settings.merge_splits(&words("Hello world this is a test"), " ");
        assert_eq!(chunks, vec!["Hello", "world this", "is a test"]);
    }

    #[test]
    fn test_merge_with_overlap() {
        let settings = ChunkSettings::new(15, 5).unwrap();
        let chunks = settings.merge_splits(&words("Hello world this is a test message"), " ");
        assert_eq!(
            chunks,
            vec!["Hello world", "world this is a", "is a test", "test message"]
        );
    }

    #[test]
    fn test_oversized_fragment_is_kept_whole() {
        let settings = ChunkSettings::new(5, 0).unwrap();
        let chunks = settings.merge_splits(&["ab", "abcdefghij", "cd"], " ");
        assert_eq!(chunks, vec!["ab", "abcdefghij", "cd"]);
    }

    #[test]
    fn test_empty_fragments_skipped() {
        let settings = ChunkSettings::new(20, 0).unwrap();
        let chunks = settings.merge_splits(&["a", "", "b", ""], "-");
        assert_eq!(chunks, vec!["a-b"]);
    }

    #[test]
    fn test_whitespace_only_chunk_dropped() {
        let settings = ChunkSettings::new(3, 0).unwrap();
        let chunks = settings.merge_splits(&["   ", "ab"], "");
        assert_eq!(chunks, vec!["ab"]);

        let settings = settings.with_strip_whitespace(false);
        let chunks = settings.merge_splits(&["   ", "ab"], "");
        assert_eq!(chunks, vec!["   ", "ab"]);
    }

    #[test]
    fn test_custom_length_function() {
        // One unit per word
        let settings = ChunkSettings::new(2, 0)
            .unwrap()
            .with_length_function(|s| s.split_whitespace().count());
        let chunks = settings.merge_splits(&["one two", "three", "four"], " ");
        assert_eq!(chunks, vec!["one two", "three four"]);
    }

    #[test]
    fn test_from_config() {
        let mut config = SplitterConfig::default();
        config.add_start_index = true;
        config.keep_separator = KeepSeparator::End;
        let settings = ChunkSettings::from_config(&config).unwrap();
        assert_eq!(settings.chunk_size(), 1000);
        assert!(settings.add_start_index());
        assert_eq!(settings.keep_separator(), KeepSeparator::End);

        config.chunk_overlap = 1000;
        assert!(ChunkSettings::from_config(&config).is_err());
    }

    proptest! {
        #[test]
        fn prop_chunks_within_size(
            words in prop::collection::vec("[a-z]{1,8}", 1..60),
            chunk_size in 8usize..60,
            overlap_pct in 0usize..90,
        ) {
            let overlap = chunk_size * overlap_pct / 100;
            let settings = ChunkSettings::new(chunk_size, overlap).unwrap();
            let chunks = settings.merge_splits(&words, " ");

            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= chunk_size, "{:?} > {}", chunk, chunk_size);
            }

            // Every word survives, in order.
            let mut pos = 0;
            let flattened: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
            for word in &words {
                let found = flattened[pos..].iter().position(|w| *w == word.as_str());
                prop_assert!(found.is_some(), "missing {}", word);
                pos += found.unwrap_or(0);
            }
        }

        #[test]
        fn prop_overlap_bounded(
            lens in prop::collection::vec(1usize..5, 1..60),
            overlap in 0usize..10,
        ) {
            // Unique words (at most 6 chars) so shared words are real overlap.
            let words: Vec<String> = lens
                .iter()
                .enumerate()
                .map(|(i, len)| format!("{}{}", "a".repeat(*len), i))
                .collect();
            let settings = ChunkSettings::new(20, overlap).unwrap();
            let chunks = settings.merge_splits(&words, " ");

            for pair in chunks.windows(2) {
                let prev: Vec<&str> = pair[0].split(' ').collect();
                let next: Vec<&str> = pair[1].split(' ').collect();
                // Longest word-aligned suffix of `prev` that prefixes `next`.
                let shared = (1..=prev.len().min(next.len()))
                    .rev()
                    .find(|&n| prev[prev.len() - n..] == next[..n])
                    .map(|n| prev[prev.len() - n..].join(" ").chars().count())
                    .unwrap_or(0);
                prop_assert!(shared <= overlap, "shared {} > overlap {}", shared, overlap);
                if overlap >= 6 {
                    prop_assert!(shared > 0, "no overlap between {:?} and {:?}", pair[0], pair[1]);
                }
            }
        }
    }
}
