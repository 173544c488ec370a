//! Recursive text splitter.
//!
//! Splits text by trying progressively smaller separators until every
//! fragment fits within `chunk_size`, then merges neighbours back together.

use tracing::debug;

use fusion_core::{FusionError, KeepSeparator, Language, Result, TextSplitter};

use crate::merge::ChunkSettings;
use crate::separator::Separator;

/// Default separators, coarse to fine.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Recursive splitter that works through a list of separators.
///
/// The first separator present in the text is used:
/// 1. Double newline (paragraph breaks)
/// 2. Single newline
/// 3. Word boundaries (space)
/// 4. Character (last resort)
///
/// Fragments that still exceed `chunk_size` are split again with the
/// separators after the one that produced them.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    settings: ChunkSettings,
    separators: Vec<Separator>,
}

impl RecursiveSplitter {
    /// Create a splitter with the default separators.
    pub fn new(settings: ChunkSettings) -> Self {
        Self {
            settings,
            separators: DEFAULT_SEPARATORS.iter().map(|s| Separator::literal(s)).collect(),
        }
    }

    /// Replace the separator list. Entries are regular expressions if `is_regex` is set.
    pub fn with_separators<S: AsRef<str>>(mut self, separators: &[S], is_regex: bool) -> Result<Self> {
        if separators.is_empty() {
            return Err(FusionError::config("separator list must not be empty"));
        }
        self.separators = separators
            .iter()
            .map(|s| Separator::new(s.as_ref(), is_regex))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Create a splitter using the separator preset for `language`.
    ///
    /// Separators are kept at the start of the following fragment unless
    /// the settings already ask for them at the end.
    pub fn from_language(settings: ChunkSettings, language: Language) -> Result<Self> {
        let settings = match settings.keep_separator() {
            KeepSeparator::Discard => settings.with_keep_separator(KeepSeparator::Start),
            _ => settings,
        };
        debug!("Using {} separators", language);
        Self::new(settings).with_separators(language.separators(), true)
    }

    pub fn settings(&self) -> &ChunkSettings {
        &self.settings
    }

    fn split_recursive(&self, text: &str, separators: &[Separator]) -> Vec<String> {
        // Pick the first separator present in the text
        let mut chosen = separators.last();
        let mut remaining: &[Separator] = &[];
        for (i, separator) in separators.iter().enumerate() {
            if separator.is_chars() {
                chosen = Some(separator);
                break;
            }
            if separator.is_match(text) {
                chosen = Some(separator);
                remaining = &separators[i + 1..];
                break;
            }
        }
        let Some(separator) = chosen else {
            return self.settings.merge_splits(&[text], "");
        };

        let keep = self.settings.keep_separator();
        let splits = separator.split(text, keep);
        let joiner = if keep.is_kept() { "" } else { separator.joiner(text) };

        let mut chunks = Vec::new();
        let mut good: Vec<&str> = Vec::new();
        for split in splits {
            if self.settings.measure(split) <= self.settings.chunk_size() {
                good.push(split);
                continue;
            }

            if !good.is_empty() {
                chunks.extend(self.settings.merge_splits(&good, joiner));
                good.clear();
            }

            if remaining.is_empty() {
                // No finer separator left, keep the fragment whole
                let split = if self.settings.strip_whitespace() { split.trim() } else { split };
                if !split.is_empty() {
                    chunks.push(split.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(split, remaining));
            }
        }

        if !good.is_empty() {
            chunks.extend(self.settings.merge_splits(&good, joiner));
        }

        chunks
    }
}

impl TextSplitter for RecursiveSplitter {
    fn split_text(&self, text: &str) -> Result<Vec<String>> {
        let chunks = self.split_recursive(text, &self.separators);
        debug!("Recursive split produced {} chunks", chunks.len());
        Ok(chunks)
    }

    fn chunk_overlap(&self) -> usize {
        self.settings.chunk_overlap()
    }

    fn add_start_index(&self) -> bool {
        self.settings.add_start_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(ChunkSettings::new(chunk_size, chunk_overlap).unwrap())
    }

    #[test]
    fn test_simple_split() {
        let text = "Hello world. This is a test.";
        let chunks = splitter(100, 0).split_text(text).unwrap();
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_paragraph_then_word_split() {
        let chunks = splitter(10, 0)
            .split_text("Hello world\n\nfoo bar baz qux")
            .unwrap();
        assert_eq!(chunks, vec!["Hello", "world", "foo bar", "baz qux"]);
    }

    #[test]
    fn test_character_fallback() {
        let chunks = splitter(4, 0).split_text("abcdefghij").unwrap();
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_oversized_fragment_without_finer_separator() {
        let splitter = splitter(5, 0).with_separators(&["\n"], false).unwrap();
        let chunks = splitter.split_text("aaaaaaaaaaaa\nb").unwrap();
        assert_eq!(chunks, vec!["aaaaaaaaaaaa", "b"]);
    }

    #[test]
    fn test_python_preset() {
        let settings = ChunkSettings::new(30, 0).unwrap();
        let splitter = RecursiveSplitter::from_language(settings, Language::Python).unwrap();
        assert_eq!(splitter.settings().keep_separator(), KeepSeparator::Start);

        let chunks = splitter
            .split_text("def a():\n    return 1\n\ndef b():\n    return 2")
            .unwrap();
        assert_eq!(
            chunks,
            vec!["def a():\n    return 1", "def b():\n    return 2"]
        );
    }

    #[test]
    fn test_language_preset_respects_end() {
        let settings = ChunkSettings::new(30, 0)
            .unwrap()
            .with_keep_separator(KeepSeparator::End);
        let splitter = RecursiveSplitter::from_language(settings, Language::Rust).unwrap();
        assert_eq!(splitter.settings().keep_separator(), KeepSeparator::End);
    }

    #[test]
    fn test_keep_separator_at_end() {
        let settings = ChunkSettings::new(12, 0)
            .unwrap()
            .with_keep_separator(KeepSeparator::End)
            .with_strip_whitespace(false);
        let splitter = RecursiveSplitter::new(settings);

        let chunks = splitter.split_text("one two\nthree four\nfive").unwrap();
        assert_eq!(chunks, vec!["one two\n", "three four\n", "five"]);

        // Oversized lines fall through to words, separators still trailing
        let chunks = splitter.split_text("alpha beta gamma\nz").unwrap();
        assert_eq!(chunks, vec!["alpha beta ", "gamma\n", "z"]);
    }

    #[test]
    fn test_empty_separator_list() {
        let empty: [&str; 0] = [];
        let err = splitter(10, 0).with_separators(&empty, false).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_empty_text() {
        assert!(splitter(10, 0).split_text("").unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_chunks_within_size(
            text in "[a-z\n ]{0,300}",
            chunk_size in 5usize..50,
        ) {
            let chunks = splitter(chunk_size, 0).split_text(&text).unwrap();
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= chunk_size);
                prop_assert!(!chunk.is_empty());
            }

            // Only whitespace is lost without overlap.
            let squash = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
            prop_assert_eq!(squash(&chunks.concat()), squash(&text));
        }

        #[test]
        fn prop_resplit_is_stable(
            text in "[a-z]{1,8}( [a-z]{1,8}){0,40}",
            chunk_size in 10usize..60,
        ) {
            let splitter = splitter(chunk_size, 0);
            for chunk in splitter.split_text(&text).unwrap() {
                prop_assert_eq!(splitter.split_text(&chunk).unwrap(), vec![chunk.clone()]);
            }
        }
    }
}
