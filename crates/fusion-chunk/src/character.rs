//! Single-separator splitter.

use tracing::debug;

use fusion_core::{Result, TextSplitter};

use crate::merge::ChunkSettings;
use crate::separator::Separator;

/// Default separator: paragraph breaks.
const DEFAULT_SEPARATOR: &str = "\n\n";

/// Splits on one separator, then merges the pieces up to `chunk_size`.
#[derive(Debug, Clone)]
pub struct CharacterSplitter {
    settings: ChunkSettings,
    separator: Separator,
}

impl CharacterSplitter {
    /// Create a splitter that breaks on blank lines.
    pub fn new(settings: ChunkSettings) -> Self {
        Self {
            settings,
            separator: Separator::literal(DEFAULT_SEPARATOR),
        }
    }

    /// Use a different separator; a regular expression if `is_regex` is set.
    pub fn with_separator(mut self, separator: &str, is_regex: bool) -> Result<Self> {
        self.separator = Separator::new(separator, is_regex)?;
        Ok(self)
    }

    pub fn settings(&self) -> &ChunkSettings {
        &self.settings
    }
}

impl TextSplitter for CharacterSplitter {
    fn split_text(&self, text: &str) -> Result<Vec<String>> {
        let keep = self.settings.keep_separator();
        let splits = self.separator.split(text, keep);
        let joiner = if keep.is_kept() {
            ""
        } else {
            self.separator.joiner(text)
        };

        let chunks = self.settings.merge_splits(&splits, joiner);
        debug!(
            "Character split: {} fragments -> {} chunks",
            splits.len(),
            chunks.len()
        );
        Ok(chunks)
    }

    fn chunk_overlap(&self) -> usize {
        self.settings.chunk_overlap()
    }

    fn add_start_index(&self) -> bool {
        self.settings.add_start_index()
    }
}
