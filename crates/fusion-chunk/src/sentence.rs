//! Sentence-boundary splitting.

use unicode_segmentation::UnicodeSegmentation;

use fusion_core::{Result, TextSplitter};

use crate::merge::ChunkSettings;

/// Splits on Unicode sentence boundaries (UAX #29) and merges sentences
/// up to `chunk_size`.
///
/// Sentence fragments keep their trailing whitespace, so they are joined
/// with no separator.
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    settings: ChunkSettings,
}

impl SentenceSplitter {
    pub fn new(settings: ChunkSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ChunkSettings {
        &self.settings
    }
}

impl TextSplitter for SentenceSplitter {
    fn split_text(&self, text: &str) -> Result<Vec<String>> {
        let sentences: Vec<&str> = text.split_sentence_bounds().collect();
        Ok(self.settings.merge_splits(&sentences, ""))
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

    #[test]
    fn test_sentences_are_grouped() {
        let splitter = SentenceSplitter::new(ChunkSettings::new(30, 0).unwrap());
        let chunks = splitter
            .split_text("First one. Second one. A much longer third sentence.")
            .unwrap();
        assert_eq!(
            chunks,
            vec!["First one. Second one.", "A much longer third sentence."]
        );
    }

    #[test]
    fn test_sentence_longer_than_chunk() {
        let splitter = SentenceSplitter::new(ChunkSettings::new(5, 0).unwrap());
        let chunks = splitter.split_text("Tiny. Enormous sentence here.").unwrap();
        assert_eq!(chunks, vec!["Tiny.", "Enormous sentence here."]);
    }

    #[test]
    fn test_overlap_repeats_whole_sentences() {
        let splitter = SentenceSplitter::new(ChunkSettings::new(12, 4).unwrap());
        let chunks = splitter.split_text("Aa. Bb. Cc. Dd.").unwrap();
        assert_eq!(chunks, vec!["Aa. Bb. Cc.", "Cc. Dd."]);
    }
}
