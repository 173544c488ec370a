//! Token-window splitting.

use std::sync::Arc;

use tracing::debug;

use fusion_core::{validate_sizes, FusionError, Result, TextSplitter, Tokenizer};

/// Splits text into fixed windows of token ids.
///
/// Windows are `chunk_size` tokens long and start every
/// `chunk_size - chunk_overlap` tokens; each window is decoded back to text.
pub struct TokenSplitter {
    tokenizer: Arc<dyn Tokenizer>,
    chunk_size: usize,
    chunk_overlap: usize,
    add_start_index: bool,
}

impl std::fmt::Debug for TokenSplitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSplitter")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("add_start_index", &self.add_start_index)
            .finish_non_exhaustive()
    }
}

impl TokenSplitter {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_sizes(chunk_size, chunk_overlap)?;
        Ok(Self {
            tokenizer,
            chunk_size,
            chunk_overlap,
            add_start_index: false,
        })
    }

    pub fn with_start_index(mut self, add_start_index: bool) -> Self {
        self.add_start_index = add_start_index;
        self
    }

    /// Token id ranges `[start, end)` covering `len` tokens.
    fn windows(&self, len: usize) -> Vec<(usize, usize)> {
        let step = self.chunk_size - self.chunk_overlap;
        let mut windows = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + self.chunk_size).min(len);
            windows.push((start, end));
            if end == len {
                break;
            }
            start += step;
        }
        windows
    }
}

impl TextSplitter for TokenSplitter {
    fn split_text(&self, text: &str) -> Result<Vec<String>> {
        let ids = self.tokenizer.encode(text)?;
        let windows = self.windows(ids.len());
        debug!("Token split: {} tokens -> {} windows", ids.len(), windows.len());

        windows
            .into_iter()
            .map(|(start, end)| self.tokenizer.decode(&ids[start..end]))
            .collect()
    }

    fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn add_start_index(&self) -> bool {
        self.add_start_index
    }
}

/// One token per Unicode scalar value.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.chars().map(u32::from).collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        ids.iter()
            .map(|&id| {
                char::from_u32(id)
                    .ok_or_else(|| FusionError::tokenizer(format!("invalid character id {}", id)))
            })
            .collect()
    }
}

/// Tokenizer loaded from a Hugging Face `tokenizer.json`.
#[cfg(feature = "hf-tokenizer")]
pub struct HuggingFaceTokenizer {
    inner: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizer")]
impl HuggingFaceTokenizer {
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        tracing::info!("Loading tokenizer from {:?}", path);
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| FusionError::tokenizer(format!("Failed to load tokenizer: {}", e)))?;
        Ok(Self { inner })
    }
}

#[cfg(feature = "hf-tokenizer")]
impl Tokenizer for HuggingFaceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| FusionError::tokenizer(format!("Tokenization failed: {}", e)))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, false)
            .map_err(|e| FusionError::tokenizer(format!("Decoding failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_core::Document;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> TokenSplitter {
        TokenSplitter::new(Arc::new(CharTokenizer), chunk_size, chunk_overlap).unwrap()
    }

    #[test]
    fn test_windows_with_overlap() {
        let chunks = splitter(4, 1).split_text("abcdefghij").unwrap();
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_windows_reconstruct_text() {
        let text = "The quick brown fox jumps over the lazy dog";
        let overlap = 3;
        let chunks = splitter(10, overlap).split_text(text).unwrap();

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(overlap));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_text_shorter_than_window() {
        assert_eq!(splitter(10, 2).split_text("abc").unwrap(), vec!["abc"]);
        assert_eq!(splitter(3, 1).split_text("abc").unwrap(), vec!["abc"]);
        assert!(splitter(3, 1).split_text("").unwrap().is_empty());
    }

    #[test]
    fn test_start_index() {
        let docs = splitter(4, 1)
            .with_start_index(true)
            .split_documents(&[Document::new("abcdefghij")])
            .unwrap();
        let offsets: Vec<_> = docs.iter().map(|d| d.get("start_index").cloned()).collect();
        assert_eq!(
            offsets,
            vec![Some(0.into()), Some(3.into()), Some(6.into())]
        );
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(TokenSplitter::new(Arc::new(CharTokenizer), 4, 4).is_err());
        assert!(TokenSplitter::new(Arc::new(CharTokenizer), 0, 0).is_err());
    }

    #[test]
    fn test_char_tokenizer_rejects_surrogates() {
        let err = CharTokenizer.decode(&[0xD800]).unwrap_err();
        assert_eq!(err.error_code(), "TOKENIZER_ERROR");
        assert_eq!(CharTokenizer.encode("é").unwrap(), vec![0xE9]);
    }
}
