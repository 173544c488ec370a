//! Named splitter variants built from configuration.

use std::sync::Arc;

use tracing::debug;

use fusion_core::{
    FusionError, Result, SplitterConfig, SplitterKind, TextSplitter, Tokenizer, TokenizerConfig,
};

use crate::character::CharacterSplitter;
use crate::merge::ChunkSettings;
use crate::recursive::RecursiveSplitter;
use crate::sentence::SentenceSplitter;
use crate::token::{CharTokenizer, TokenSplitter};

/// Every size-based splitter, selected by [`SplitterKind`].
#[derive(Debug)]
pub enum Splitter {
    Character(CharacterSplitter),
    Recursive(RecursiveSplitter),
    Token(TokenSplitter),
    Sentence(SentenceSplitter),
}

impl Splitter {
    /// Build and validate the splitter a configuration section describes.
    pub fn from_config(config: &SplitterConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            "Building {} splitter (size={}, overlap={})",
            config.kind, config.chunk_size, config.chunk_overlap
        );

        let splitter = match config.kind {
            SplitterKind::Character => {
                let splitter = CharacterSplitter::new(ChunkSettings::from_config(config)?);
                match config.separators.as_deref() {
                    None => Self::Character(splitter),
                    Some([separator]) => {
                        Self::Character(splitter.with_separator(separator, config.separator_regex)?)
                    }
                    Some(other) => {
                        return Err(FusionError::config(format!(
                            "character splitter takes exactly one separator, got {}",
                            other.len()
                        )))
                    }
                }
            }
            SplitterKind::Recursive => {
                let settings = ChunkSettings::from_config(config)?;
                let splitter = match (&config.separators, config.language) {
                    (Some(separators), _) => RecursiveSplitter::new(settings)
                        .with_separators(separators, config.separator_regex)?,
                    (None, Some(language)) => RecursiveSplitter::from_language(settings, language)?,
                    (None, None) => RecursiveSplitter::new(settings),
                };
                Self::Recursive(splitter)
            }
            SplitterKind::Token => {
                let tokenizer = build_tokenizer(&config.tokenizer)?;
                Self::Token(
                    TokenSplitter::new(tokenizer, config.chunk_size, config.chunk_overlap)?
                        .with_start_index(config.add_start_index),
                )
            }
            SplitterKind::Sentence => {
                Self::Sentence(SentenceSplitter::new(ChunkSettings::from_config(config)?))
            }
        };

        Ok(splitter)
    }

    pub fn kind(&self) -> SplitterKind {
        match self {
            Self::Character(_) => SplitterKind::Character,
            Self::Recursive(_) => SplitterKind::Recursive,
            Self::Token(_) => SplitterKind::Token,
            Self::Sentence(_) => SplitterKind::Sentence,
        }
    }

    fn inner(&self) -> &dyn TextSplitter {
        match self {
            Self::Character(s) => s,
            Self::Recursive(s) => s,
            Self::Token(s) => s,
            Self::Sentence(s) => s,
        }
    }
}

impl TextSplitter for Splitter {
    fn split_text(&self, text: &str) -> Result<Vec<String>> {
        self.inner().split_text(text)
    }

    fn chunk_overlap(&self) -> usize {
        self.inner().chunk_overlap()
    }

    fn add_start_index(&self) -> bool {
        self.inner().add_start_index()
    }
}

fn build_tokenizer(config: &TokenizerConfig) -> Result<Arc<dyn Tokenizer>> {
    match config {
        TokenizerConfig::Characters => Ok(Arc::new(CharTokenizer)),
        #[cfg(feature = "hf-tokenizer")]
        TokenizerConfig::HuggingFace { path } => Ok(Arc::new(
            crate::token::HuggingFaceTokenizer::from_file(path)?,
        )),
        #[cfg(not(feature = "hf-tokenizer"))]
        TokenizerConfig::HuggingFace { path } => Err(FusionError::config(format!(
            "cannot load {}: built without the hf-tokenizer feature",
            path.display()
        ))),
    }
}
