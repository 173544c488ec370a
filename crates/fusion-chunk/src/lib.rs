//! fusion-chunk - Splitting strategies
//!
//! This crate turns text and documents into bounded-size, metadata-tagged
//! chunks for retrieval pipelines.
//!
//! # Splitters
//!
//! - [`CharacterSplitter`]: Splits on a single separator and merges the
//!   pieces up to the chunk size.
//!
//! - [`RecursiveSplitter`]: Recursively splits text using progressively smaller
//!   separators (paragraphs, lines, words, characters), with presets per
//!   [`Language`].
//!
//! - [`TokenSplitter`]: Fixed, overlapping windows over a token sequence.
//!
//! - [`SentenceSplitter`]: Groups Unicode sentences up to the chunk size.
//!
//! # Structure
//!
//! - [`MarkdownHeaderSplitter`]: Tags markdown sections with their header chain.
//! - [`StyledHeadingExtractor`] and [`NumberedHeadingExtractor`]: Recover
//!   outlines from styled paragraphs or numbered heading lines.
//! - [`ParentChildSplitter`]: Links fine child chunks to coarse parents.
//! - [`Pipeline`]: Runs the stages a [`FusionConfig`] describes.
//!
//! # Example
//!
//! ```rust
//! use fusion_chunk::{ChunkSettings, RecursiveSplitter, TextSplitter};
//!
//! let splitter = RecursiveSplitter::new(ChunkSettings::new(10, 0).unwrap());
//! let chunks = splitter.split_text("Hello world\n\nfoo bar baz qux").unwrap();
//! assert_eq!(chunks, vec!["Hello", "world", "foo bar", "baz qux"]);
//! ```

mod character;
mod heading;
mod markdown;
mod merge;
mod parent;
mod pipeline;
mod recursive;
mod registry;
mod sentence;
mod separator;
mod token;

pub use character::CharacterSplitter;
pub use heading::{HeadingCounters, NumberedHeadingExtractor, StyledHeadingExtractor};
pub use markdown::{HeaderFrame, HeaderStack, MarkdownHeaderSplitter};
pub use merge::{ChunkSettings, LengthFn};
pub use parent::{ParentChildOutput, ParentChildSplitter};
pub use pipeline::{Pipeline, PipelineOutput, StructuralStage};
pub use recursive::{RecursiveSplitter, DEFAULT_SEPARATORS};
pub use registry::Splitter;
pub use sentence::SentenceSplitter;
pub use separator::Separator;
pub use token::{CharTokenizer, TokenSplitter};

#[cfg(feature = "hf-tokenizer")]
pub use token::HuggingFaceTokenizer;

// Re-export types for convenience
pub use fusion_core::{
    Document, FusionConfig, KeepSeparator, Language, Metadata, Result, TextSplitter, Tokenizer,
};
