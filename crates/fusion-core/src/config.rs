//! Configuration types for the splitting system.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{FusionError, Result};
use crate::types::{KeepSeparator, Language};

/// Heading pattern for numbered sections such as "1.2.3 Summary".
pub const DEFAULT_HEADING_PATTERN: &str = r#"^(\d+(\.\d+)*)[^,.。|;:'"?!]*$"#;

/// Paragraph styles tracked by the styled-heading extractor, shallowest first.
pub const DEFAULT_HEADING_STYLES: [&str; 4] = ["Heading 1", "Heading 2", "Heading 3", "Heading 4"];

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Size-based splitter.
    #[serde(default)]
    pub splitter: SplitterConfig,

    /// Structure-preserving stage run before size-based splitting.
    #[serde(default)]
    pub structure: StructureConfig,

    /// Styled-heading extraction for word-processor paragraphs.
    #[serde(default)]
    pub styled: StyledHeadingConfig,

    /// Parent/child correlation.
    #[serde(default)]
    pub parent_child: Option<ParentChildConfig>,
}

/// Named size-based splitter variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitterKind {
    Character,
    #[default]
    Recursive,
    Token,
    Sentence,
}

impl SplitterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Recursive => "recursive",
            Self::Token => "token",
            Self::Sentence => "sentence",
        }
    }
}

impl FromStr for SplitterKind {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "character" => Ok(Self::Character),
            "recursive" => Ok(Self::Recursive),
            "token" => Ok(Self::Token),
            "sentence" => Ok(Self::Sentence),
            other => Err(FusionError::config(format!(
                "unknown splitter '{}', expected one of character, recursive, token, sentence",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SplitterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tokenizer backend for the token splitter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum TokenizerConfig {
    /// One token per Unicode scalar value.
    #[default]
    Characters,
    /// A `tokenizer.json` file (requires the `hf-tokenizer` feature).
    HuggingFace { path: PathBuf },
}

/// Size-based splitter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Which splitter to build.
    #[serde(default)]
    pub kind: SplitterKind,

    /// Maximum chunk size, measured by the splitter's length function.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Separators, coarse to fine. The splitter's default when absent.
    #[serde(default)]
    pub separators: Option<Vec<String>>,

    /// Interpret separators as regular expressions.
    #[serde(default)]
    pub separator_regex: bool,

    /// Where separators end up after splitting.
    #[serde(default)]
    pub keep_separator: KeepSeparator,

    /// Record each chunk's character offset as `start_index`.
    #[serde(default)]
    pub add_start_index: bool,

    /// Trim whitespace around merged chunks.
    #[serde(default = "default_true")]
    pub strip_whitespace: bool,

    /// Language-specific separators for the recursive splitter.
    #[serde(default)]
    pub language: Option<Language>,

    /// Tokenizer for the token splitter.
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            kind: SplitterKind::default(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separators: None,
            separator_regex: false,
            keep_separator: KeepSeparator::default(),
            add_start_index: false,
            strip_whitespace: true,
            language: None,
            tokenizer: TokenizerConfig::default(),
        }
    }
}

impl SplitterConfig {
    /// Shorthand for a splitter of `kind` with the given size and overlap.
    pub fn new(kind: SplitterKind, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            kind,
            chunk_size,
            chunk_overlap,
            ..Self::default()
        }
    }

    /// Check the size/overlap relationship.
    pub fn validate(&self) -> Result<()> {
        validate_sizes(self.chunk_size, self.chunk_overlap)
    }
}

/// Fail unless `0 < chunk_overlap + 1 <= chunk_size`.
pub fn validate_sizes(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(FusionError::config("chunk_size must be greater than zero"));
    }
    if chunk_overlap >= chunk_size {
        return Err(FusionError::config(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            chunk_overlap, chunk_size
        )));
    }
    Ok(())
}

/// A markdown header marker and the metadata key it populates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSpec {
    /// Marker, e.g. "##".
    pub marker: String,

    /// Metadata key, e.g. "Header 2".
    pub name: String,
}

impl HeaderSpec {
    pub fn new(marker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            name: name.into(),
        }
    }
}

/// Markdown header splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Headers to track.
    #[serde(default = "default_headers")]
    pub headers: Vec<HeaderSpec>,

    /// Emit one document per line record instead of aggregating.
    #[serde(default)]
    pub return_each_line: bool,

    /// Drop header lines from chunk content.
    #[serde(default = "default_true")]
    pub strip_headers: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            headers: default_headers(),
            return_each_line: false,
            strip_headers: true,
        }
    }
}

/// Numbered-heading extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberedHeadingConfig {
    /// Regular expression identifying heading lines.
    #[serde(default = "default_heading_pattern")]
    pub pattern: String,

    /// Drop heading lines instead of emitting them as documents.
    #[serde(default = "default_true")]
    pub strip_headers: bool,
}

impl Default for NumberedHeadingConfig {
    fn default() -> Self {
        Self {
            pattern: default_heading_pattern(),
            strip_headers: true,
        }
    }
}

/// Styled-heading extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyledHeadingConfig {
    /// Heading styles, shallowest first.
    #[serde(default = "default_heading_styles")]
    pub levels: Vec<String>,

    /// Drop heading paragraphs instead of emitting them as documents.
    #[serde(default = "default_true")]
    pub strip_headers: bool,
}

impl Default for StyledHeadingConfig {
    fn default() -> Self {
        Self {
            levels: default_heading_styles(),
            strip_headers: true,
        }
    }
}

/// Structure-preserving stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StructureConfig {
    #[default]
    None,
    Markdown(MarkdownConfig),
    Numbered(NumberedHeadingConfig),
}

/// Parent/child correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentChildConfig {
    /// Coarse splitter. When absent, input documents are the parents.
    #[serde(default)]
    pub parent: Option<SplitterConfig>,

    /// Fine splitter.
    pub child: SplitterConfig,
}

impl ParentChildConfig {
    pub fn validate(&self) -> Result<()> {
        self.child.validate()?;
        if let Some(parent) = &self.parent {
            parent.validate()?;
            if self.child.chunk_size > parent.chunk_size {
                return Err(FusionError::config(format!(
                    "child chunk_size ({}) exceeds parent chunk_size ({})",
                    self.child.chunk_size, parent.chunk_size
                )));
            }
        }
        Ok(())
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_headers() -> Vec<HeaderSpec> {
    vec![
        HeaderSpec::new("#", "Header 1"),
        HeaderSpec::new("##", "Header 2"),
        HeaderSpec::new("###", "Header 3"),
    ]
}

fn default_heading_pattern() -> String {
    DEFAULT_HEADING_PATTERN.to_string()
}

fn default_heading_styles() -> Vec<String> {
    DEFAULT_HEADING_STYLES.iter().map(|s| s.to_string()).collect()
}

impl FusionConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| FusionError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("fusion").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("fusion.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.splitter.validate()?;
        if let StructureConfig::Markdown(markdown) = &self.structure {
            if markdown.headers.iter().any(|h| h.marker.is_empty()) {
                return Err(FusionError::config("markdown header markers must not be empty"));
            }
        }
        if let Some(parent_child) = &self.parent_child {
            parent_child.validate()?;
        }
        Ok(())
    }
}
