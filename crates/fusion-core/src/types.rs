//! Core domain types shared by every splitter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{FusionError, Result};

/// Metadata attached to a document. Values are scalars or strings.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Well-known metadata keys written by the splitters.
pub mod keys {
    /// Identifies where a document was loaded from.
    pub const SOURCE: &str = "source";
    /// Character offset of a chunk inside the text it was split from.
    pub const START_INDEX: &str = "start_index";
    /// Identifier of a parent chunk.
    pub const PARENT_ID: &str = "parent_id";
    /// Identifier of a child chunk.
    pub const CHILD_ID: &str = "child_id";
    /// Heading text for numbered-heading sections.
    pub const HEADER: &str = "header";
}

/// A piece of text and the metadata describing it.
///
/// Splitters never mutate a document; they build new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Text content.
    content: String,

    /// Metadata (source, headers, identifiers, offsets).
    #[serde(default)]
    metadata: Metadata,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Create a document with the given metadata.
    pub fn with_metadata(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Text content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Metadata mapping.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Look up a single metadata value.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Look up a metadata value that is expected to be a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    /// Consume the document, returning its content and metadata.
    pub fn into_parts(self) -> (String, Metadata) {
        (self.content, self.metadata)
    }

    /// Return a copy of this document with one more metadata entry.
    ///
    /// Fails if `key` is already present.
    pub fn with_entry(mut self, key: &str, value: impl Into<serde_json::Value>) -> Result<Self> {
        insert_unique(&mut self.metadata, key, value)?;
        Ok(self)
    }
}

/// Insert a key that must not already exist.
pub fn insert_unique(
    metadata: &mut Metadata,
    key: &str,
    value: impl Into<serde_json::Value>,
) -> Result<()> {
    if metadata.contains_key(key) {
        return Err(FusionError::metadata_conflict(key));
    }
    metadata.insert(key.to_string(), value.into());
    Ok(())
}

/// Merge `extra` into `base`, failing on the first duplicate key.
pub fn merge_metadata(base: &mut Metadata, extra: &Metadata) -> Result<()> {
    for (key, value) in extra {
        insert_unique(base, key, value.clone())?;
    }
    Ok(())
}

/// How a separator is kept once text has been split on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepSeparator {
    /// Drop the separator; it is re-inserted when fragments are merged.
    #[default]
    Discard,
    /// Attach the separator to the start of the fragment that follows it.
    Start,
    /// Attach the separator to the end of the fragment that precedes it.
    End,
}

impl KeepSeparator {
    /// Whether the separator survives inside the fragments.
    pub fn is_kept(&self) -> bool {
        !matches!(self, Self::Discard)
    }
}

/// Source language, selects a separator list for recursive splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Markdown,
    Python,
    Rust,
    JavaScript,
    Go,
    Java,
    Cpp,
}

impl Language {
    /// Separator patterns (regular expressions) from coarse to fine.
    ///
    /// Every list ends with the empty pattern so splitting always
    /// bottoms out at single characters.
    pub fn separators(&self) -> &'static [&'static str] {
        match self {
            Self::Markdown => &[
                "\n#{1,6} ",
                "```\n",
                "\n\\*\\*\\*+\n",
                "\n---+\n",
                "\n___+\n",
                "\n\n",
                "\n",
                " ",
                "",
            ],
            Self::Python => &["\nclass ", "\ndef ", "\n\tdef ", "\n\n", "\n", " ", ""],
            Self::Rust => &[
                "\nfn ", "\nconst ", "\nlet ", "\nif ", "\nwhile ", "\nfor ", "\nloop ",
                "\nmatch ", "\n\n", "\n", " ", "",
            ],
            Self::JavaScript => &[
                "\nfunction ", "\nconst ", "\nlet ", "\nvar ", "\nclass ", "\nif ", "\nfor ",
                "\nwhile ", "\nswitch ", "\ncase ", "\ndefault ", "\n\n", "\n", " ", "",
            ],
            Self::Go => &[
                "\nfunc ", "\nvar ", "\nconst ", "\ntype ", "\nif ", "\nfor ", "\nswitch ",
                "\ncase ", "\n\n", "\n", " ", "",
            ],
            Self::Java => &[
                "\nclass ", "\npublic ", "\nprotected ", "\nprivate ", "\nstatic ", "\nif ",
                "\nfor ", "\nwhile ", "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
            ],
            Self::Cpp => &[
                "\nclass ", "\nvoid ", "\nint ", "\nfloat ", "\ndouble ", "\nif ", "\nfor ",
                "\nwhile ", "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
            ],
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Markdown => "Markdown",
            Self::Python => "Python",
            Self::Rust => "Rust",
            Self::JavaScript => "JavaScript",
            Self::Go => "Go",
            Self::Java => "Java",
            Self::Cpp => "C++",
        };
        write!(f, "{}", s)
    }
}

/// A paragraph from a word-processor document, tagged with its style name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledParagraph {
    /// Paragraph style, e.g. "Heading 2" or "Normal".
    pub style: String,

    /// Paragraph text.
    pub text: String,
}

impl StyledParagraph {
    pub fn new(style: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            text: text.into(),
        }
    }
}

/// One item fed to the numbered-heading extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionInput {
    Text(String),
    Document(Document),
}

impl SectionInput {
    /// Text contributed by this item.
    pub fn content(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Document(doc) => doc.content(),
        }
    }
}

impl From<&str> for SectionInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for SectionInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Document> for SectionInput {
    fn from(doc: Document) -> Self {
        Self::Document(doc)
    }
}

impl TryFrom<&serde_json::Value> for SectionInput {
    type Error = FusionError;

    /// Strings become text; objects with a string `content` become documents.
    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(text) => Ok(Self::Text(text.clone())),
            serde_json::Value::Object(map) if map.get("content").is_some_and(|c| c.is_string()) => {
                let doc: Document = serde_json::from_value(value.clone())?;
                Ok(Self::Document(doc))
            }
            other => Err(FusionError::invalid_input(format!(
                "expected text or a document, got {}",
                other
            ))),
        }
    }
}
