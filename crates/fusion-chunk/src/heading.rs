//! Heading extractors.
//!
//! Two ways of recovering a document outline:
//!
//! - [`StyledHeadingExtractor`] reads paragraphs tagged with word-processor
//!   styles ("Heading 1", "Heading 2", ...) and tags body text with the
//!   chain of headings above it.
//! - [`NumberedHeadingExtractor`] scans plain text for numbered heading lines
//!   ("1.2 Scope") and tags each section with the heading that opened it.

use regex::Regex;
use tracing::debug;

use fusion_core::{
    keys, merge_metadata, Document, FusionError, Metadata, NumberedHeadingConfig, ParagraphSource,
    Result, SectionInput, StyledHeadingConfig,
};

/// Most recent heading text per level.
///
/// Setting a level clears every deeper level.
#[derive(Debug, Clone)]
pub struct HeadingCounters {
    levels: Vec<String>,
    texts: Vec<Option<String>>,
}

impl HeadingCounters {
    /// Counters for the given style names, shallowest first.
    pub fn new(levels: Vec<String>) -> Self {
        let texts = vec![None; levels.len()];
        Self { levels, texts }
    }

    /// Depth of a style, if it is tracked.
    pub fn level_of(&self, style: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == style)
    }

    pub fn set(&mut self, level: usize, text: impl Into<String>) {
        if level >= self.texts.len() {
            return;
        }
        self.texts[level] = Some(text.into());
        for deeper in &mut self.texts[level + 1..] {
            *deeper = None;
        }
    }

    /// The current heading chain (style -> text), unset levels omitted.
    pub fn chain(&self) -> Metadata {
        self.levels
            .iter()
            .zip(&self.texts)
            .filter_map(|(level, text)| {
                text.as_ref()
                    .map(|t| (level.clone(), serde_json::Value::from(t.as_str())))
            })
            .collect()
    }
}

/// Extracts heading-tagged sections from styled paragraphs.
#[derive(Debug, Clone)]
pub struct StyledHeadingExtractor {
    levels: Vec<String>,
    strip_headers: bool,
}

impl StyledHeadingExtractor {
    pub fn new(levels: Vec<String>) -> Result<Self> {
        if levels.is_empty() {
            return Err(FusionError::config("at least one heading style is required"));
        }
        Ok(Self {
            levels,
            strip_headers: true,
        })
    }

    pub fn from_config(config: &StyledHeadingConfig) -> Result<Self> {
        Ok(Self::new(config.levels.clone())?.with_strip_headers(config.strip_headers))
    }

    /// Drop heading paragraphs instead of emitting them as documents.
    pub fn with_strip_headers(mut self, strip_headers: bool) -> Self {
        self.strip_headers = strip_headers;
        self
    }

    /// Extract sections from a paragraph source.
    ///
    /// Fails without output if the source cannot produce its paragraphs.
    pub fn extract<S: ParagraphSource + ?Sized>(&self, source: &S) -> Result<Vec<Document>> {
        let paragraphs = source.paragraphs().map_err(|e| match e {
            FusionError::StructuralParse { .. } => e,
            other => FusionError::structural_parse(source.source_name(), other.to_string()),
        })?;

        let mut counters = HeadingCounters::new(self.levels.clone());
        let mut documents = Vec::new();
        let mut buffer: Vec<String> = Vec::new();

        for paragraph in paragraphs {
            match counters.level_of(&paragraph.style) {
                Some(level) => {
                    flush_body(&mut documents, &mut buffer, counters.chain());
                    counters.set(level, paragraph.text.as_str());
                    if !self.strip_headers {
                        documents.push(Document::with_metadata(paragraph.text, counters.chain()));
                    }
                }
                None => buffer.push(paragraph.text),
            }
        }
        flush_body(&mut documents, &mut buffer, counters.chain());

        debug!(
            "Styled heading extraction from {} produced {} documents",
            source.source_name(),
            documents.len()
        );
        Ok(documents)
    }
}

fn flush_body(documents: &mut Vec<Document>, buffer: &mut Vec<String>, metadata: Metadata) {
    let content = buffer.join("\n");
    buffer.clear();
    if !content.trim().is_empty() {
        documents.push(Document::with_metadata(content, metadata));
    }
}

/// Extracts sections opened by numbered heading lines.
#[derive(Debug, Clone)]
pub struct NumberedHeadingExtractor {
    pattern: Regex,
    strip_headers: bool,
}

impl NumberedHeadingExtractor {
    /// Create an extractor with a custom heading pattern.
    ///
    /// The pattern must match at the start of a line.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            FusionError::config(format!("invalid heading pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            pattern,
            strip_headers: true,
        })
    }

    pub fn from_config(config: &NumberedHeadingConfig) -> Result<Self> {
        Ok(Self::new(&config.pattern)?.with_strip_headers(config.strip_headers))
    }

    /// Drop heading lines instead of emitting them as documents.
    pub fn with_strip_headers(mut self, strip_headers: bool) -> Self {
        self.strip_headers = strip_headers;
        self
    }

    fn is_heading(&self, line: &str) -> bool {
        self.pattern.find(line).is_some_and(|m| m.start() == 0)
    }

    /// Extract sections from text and documents, joined line by line.
    pub fn extract(&self, items: &[SectionInput]) -> Vec<Document> {
        let text = items
            .iter()
            .map(SectionInput::content)
            .collect::<Vec<_>>()
            .join("\n");
        self.extract_text(&text)
    }

    /// Extract from loosely typed items: strings or document objects.
    ///
    /// Any other value is rejected before extraction starts.
    pub fn extract_values(&self, values: &[serde_json::Value]) -> Result<Vec<Document>> {
        let items = values
            .iter()
            .map(SectionInput::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(self.extract(&items))
    }

    /// Extract per document, merging each document's metadata into its sections.
    pub fn split_documents(&self, documents: &[Document]) -> Result<Vec<Document>> {
        let mut output = Vec::new();
        for document in documents {
            for section in self.extract_text(document.content()) {
                let (content, extra) = section.into_parts();
                let mut metadata = document.metadata().clone();
                merge_metadata(&mut metadata, &extra)?;
                output.push(Document::with_metadata(content, metadata));
            }
        }
        Ok(output)
    }

    fn extract_text(&self, text: &str) -> Vec<Document> {
        let mut documents = Vec::new();
        let mut buffer: Vec<&str> = Vec::new();
        let mut previous: Option<&str> = None;

        for line in text.split('\n') {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if self.is_heading(trimmed) {
                if !buffer.is_empty() {
                    documents.push(section(buffer.join("\n"), previous));
                    buffer.clear();
                }
                if !self.strip_headers {
                    documents.push(section(trimmed.to_string(), Some(trimmed)));
                }
                previous = Some(trimmed);
            } else {
                buffer.push(line.trim_end());
            }
        }

        if !buffer.is_empty() {
            documents.push(section(buffer.join("\n"), previous));
        }

        debug!("Numbered heading extraction produced {} documents", documents.len());
        documents
    }
}

/// A section tagged with its heading; untagged before the first heading.
fn section(content: String, header: Option<&str>) -> Document {
    let mut metadata = Metadata::new();
    if let Some(header) = header {
        metadata.insert(keys::HEADER.to_string(), header.into());
    }
    Document::with_metadata(content, metadata)
}
