//! Markdown header splitting.
//!
//! A line-by-line scan that tracks the active header chain and fenced code
//! blocks. Content is grouped into line records tagged with the chain in
//! effect, then records with identical chains are aggregated into documents.

use tracing::{debug, trace};

use fusion_core::{
    merge_metadata, Document, FusionError, HeaderSpec, MarkdownConfig, Metadata, Result,
};

/// One active header in the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFrame {
    /// Marker length, e.g. 2 for "##".
    pub level: usize,
    /// Metadata key.
    pub name: String,
    /// Header text.
    pub text: String,
}

/// Active headers, levels strictly increasing from bottom to top.
#[derive(Debug, Clone, Default)]
pub struct HeaderStack {
    frames: Vec<HeaderFrame>,
}

impl HeaderStack {
    /// Push a header, first popping every frame with `level >= frame.level`.
    pub fn push(&mut self, frame: HeaderFrame) {
        while self.frames.last().is_some_and(|top| top.level >= frame.level) {
            self.frames.pop();
        }
        trace!("Header stack push: level {} '{}'", frame.level, frame.text);
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[HeaderFrame] {
        &self.frames
    }

    /// The header chain as metadata (name -> text).
    pub fn metadata(&self) -> Metadata {
        self.frames
            .iter()
            .map(|f| (f.name.clone(), serde_json::Value::from(f.text.as_str())))
            .collect()
    }
}

/// Content gathered between flushes, with the header chain it belongs to.
#[derive(Debug, Clone, PartialEq)]
struct LineRecord {
    content: String,
    metadata: Metadata,
}

impl LineRecord {
    fn into_document(self) -> Document {
        Document::with_metadata(self.content, self.metadata)
    }
}

/// Code fence opened in the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fence {
    Backtick,
    Tilde,
}

impl Fence {
    fn marker(&self) -> &'static str {
        match self {
            Self::Backtick => "```",
            Self::Tilde => "~~~",
        }
    }

    /// A fence opened by `line`, ignoring inline spans like "```x```".
    fn opened_by(line: &str) -> Option<Self> {
        if line.starts_with("```") && line.matches("```").count() == 1 {
            Some(Self::Backtick)
        } else if line.starts_with("~~~") {
            Some(Self::Tilde)
        } else {
            None
        }
    }
}

/// Splits markdown on configured headers.
#[derive(Debug, Clone)]
pub struct MarkdownHeaderSplitter {
    /// Sorted by marker length, longest first.
    headers: Vec<HeaderSpec>,
    return_each_line: bool,
    strip_headers: bool,
}

impl MarkdownHeaderSplitter {
    pub fn new(mut headers: Vec<HeaderSpec>) -> Result<Self> {
        if headers.iter().any(|h| h.marker.is_empty()) {
            return Err(FusionError::config("markdown header markers must not be empty"));
        }
        headers.sort_by(|a, b| b.marker.len().cmp(&a.marker.len()));
        Ok(Self {
            headers,
            return_each_line: false,
            strip_headers: true,
        })
    }

    pub fn from_config(config: &MarkdownConfig) -> Result<Self> {
        Ok(Self::new(config.headers.clone())?
            .with_return_each_line(config.return_each_line)
            .with_strip_headers(config.strip_headers))
    }

    /// Return line records without aggregation.
    pub fn with_return_each_line(mut self, return_each_line: bool) -> Self {
        self.return_each_line = return_each_line;
        self
    }

    /// Drop header lines from chunk content.
    pub fn with_strip_headers(mut self, strip_headers: bool) -> Self {
        self.strip_headers = strip_headers;
        self
    }

    /// Header matching a trimmed line, if any.
    ///
    /// The marker must be followed by a space or end the line.
    fn match_header(&self, line: &str) -> Option<&HeaderSpec> {
        self.headers.iter().find(|h| {
            line.strip_prefix(h.marker.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
        })
    }

    /// Split markdown text into header-tagged documents.
    pub fn split_text(&self, text: &str) -> Vec<Document> {
        let records = self.scan(text);
        let records = if self.return_each_line {
            records
        } else {
            self.aggregate(records)
        };
        debug!("Markdown split produced {} documents", records.len());
        records.into_iter().map(LineRecord::into_document).collect()
    }

    /// Split each document, merging its metadata into every chunk.
    pub fn split_documents(&self, documents: &[Document]) -> Result<Vec<Document>> {
        let mut output = Vec::new();
        for document in documents {
            for chunk in self.split_text(document.content()) {
                let (content, headers) = chunk.into_parts();
                let mut metadata = document.metadata().clone();
                merge_metadata(&mut metadata, &headers)?;
                output.push(Document::with_metadata(content, metadata));
            }
        }
        Ok(output)
    }

    fn scan(&self, text: &str) -> Vec<LineRecord> {
        let mut records = Vec::new();
        let mut buffer: Vec<&str> = Vec::new();
        let mut stack = HeaderStack::default();
        let mut current = Metadata::new();
        let mut fence: Option<Fence> = None;

        for line in text.split('\n') {
            let stripped = line.trim();

            fence = match fence {
                None => Fence::opened_by(stripped),
                Some(open) if stripped.starts_with(open.marker()) => None,
                Some(open) => Some(open),
            };
            if fence.is_some() {
                buffer.push(line);
                continue;
            }

            if let Some(matched) = self.match_header(stripped) {
                stack.push(HeaderFrame {
                    level: matched.marker.chars().count(),
                    name: matched.name.clone(),
                    text: stripped[matched.marker.len()..].trim().to_string(),
                });
                // Buffered content belongs to the previous chain
                flush(&mut records, &mut buffer, &current);
                if !self.strip_headers {
                    buffer.push(stripped);
                }
            } else if !stripped.is_empty() {
                buffer.push(stripped);
            } else {
                flush(&mut records, &mut buffer, &current);
            }

            current = stack.metadata();
        }
        flush(&mut records, &mut buffer, &current);

        records
    }

    fn aggregate(&self, records: Vec<LineRecord>) -> Vec<LineRecord> {
        let mut aggregated: Vec<LineRecord> = Vec::new();

        for record in records {
            if let Some(last) = aggregated.last_mut() {
                if last.metadata == record.metadata {
                    last.content.push_str("  \n");
                    last.content.push_str(&record.content);
                    continue;
                }

                // A retained header followed by its deeper section
                if !self.strip_headers
                    && last.metadata.len() < record.metadata.len()
                    && self.ends_with_header(&last.content)
                {
                    last.content.push_str("  \n");
                    last.content.push_str(&record.content);
                    last.metadata = record.metadata;
                    continue;
                }
            }
            aggregated.push(record);
        }

        aggregated
    }

    fn ends_with_header(&self, content: &str) -> bool {
        content
            .rsplit('\n')
            .next()
            .is_some_and(|line| self.match_header(line.trim()).is_some())
    }
}

fn flush(records: &mut Vec<LineRecord>, buffer: &mut Vec<&str>, metadata: &Metadata) {
    if buffer.is_empty() {
        return;
    }
    records.push(LineRecord {
        content: buffer.join("\n"),
        metadata: metadata.clone(),
    });
    buffer.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn splitter() -> MarkdownHeaderSplitter {
        MarkdownHeaderSplitter::new(vec![HeaderSpec::new("#", "H1"), HeaderSpec::new("##", "H2")])
            .unwrap()
    }

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn test_header_stack_pops_same_or_shallower() {
        let mut stack = HeaderStack::default();
        for (level, text) in [(1, "A"), (2, "B"), (3, "C"), (2, "D")] {
            stack.push(HeaderFrame {
                level,
                name: format!("H{}", level),
                text: text.to_string(),
            });
        }
        let levels: Vec<usize> = stack.frames().iter().map(|f| f.level).collect();
        assert_eq!(levels, vec![1, 2]);
        assert_eq!(stack.metadata(), meta(&[("H1", "A"), ("H2", "D")]));
    }

    #[test]
    fn test_nested_headers() {
        let docs = splitter().split_text("# A\ntext1\n## B\ntext2\n# C\ntext3");
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].content(), "text1");
        assert_eq!(docs[0].metadata(), &meta(&[("H1", "A")]));
        assert_eq!(docs[1].content(), "text2");
        assert_eq!(docs[1].metadata(), &meta(&[("H1", "A"), ("H2", "B")]));
        assert_eq!(docs[2].content(), "text3");
        assert_eq!(docs[2].metadata(), &meta(&[("H1", "C")]));
    }

    #[test]
    fn test_fenced_code_is_not_a_header() {
        let docs = splitter().split_text("# Title\n```\n# not a header\n    indented\n```\nafter");
        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].content(),
            "```\n# not a header\n    indented\n```\nafter"
        );
        assert_eq!(docs[0].metadata(), &meta(&[("H1", "Title")]));
    }

    #[test]
    fn test_tilde_fence_needs_matching_closer() {
        let docs = splitter().split_text("~~~\n```\n# inside\n~~~\n# Out\nbody");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content(), "~~~\n```\n# inside\n~~~");
        assert!(docs[0].metadata().is_empty());
        assert_eq!(docs[1].metadata(), &meta(&[("H1", "Out")]));
    }

    #[test]
    fn test_inline_code_span_does_not_open_fence() {
        let docs = splitter().split_text("```inline```\n# Real\nbody");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].metadata(), &meta(&[("H1", "Real")]));
    }

    #[test]
    fn test_marker_needs_space() {
        let docs = splitter().split_text("#hashtag\n#\nbody");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content(), "#hashtag");
        assert!(docs[0].metadata().is_empty());
        assert_eq!(docs[1].metadata(), &meta(&[("H1", "")]));
    }

    #[test]
    fn test_blank_lines_and_aggregation() {
        let text = "# A\nx\n\ny";
        let docs = splitter().split_text(text);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content(), "x  \ny");

        let docs = splitter().with_return_each_line(true).split_text(text);
        let contents: Vec<&str> = docs.iter().map(|d| d.content()).collect();
        assert_eq!(contents, vec!["x", "y"]);
    }

    #[test]
    fn test_retained_headers() {
        let docs = splitter()
            .with_strip_headers(false)
            .split_text("# A\ntext1\n## B\ntext2");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content(), "# A\ntext1");
        assert_eq!(docs[1].content(), "## B\ntext2");
    }

    #[test]
    fn test_retained_header_merges_forward() {
        let docs = splitter()
            .with_strip_headers(false)
            .split_text("# A\n\n## B\ntext");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content(), "# A  \n## B\ntext");
        assert_eq!(docs[0].metadata(), &meta(&[("H1", "A"), ("H2", "B")]));

        // Only when headers are kept
        let docs = splitter().split_text("# A\n\n## B\ntext");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content(), "text");
    }

    #[test]
    fn test_split_documents_merges_source_metadata() {
        let doc = Document::new("# A\nbody").with_entry("source", "a.md").unwrap();
        let docs = splitter().split_documents(&[doc]).unwrap();
        assert_eq!(docs[0].get_str("source"), Some("a.md"));
        assert_eq!(docs[0].get_str("H1"), Some("A"));

        let clash = Document::new("# A\nbody").with_entry("H1", "x").unwrap();
        let err = splitter().split_documents(&[clash]).unwrap_err();
        assert_eq!(err.error_code(), "METADATA_CONFLICT");
    }

    #[test]
    fn test_empty_marker_rejected() {
        assert!(MarkdownHeaderSplitter::new(vec![HeaderSpec::new("", "H")]).is_err());
    }

    #[test]
    fn test_from_config() {
        let config = MarkdownConfig {
            return_each_line: true,
            ..MarkdownConfig::default()
        };
        let splitter = MarkdownHeaderSplitter::from_config(&config).unwrap();
        let docs = splitter.split_text("### Deep\nbody");
        assert_eq!(docs[0].get_str("Header 3"), Some("Deep"));
    }
}
