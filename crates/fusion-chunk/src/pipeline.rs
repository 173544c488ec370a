//! End-to-end splitting: structure first, then size.

use serde::Serialize;
use tracing::info;

use fusion_core::{Document, FusionConfig, Result, StructureConfig, TextSplitter};

use crate::heading::NumberedHeadingExtractor;
use crate::markdown::MarkdownHeaderSplitter;
use crate::parent::ParentChildSplitter;
use crate::registry::Splitter;

/// Structure-preserving stage run before size-based splitting.
#[derive(Debug, Clone)]
pub enum StructuralStage {
    Markdown(MarkdownHeaderSplitter),
    Numbered(NumberedHeadingExtractor),
}

impl StructuralStage {
    /// `None` when structure splitting is off.
    pub fn from_config(config: &StructureConfig) -> Result<Option<Self>> {
        Ok(match config {
            StructureConfig::None => None,
            StructureConfig::Markdown(markdown) => {
                Some(Self::Markdown(MarkdownHeaderSplitter::from_config(markdown)?))
            }
            StructureConfig::Numbered(numbered) => {
                Some(Self::Numbered(NumberedHeadingExtractor::from_config(numbered)?))
            }
        })
    }

    pub fn split_documents(&self, documents: &[Document]) -> Result<Vec<Document>> {
        match self {
            Self::Markdown(splitter) => splitter.split_documents(documents),
            Self::Numbered(extractor) => extractor.split_documents(documents),
        }
    }
}

enum SizeStage {
    Single(Splitter),
    ParentChild(ParentChildSplitter),
}

/// Documents produced by a pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineOutput {
    /// Size-bounded chunks, or parents when parent/child is configured.
    pub documents: Vec<Document>,
    /// Child chunks; empty without parent/child.
    pub children: Vec<Document>,
}

/// Optional structural stage followed by a size stage.
pub struct Pipeline {
    structure: Option<StructuralStage>,
    size: SizeStage,
}

impl Pipeline {
    pub fn new(splitter: Splitter) -> Self {
        Self {
            structure: None,
            size: SizeStage::Single(splitter),
        }
    }

    pub fn parent_child(splitter: ParentChildSplitter) -> Self {
        Self {
            structure: None,
            size: SizeStage::ParentChild(splitter),
        }
    }

    pub fn with_structure(mut self, structure: StructuralStage) -> Self {
        self.structure = Some(structure);
        self
    }

    /// Build every stage the configuration describes.
    ///
    /// A `[parent_child]` section replaces the `[splitter]` stage.
    pub fn from_config(config: &FusionConfig) -> Result<Self> {
        config.validate()?;
        let pipeline = match &config.parent_child {
            Some(parent_child) => Self::parent_child(ParentChildSplitter::from_config(parent_child)?),
            None => Self::new(Splitter::from_config(&config.splitter)?),
        };
        Ok(match StructuralStage::from_config(&config.structure)? {
            Some(structure) => pipeline.with_structure(structure),
            None => pipeline,
        })
    }

    pub fn run(&self, documents: &[Document]) -> Result<PipelineOutput> {
        let structured;
        let input = match &self.structure {
            Some(stage) => {
                structured = stage.split_documents(documents)?;
                structured.as_slice()
            }
            None => documents,
        };

        let output = match &self.size {
            SizeStage::Single(splitter) => PipelineOutput {
                documents: splitter.split_documents(input)?,
                children: Vec::new(),
            },
            SizeStage::ParentChild(splitter) => {
                let split = splitter.split_documents(input)?;
                PipelineOutput {
                    documents: split.parents,
                    children: split.children,
                }
            }
        };

        info!(
            "Pipeline produced {} documents and {} children from {} inputs",
            output.documents.len(),
            output.children.len(),
            documents.len()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str) -> Document {
        Document::new(text).with_entry("source", "notes.md").unwrap()
    }

    #[test]
    fn test_default_pipeline() {
        let pipeline = Pipeline::from_config(&FusionConfig::default()).unwrap();
        let output = pipeline.run(&[source("hello world")]).unwrap();
        assert_eq!(output.documents.len(), 1);
        assert_eq!(output.documents[0].get_str("source"), Some("notes.md"));
        assert!(output.children.is_empty());
    }

    #[test]
    fn test_markdown_then_recursive() {
        let config = FusionConfig::from_toml(
            r#"
            [splitter]
            chunk_size = 12
            chunk_overlap = 0

            [structure]
            mode = "markdown"
            "#,
        )
        .unwrap();
        let pipeline = Pipeline::from_config(&config).unwrap();
        let output = pipeline
            .run(&[source("# Intro\nalpha beta gamma delta\n## Part\nshort")])
            .unwrap();

        let contents: Vec<&str> = output.documents.iter().map(|d| d.content()).collect();
        assert_eq!(contents, vec!["alpha beta", "gamma delta", "short"]);
        assert_eq!(output.documents[1].get_str("Header 1"), Some("Intro"));
        assert_eq!(output.documents[2].get_str("Header 2"), Some("Part"));
        assert_eq!(output.documents[2].get_str("source"), Some("notes.md"));
    }

    #[test]
    fn test_numbered_then_parent_child() {
        let config = FusionConfig::from_toml(
            r#"
            [structure]
            mode = "numbered"

            [parent_child.child]
            chunk_size = 10
            chunk_overlap = 0
            "#,
        )
        .unwrap();
        let pipeline = Pipeline::from_config(&config).unwrap();
        let output = pipeline
            .run(&[source("1 Scope\nalpha beta gamma\n2 Terms\ndelta")])
            .unwrap();

        assert_eq!(output.documents.len(), 2);
        assert_eq!(output.documents[0].get_str("header"), Some("1 Scope"));
        assert!(output.documents[0].get("parent_id").is_some());

        let contents: Vec<&str> = output.children.iter().map(|d| d.content()).collect();
        assert_eq!(contents, vec!["alpha beta", "gamma", "delta"]);
        assert_eq!(output.children[2].get_str("header"), Some("2 Terms"));
    }

    #[test]
    fn test_output_serializes() {
        let output = Pipeline::new(
            Splitter::from_config(&fusion_core::SplitterConfig::default()).unwrap(),
        )
        .run(&[Document::new("x")])
        .unwrap();
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["documents"][0]["content"], "x");
        assert_eq!(json["children"], serde_json::json!([]));
    }
}
