//! Parent/child chunk correlation.
//!
//! Coarse parent chunks give a retriever context; fine child chunks give it
//! precision. Every child carries the `parent_id` of the chunk it was cut from.

use serde::Serialize;
use tracing::debug;
use ulid::Ulid;

use fusion_core::{insert_unique, keys, Document, ParentChildConfig, Result, TextSplitter};

use crate::registry::Splitter;

/// Parents and their children, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParentChildOutput {
    pub parents: Vec<Document>,
    pub children: Vec<Document>,
}

/// Applies a parent splitter, then a child splitter to every parent.
pub struct ParentChildSplitter {
    /// `None` means the input documents are the parents.
    parent: Option<Box<dyn TextSplitter>>,
    child: Box<dyn TextSplitter>,
}

impl ParentChildSplitter {
    pub fn new(parent: Box<dyn TextSplitter>, child: Box<dyn TextSplitter>) -> Self {
        Self {
            parent: Some(parent),
            child,
        }
    }

    /// Use each input document as a parent and only split children.
    pub fn direct(child: Box<dyn TextSplitter>) -> Self {
        Self {
            parent: None,
            child,
        }
    }

    pub fn from_config(config: &ParentChildConfig) -> Result<Self> {
        config.validate()?;
        let child = Box::new(Splitter::from_config(&config.child)?);
        Ok(match &config.parent {
            Some(parent) => Self::new(Box::new(Splitter::from_config(parent)?), child),
            None => Self::direct(child),
        })
    }

    /// Wrap raw texts as documents and split them.
    pub fn split_texts(&self, texts: &[&str]) -> Result<ParentChildOutput> {
        let documents: Vec<Document> = texts.iter().map(|t| Document::new(*t)).collect();
        self.split_documents(&documents)
    }

    pub fn split_documents(&self, documents: &[Document]) -> Result<ParentChildOutput> {
        let mut output = ParentChildOutput::default();

        for source in documents {
            let parents = match &self.parent {
                Some(splitter) => splitter.split_documents(std::slice::from_ref(source))?,
                None => vec![source.clone()],
            };

            for parent in parents {
                let parent_id = Ulid::new().to_string();
                let parent = parent.with_entry(keys::PARENT_ID, parent_id.as_str())?;

                for (chunk, offset) in self.child_chunks(parent.content())? {
                    let mut metadata = source.metadata().clone();
                    insert_unique(&mut metadata, keys::PARENT_ID, parent_id.as_str())?;
                    insert_unique(&mut metadata, keys::CHILD_ID, Ulid::new().to_string())?;
                    if let Some(offset) = offset {
                        insert_unique(&mut metadata, keys::START_INDEX, offset)?;
                    }
                    output.children.push(Document::with_metadata(chunk, metadata));
                }

                output.parents.push(parent);
            }
        }

        debug!(
            "Parent/child split: {} parents, {} children",
            output.parents.len(),
            output.children.len()
        );
        Ok(output)
    }

    /// Child chunks with offsets relative to the parent, when tracked.
    fn child_chunks(&self, text: &str) -> Result<Vec<(String, Option<usize>)>> {
        if self.child.add_start_index() {
            self.child.split_with_offsets(text)
        } else {
            Ok(self.child.split_text(text)?.into_iter().map(|c| (c, None)).collect())
        }
    }
}
