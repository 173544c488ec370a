//! Core traits defining the interfaces between components.

use tracing::warn;

use crate::error::{FusionError, Result};
use crate::types::{insert_unique, keys, Document, Metadata, StyledParagraph};

/// Size-based splitting capability.
///
/// Implementors only provide `split_text`; document creation, metadata
/// propagation and start-offset tracking are shared.
pub trait TextSplitter: Send + Sync {
    /// Split text into chunks.
    fn split_text(&self, text: &str) -> Result<Vec<String>>;

    /// Configured overlap, in units of the splitter's length function.
    fn chunk_overlap(&self) -> usize;

    /// Whether documents created by this splitter carry `start_index`.
    fn add_start_index(&self) -> bool;

    /// Split text and locate every chunk inside it (character offsets).
    fn split_with_offsets(&self, text: &str) -> Result<Vec<(String, Option<usize>)>> {
        let chunks = self.split_text(text)?;
        let offsets = locate_chunks(text, &chunks, self.chunk_overlap());
        Ok(chunks.into_iter().zip(offsets).collect())
    }

    /// Split each text and wrap the chunks as documents.
    ///
    /// The i-th metadata map is copied onto every chunk of the i-th text.
    fn create_documents(
        &self,
        texts: &[&str],
        metadatas: Option<&[Metadata]>,
    ) -> Result<Vec<Document>> {
        if let Some(metadatas) = metadatas {
            if metadatas.len() != texts.len() {
                return Err(FusionError::invalid_input(format!(
                    "got {} metadata maps for {} texts",
                    metadatas.len(),
                    texts.len()
                )));
            }
        }

        let mut documents = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let base = metadatas
                .and_then(|m| m.get(i))
                .cloned()
                .unwrap_or_default();

            if !self.add_start_index() {
                for chunk in self.split_text(text)? {
                    documents.push(Document::with_metadata(chunk, base.clone()));
                }
                continue;
            }

            for (chunk, offset) in self.split_with_offsets(text)? {
                let mut metadata = base.clone();
                match offset {
                    Some(offset) => insert_unique(&mut metadata, keys::START_INDEX, offset)?,
                    None => warn!("Could not locate chunk of {} bytes in source text", chunk.len()),
                }
                documents.push(Document::with_metadata(chunk, metadata));
            }
        }

        Ok(documents)
    }

    /// Split documents, keeping each document's metadata on its chunks.
    fn split_documents(&self, documents: &[Document]) -> Result<Vec<Document>> {
        let texts: Vec<&str> = documents.iter().map(|d| d.content()).collect();
        let metadatas: Vec<Metadata> = documents.iter().map(|d| d.metadata().clone()).collect();
        self.create_documents(&texts, Some(&metadatas))
    }
}

/// Token encoder/decoder pair used by token-window splitting.
pub trait Tokenizer: Send + Sync {
    /// Encode text to token ids.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token ids back to text.
    fn decode(&self, ids: &[u32]) -> Result<String>;
}

/// Supplier of styled paragraphs (the output of a word-processor loader).
pub trait ParagraphSource {
    /// Human-readable name used in error messages.
    fn source_name(&self) -> String {
        "document".to_string()
    }

    /// All paragraphs in document order.
    fn paragraphs(&self) -> Result<Vec<StyledParagraph>>;
}

impl ParagraphSource for [StyledParagraph] {
    fn paragraphs(&self) -> Result<Vec<StyledParagraph>> {
        Ok(self.to_vec())
    }
}

impl ParagraphSource for Vec<StyledParagraph> {
    fn paragraphs(&self) -> Result<Vec<StyledParagraph>> {
        Ok(self.clone())
    }
}

/// Find the character offset of each chunk inside `text`.
///
/// Chunks are searched in order. Each search starts where the previous chunk
/// ended minus the overlap, and falls back to one past the previous start.
/// Positions are tracked in bytes and converted with a cursor that only
/// moves across the text between consecutive matches.
pub fn locate_chunks(text: &str, chunks: &[String], overlap: usize) -> Vec<Option<usize>> {
    let mut offsets = Vec::with_capacity(chunks.len());
    let mut cursor = CharCursor::default();
    // Byte range of the last chunk found
    let mut previous: Option<(usize, usize)> = None;

    for chunk in chunks {
        let found = match previous {
            None => find_from(text, chunk, 0),
            Some((start, end)) => {
                let from = back_chars(text, end, overlap);
                find_from(text, chunk, from).or_else(|| {
                    let next = text[start..].chars().next()?;
                    find_from(text, chunk, start + next.len_utf8())
                })
            }
        };

        if let Some(byte) = found {
            previous = Some((byte, byte + chunk.len()));
        }
        offsets.push(found.map(|byte| cursor.seek(text, byte)));
    }

    offsets
}

/// Byte position `count` characters before `end`, or 0.
fn back_chars(text: &str, end: usize, count: usize) -> usize {
    if count == 0 {
        return end;
    }
    text[..end]
        .char_indices()
        .rev()
        .nth(count - 1)
        .map_or(0, |(byte, _)| byte)
}

/// Byte offset of `needle` at or after byte `from`.
fn find_from(text: &str, needle: &str, from: usize) -> Option<usize> {
    Some(from + text.get(from..)?.find(needle)?)
}

/// Paired byte and character position inside a text.
#[derive(Debug, Default)]
struct CharCursor {
    byte: usize,
    chars: usize,
}

impl CharCursor {
    /// Move to `byte` and return its character offset.
    fn seek(&mut self, text: &str, byte: usize) -> usize {
        if byte >= self.byte {
            self.chars += text[self.byte..byte].chars().count();
        } else {
            self.chars -= text[byte..self.byte].chars().count();
        }
        self.byte = byte;
        self.chars
    }
}
