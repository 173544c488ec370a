//! Fusion CLI - Split local files into metadata-tagged chunks.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use fusion_chunk::{
    MarkdownHeaderSplitter, NumberedHeadingExtractor, ParentChildSplitter, Pipeline, Splitter,
    StyledHeadingExtractor,
};
use fusion_core::{
    keys, Document, FusionConfig, FusionError, ParagraphSource, ParentChildConfig, Result,
    SplitterConfig, SplitterKind, StructureConfig, StyledParagraph, TextSplitter,
};

/// Fusion - Hierarchical text splitting for retrieval pipelines
#[derive(Parser)]
#[command(name = "fusion")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/fusion/config.toml, then ./fusion.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file with a size-based splitter
    Split {
        /// File to split
        file: PathBuf,

        /// Splitter to use (character, recursive, token, sentence)
        #[arg(short, long)]
        kind: Option<SplitterKind>,

        /// Maximum chunk size
        #[arg(short = 's', long)]
        chunk_size: Option<usize>,

        /// Overlap between consecutive chunks
        #[arg(short = 'o', long)]
        chunk_overlap: Option<usize>,

        /// Record each chunk's start offset
        #[arg(long)]
        start_index: bool,
    },

    /// Split a markdown file on its headers
    Markdown {
        /// Markdown file
        file: PathBuf,

        /// Keep header lines in chunk content
        #[arg(long)]
        keep_headers: bool,

        /// Return every line group instead of aggregating sections
        #[arg(long)]
        each_line: bool,
    },

    /// Extract sections opened by numbered headings
    Headings {
        /// Text file, or a JSON array of strings and documents
        file: PathBuf,

        /// Heading pattern
        #[arg(short, long)]
        pattern: Option<String>,

        /// Emit heading lines as their own chunks
        #[arg(long)]
        keep_headers: bool,
    },

    /// Extract sections from styled paragraphs
    Styled {
        /// JSON array of {"style", "text"} paragraphs
        file: PathBuf,

        /// Emit heading paragraphs as their own chunks
        #[arg(long)]
        keep_headers: bool,
    },

    /// Split into parent chunks and linked child chunks
    ParentChild {
        /// File to split
        file: PathBuf,

        /// Parent chunk size (input is the parent if not specified)
        #[arg(long)]
        parent_size: Option<usize>,

        /// Child chunk size
        #[arg(long)]
        child_size: Option<usize>,

        /// Record child offsets within their parent
        #[arg(long)]
        start_index: bool,
    },

    /// Run the configured pipeline over one or more files
    Run {
        /// Files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Styled paragraphs stored as JSON, as written by a document loader.
struct JsonParagraphs {
    path: PathBuf,
}

impl ParagraphSource for JsonParagraphs {
    fn source_name(&self) -> String {
        self.path.display().to_string()
    }

    fn paragraphs(&self) -> Result<Vec<StyledParagraph>> {
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| FusionError::structural_parse(self.source_name(), e.to_string()))
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = execute(cli) {
        eprintln!("Error [{}]: {}", e.error_code(), e);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Split {
            file,
            kind,
            chunk_size,
            chunk_overlap,
            start_index,
        } => {
            let splitter_config =
                splitter_overrides(&config.splitter, kind, chunk_size, chunk_overlap, start_index);
            let splitter = Splitter::from_config(&splitter_config)?;
            print_json(&splitter.split_documents(&[load_document(&file)?])?)
        }
        Commands::Markdown {
            file,
            keep_headers,
            each_line,
        } => {
            let base = match &config.structure {
                StructureConfig::Markdown(markdown) => markdown.clone(),
                _ => Default::default(),
            };
            let splitter = MarkdownHeaderSplitter::from_config(&base)?
                .with_strip_headers(base.strip_headers && !keep_headers)
                .with_return_each_line(base.return_each_line || each_line);
            print_json(&splitter.split_documents(&[load_document(&file)?])?)
        }
        Commands::Headings {
            file,
            pattern,
            keep_headers,
        } => {
            let mut base = match &config.structure {
                StructureConfig::Numbered(numbered) => numbered.clone(),
                _ => Default::default(),
            };
            if let Some(pattern) = pattern {
                base.pattern = pattern;
            }
            base.strip_headers = base.strip_headers && !keep_headers;
            let extractor = NumberedHeadingExtractor::from_config(&base)?;

            if is_json(&file) {
                let content = fs::read_to_string(&file)?;
                let values: Vec<serde_json::Value> = serde_json::from_str(&content)?;
                print_json(&extractor.extract_values(&values)?)
            } else {
                print_json(&extractor.split_documents(&[load_document(&file)?])?)
            }
        }
        Commands::Styled { file, keep_headers } => {
            let extractor = StyledHeadingExtractor::from_config(&config.styled)?
                .with_strip_headers(config.styled.strip_headers && !keep_headers);
            print_json(&extractor.extract(&JsonParagraphs { path: file })?)
        }
        Commands::ParentChild {
            file,
            parent_size,
            child_size,
            start_index,
        } => {
            let parent_child = parent_child_overrides(
                config.parent_child.as_ref(),
                parent_size,
                child_size,
                start_index,
            );
            let splitter = ParentChildSplitter::from_config(&parent_child)?;
            print_json(&splitter.split_documents(&[load_document(&file)?])?)
        }
        Commands::Run { files } => {
            let pipeline = Pipeline::from_config(&config)?;
            let documents = files
                .iter()
                .map(|f| load_document(f))
                .collect::<Result<Vec<_>>>()?;
            print_json(&pipeline.run(&documents)?)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<FusionConfig> {
    match path {
        Some(path) => FusionConfig::load(path),
        None => FusionConfig::load_default(),
    }
}

/// Read a file into a document tagged with its path.
fn load_document(path: &Path) -> Result<Document> {
    let content = fs::read_to_string(path)?;
    debug!("Read {} ({} bytes)", path.display(), content.len());
    Document::new(content).with_entry(keys::SOURCE, path.display().to_string())
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn splitter_overrides(
    base: &SplitterConfig,
    kind: Option<SplitterKind>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    start_index: bool,
) -> SplitterConfig {
    let mut config = base.clone();
    if let Some(kind) = kind {
        config.kind = kind;
    }
    if let Some(chunk_size) = chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(chunk_overlap) = chunk_overlap {
        config.chunk_overlap = chunk_overlap;
    }
    config.add_start_index |= start_index;
    config
}

fn parent_child_overrides(
    base: Option<&ParentChildConfig>,
    parent_size: Option<usize>,
    child_size: Option<usize>,
    start_index: bool,
) -> ParentChildConfig {
    let mut config = base.cloned().unwrap_or_else(|| ParentChildConfig {
        parent: Some(SplitterConfig::new(SplitterKind::Recursive, 2000, 0)),
        child: SplitterConfig::new(SplitterKind::Recursive, 400, 0),
    });

    if let Some(size) = parent_size {
        let parent = config.parent.get_or_insert_with(SplitterConfig::default);
        parent.chunk_size = size;
        parent.chunk_overlap = parent.chunk_overlap.min(size.saturating_sub(1));
    }
    if let Some(size) = child_size {
        config.child.chunk_size = size;
        config.child.chunk_overlap = config.child.chunk_overlap.min(size.saturating_sub(1));
    }
    config.child.add_start_index |= start_index;
    config
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "fusion", "-v", "split", "notes.txt", "--kind", "token", "-s", "64", "-o", "8",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Split {
                kind, chunk_size, ..
            } => {
                assert_eq!(kind, Some(SplitterKind::Token));
                assert_eq!(chunk_size, Some(64));
            }
            _ => panic!("expected split"),
        }

        assert!(Cli::try_parse_from(["fusion", "split", "a.txt", "--kind", "nltk"]).is_err());
        assert!(Cli::try_parse_from(["fusion", "run"]).is_err());
    }

    #[test]
    fn test_splitter_overrides() {
        let config = splitter_overrides(
            &SplitterConfig::default(),
            Some(SplitterKind::Sentence),
            Some(300),
            None,
            true,
        );
        assert_eq!(config.kind, SplitterKind::Sentence);
        assert_eq!(config.chunk_size, 300);
        assert_eq!(config.chunk_overlap, 200);
        assert!(config.add_start_index);
    }

    #[test]
    fn test_parent_child_overrides() {
        let config = parent_child_overrides(None, Some(1000), Some(100), false);
        assert_eq!(config.parent.as_ref().map(|p| p.chunk_size), Some(1000));
        assert_eq!(config.child.chunk_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_document_sets_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "hello").unwrap();

        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.content(), "hello");
        assert_eq!(
            doc.get_str("source"),
            Some(file.path().display().to_string().as_str())
        );
    }

    #[test]
    fn test_json_paragraphs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"style": "Heading 1", "text": "Intro"}}, {{"style": "Normal", "text": "body"}}]"#
        )
        .unwrap();

        let source = JsonParagraphs {
            path: file.path().to_path_buf(),
        };
        assert_eq!(source.paragraphs().unwrap().len(), 2);

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        write!(broken, "not json").unwrap();
        let source = JsonParagraphs {
            path: broken.path().to_path_buf(),
        };
        let err = StyledHeadingExtractor::from_config(&Default::default())
            .unwrap()
            .extract(&source)
            .unwrap_err();
        assert_eq!(err.error_code(), "STRUCTURAL_PARSE_ERROR");
    }
}
