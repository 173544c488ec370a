//! Error types for the splitting system.

use thiserror::Error;

/// Result type alias using FusionError.
pub type Result<T> = std::result::Result<T, FusionError>;

/// Errors that can occur while configuring or running a splitter.
#[derive(Error, Debug)]
pub enum FusionError {
    /// Invalid splitter configuration (sizes, regexes, names).
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input of the wrong shape was handed to a splitter.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A chunk-specific metadata key already exists on the source document.
    #[error("Metadata key '{key}' already present on document")]
    MetadataConflict { key: String },

    /// The paragraph structure of a document could not be obtained.
    #[error("Failed to parse {source_name}: {reason}")]
    StructuralParse { source_name: String, reason: String },

    /// Tokenizer backend failed to encode or decode.
    #[error("Tokenizer error: {message}")]
    Tokenizer { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FusionError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a metadata conflict error.
    pub fn metadata_conflict(key: impl Into<String>) -> Self {
        Self::MetadataConflict { key: key.into() }
    }

    /// Create a structural parse error.
    pub fn structural_parse(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StructuralParse {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a tokenizer error.
    pub fn tokenizer(message: impl Into<String>) -> Self {
        Self::Tokenizer {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, used by the CLI when reporting failures.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::MetadataConflict { .. } => "METADATA_CONFLICT",
            Self::StructuralParse { .. } => "STRUCTURAL_PARSE_ERROR",
            Self::Tokenizer { .. } => "TOKENIZER_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
