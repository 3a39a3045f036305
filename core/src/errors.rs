use thiserror::Error;
use crate::types::BookmarkId;

/// URL validation errors raised by the add-bookmark path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("URL is empty")]
    Empty,

    #[error("URL must not contain whitespace: {input}")]
    ContainsWhitespace { input: String },

    #[error("URL must contain a domain with a dot: {input}")]
    MissingDot { input: String },

    #[error("URL could not be parsed: {input}")]
    Unparsable { input: String },

    #[error("URL host is not valid: {host}")]
    InvalidHost { host: String },
}

/// Errors raised by operations on a bookmark collection
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Invalid URL: {source}")]
    Validation {
        #[from]
        source: ValidationError,
    },

    #[error("Bookmark already exists: {existing_id} ({dedup_key})")]
    Duplicate {
        existing_id: BookmarkId,
        dedup_key: String,
    },

    #[error("Bookmark not found: {id}")]
    NotFound { id: BookmarkId },
}

/// General system errors
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Configuration error: {details}")]
    Configuration { details: String },

    #[error("IO error: {source}")]
    IO {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

/// Main error type for the application
#[derive(Debug, Error)]
pub enum LinkshelfError {
    #[error("Collection error: {source}")]
    Collection {
        #[from]
        source: CollectionError,
    },

    #[error("System error: {source}")]
    System {
        #[from]
        source: SystemError,
    },
}

impl From<ValidationError> for LinkshelfError {
    fn from(source: ValidationError) -> Self {
        LinkshelfError::Collection {
            source: CollectionError::Validation { source },
        }
    }
}

impl From<std::io::Error> for LinkshelfError {
    fn from(source: std::io::Error) -> Self {
        LinkshelfError::System {
            source: SystemError::IO { source },
        }
    }
}

impl From<serde_json::Error> for LinkshelfError {
    fn from(source: serde_json::Error) -> Self {
        LinkshelfError::System {
            source: SystemError::Serialization { source },
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, LinkshelfError>;
