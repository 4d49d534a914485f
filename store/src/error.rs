//! Error types for schema storage operations.
//!
//! Provides a unified error type covering file I/O, JSON and YAML
//! (de)serialization, missing schema files, and schema errors raised while
//! interpreting file contents.

use std::path::PathBuf;

use pipeline_schema_core::SchemaError;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing or serialization failure.
    #[error("could not parse JSON in '{}': {source}", .path.display())]
    Json {
        /// File being parsed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// No schema file exists at the resolved location.
    #[error("could not find pipeline schema: {}", .0.display())]
    MissingSchema(PathBuf),

    /// The file was read but its contents are not acceptable.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
