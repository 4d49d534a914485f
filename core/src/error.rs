//! Error types for schema operations.
//!
//! A single error enum covers flattening, structural validation, parameter
//! parsing, and the remote builder protocol. Reconciliation additions and
//! removals are reported as data and never surface here.

use thiserror::Error;

/// Errors raised by schema operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A group child shares its key with another flattened parameter.
    ///
    /// The document is corrupt; the operation must be aborted.
    #[error("duplicate parameter `{key}` found")]
    DuplicateParameter {
        /// The colliding parameter key.
        key: String,
    },

    /// The document is not a well-formed parameter schema.
    #[error("schema is not valid: {message}")]
    SchemaStructure {
        /// Description of the first structural problem.
        message: String,
    },

    /// A parameter file could be parsed neither as JSON nor as YAML.
    #[error("could not load params file as either JSON or YAML:\n JSON: {json}\n YAML: {yaml}")]
    ParameterFileParse {
        /// JSON parser complaint.
        json: String,
        /// YAML parser complaint.
        yaml: String,
    },

    /// A parameter set does not satisfy the flattened schema.
    #[error("input parameters are invalid: {message}")]
    InvalidParameters {
        /// The first violation reported by the validator.
        message: String,
    },

    /// The remote builder answered outside of its fixed contract.
    #[error("schema builder response not recognised: {message}")]
    Protocol {
        /// What was wrong with the response.
        message: String,
    },

    /// The remote builder reported a failure.
    #[error("got error from schema builder ({message})")]
    RemoteEdit {
        /// Message supplied by the remote side.
        message: String,
    },

    /// The poll budget ran out while the user was still editing.
    #[error("schema builder still waiting for user after {polls} polls")]
    RemoteTimeout {
        /// Number of polls performed.
        polls: u32,
    },

    /// Polling was cancelled by the caller.
    #[error("remote schema editing cancelled")]
    Cancelled,

    /// The transport failed to deliver a request or decode a response.
    #[error("transport error: {0}")]
    Transport(String),
}

impl SchemaError {
    /// Shorthand for a [`SchemaError::SchemaStructure`] error.
    pub fn structure(message: impl Into<String>) -> Self {
        Self::SchemaStructure {
            message: message.into(),
        }
    }

    /// Shorthand for a [`SchemaError::Protocol`] error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
