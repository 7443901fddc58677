//! Error types for templates, term resolution, serialization and loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while parsing or expanding a URI template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("malformed URI template \"{template}\": {message}")]
    Malformed { template: String, message: String },

    #[error("URI template \"{template}\" has unresolved variables: {}", variables.join(", "))]
    Unresolved {
        template: String,
        variables: Vec<String>,
    },
}

/// Configuration errors in term declarations, detected on first use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermError {
    #[error("{element} declares both a single term and a term list")]
    ConflictingTermDeclaration { element: String },

    #[error("{element} defines term \"{term}\" more than once")]
    DuplicateTermDefinition { element: String, term: String },
}

/// Errors while building an action descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("action \"{action}\" uses {method}, which cannot carry a request body")]
    BodyNotAllowed { action: String, method: String },
}

/// No usable constructor for a request-body type.
///
/// Recovered locally: the property that needed the type is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no usable constructor for {type_name}")]
pub struct ConstructorResolutionFailure {
    pub type_name: String,
}

/// Errors while writing a resource graph as a hypermedia document.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Term(#[from] TermError),

    #[error("failed to inspect {object}: {message}")]
    SerializationFailure { object: String, message: String },

    #[error("maximum depth {max_depth} exceeded at {type_name}")]
    MaxDepthExceeded { max_depth: usize, type_name: String },

    #[error("document writer misuse: {message}")]
    Writer { message: String },
}

/// Errors while loading JSON documents.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {kind}: {source}")]
    InvalidDocument {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors while validating a request payload against an action.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("cannot build request schema: {message}")]
    Schema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },
}

/// Single validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl SerializeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Schema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}
