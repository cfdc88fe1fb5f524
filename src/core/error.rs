//! Error types for XMP operations
//!
//! Queries that find nothing return `None`; only operations that cannot
//! complete produce an [`XmpError`].

use thiserror::Error;

/// Error types for XMP operations
#[derive(Debug, Error)]
pub enum XmpError {
    /// Bad parameter provided to a function (empty name, index out of range)
    #[error("Bad parameter: {0}")]
    BadParam(String),

    /// Value cannot be converted to the requested type
    #[error("Bad value: {0}")]
    BadValue(String),

    /// Bad schema URI or unregistered namespace
    #[error("Bad schema: {0}")]
    BadSchema(String),

    /// Unparsable path expression
    #[error("Bad XPath: {0}")]
    BadXPath(String),

    /// Path resolves to a node of the wrong kind for the operation
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// RDF/XML packet could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Mutually exclusive options requested together
    #[error("Bad options: {0}")]
    BadOptions(String),

    /// Exact-length serialization cannot fit the content
    #[error("Capacity exceeded: need {needed} bytes, {available} available")]
    CapacityExceeded {
        /// Bytes required by the unpadded packet
        needed: usize,
        /// Bytes allowed by the caller or the host file
        available: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Target of an operation that requires one does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// No handler for the requested or detected format
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// The owning engine context was terminated
    #[error("XMP context has been terminated")]
    Terminated,
}

/// Result type alias for XMP operations
pub type XmpResult<T> = Result<T, XmpError>;
