//! Shared error types for the matcher core.

use thiserror::Error;

/// Main error type for matcher operations.
///
/// Contract violations are checked before any mutation, so the graph is
/// left intact when one is returned.
#[derive(Debug, Error)]
pub enum Error {
    /// Classes with differing array dimension counts were paired.
    #[error("array dimension mismatch: {a} has {a_dims}, {b} has {b_dims}")]
    ArrayDimensionMismatch {
        a: String,
        a_dims: u8,
        b: String,
        b_dims: u8,
    },

    /// Members were paired across classes that are not matched to each
    /// other.
    #[error("{kind}s don't belong to matched classes: {a} / {b}")]
    UnmatchedOwners { kind: &'static str, a: String, b: String },

    /// Vars were paired across methods that are not matched to each other.
    #[error("method vars don't belong to matched methods: {a} / {b}")]
    UnmatchedVarOwners { a: String, b: String },

    /// An argument was paired with a local variable.
    #[error("method vars are not of the same kind: {a} / {b}")]
    VarKindMismatch { a: String, b: String },

    /// Graph construction errors
    #[error("graph error: {0}")]
    Graph(String),

    /// Malformed type or method descriptor
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A parallel worker failed; the pass was abandoned.
    #[error("worker failed: {0}")]
    Worker(#[from] anyhow::Error),
}

/// Result type alias using the matcher error type.
pub type Result<T> = std::result::Result<T, Error>;
