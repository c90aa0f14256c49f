//! Error types for BiDMS core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core structure operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] bidms_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A priority-queue locator no longer refers to a live entry.
    #[error("stale locator: slot {slot}")]
    StaleLocator {
        /// The slot the locator pointed at.
        slot: usize,
    },

    /// Vertex does not belong to the graph.
    #[error("vertex not found: {vertex}")]
    VertexNotFound {
        /// The vertex handle, rendered.
        vertex: String,
    },

    /// No edge between the given endpoints.
    #[error("edge not found: {from} -> {to}")]
    EdgeNotFound {
        /// Origin vertex, rendered.
        from: String,
        /// Destination vertex, rendered.
        to: String,
    },

    /// A disk node record failed to decode.
    #[error("corrupt node at offset {offset}: {message}")]
    CorruptNode {
        /// Byte offset of the record.
        offset: u64,
        /// Description of the problem.
        message: String,
    },

    /// Persisted data has an invalid shape.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Configuration value out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the bad value.
        message: String,
    },

    /// Caller supplied an argument the operation cannot accept.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the bad argument.
        message: String,
    },

    /// A structural invariant does not hold.
    #[error("invariant violated: {message}")]
    InvariantViolation {
        /// Which invariant failed and where.
        message: String,
    },
}

impl CoreError {
    /// Creates a vertex-not-found error.
    pub fn vertex_not_found(vertex: impl std::fmt::Display) -> Self {
        Self::VertexNotFound {
            vertex: vertex.to_string(),
        }
    }

    /// Creates an edge-not-found error.
    pub fn edge_not_found(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::EdgeNotFound {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates a corrupt node error.
    pub fn corrupt_node(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptNode {
            offset,
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }
}
