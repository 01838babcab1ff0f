//! Error types for the core library.

use std::time::Duration;

use thiserror::Error;

use crate::document::DocumentId;
use crate::state::ReadingStatus;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is malformed or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single document's record could not be read or parsed.
    #[error("Metadata for document {id} is unreadable: {reason}")]
    MetadataRead {
        /// Document whose record failed.
        id: DocumentId,
        /// Description of what went wrong.
        reason: String,
    },

    /// A document could not be moved to its destination folder.
    #[error("Cannot move document {id}: {reason}")]
    Move {
        /// Document that was being moved.
        id: DocumentId,
        /// Description of what went wrong.
        reason: String,
    },

    /// The persisted state could not be read or written.
    #[error("State repository error: {0}")]
    StateRepository(String),

    /// The document store as a whole cannot be reached.
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    /// A status change that would not advance the document.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: ReadingStatus,
        /// Requested status.
        to: ReadingStatus,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Returns true if the error concerns a single document and the cycle
    /// can continue with the others.
    #[must_use]
    pub const fn is_per_document(&self) -> bool {
        matches!(self, Self::MetadataRead { .. } | Self::Move { .. })
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
