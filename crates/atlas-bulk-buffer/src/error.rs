// Buffer error types

use thiserror::Error;

/// How a single buffered operation can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The bulk response reported a failure for this entity.
    #[error("[{id}]: {message}")]
    Entity { id: String, message: String },

    /// The bulk call itself failed; fanned out to every operation in the
    /// window.
    #[error("bulk operation failed: {0}")]
    Operation(String),

    /// The bulk response contained no result for this entity.
    #[error("no bulk operation result for entity [{0}]")]
    Unmatched(String),

    /// The buffer's collector task is gone.
    #[error("the operation buffer is closed")]
    Closed,
}

impl BufferError {
    pub fn entity(id: impl Into<String>, message: impl Into<String>) -> BufferError {
        BufferError::Entity {
            id: id.into(),
            message: message.into(),
        }
    }
}
