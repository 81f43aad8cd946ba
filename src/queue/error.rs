//! Queue backend error types.

use thiserror::Error;

use crate::error::AppError;

/// Errors that can occur during queue backend operations.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue operation failed: {0}")]
    Operation(String),

    #[error("Queue connection failed: {0}")]
    Connection(String),

    #[error("Queue payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<QueueError> for AppError {
    fn from(error: QueueError) -> Self {
        let operation = match &error {
            QueueError::Operation(_) => "backend operation",
            QueueError::Connection(_) => "backend connection",
            QueueError::Serialization(_) => "payload serialization",
        };
        AppError::Queue {
            operation: operation.to_string(),
            source: anyhow::Error::from(error),
        }
    }
}
