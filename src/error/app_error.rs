use thiserror::Error;

/// Crate-wide error type for notification dispatch and queued delivery.
///
/// Variants fall into two groups. Programmer and wiring mistakes
/// (`Configuration`, `MissingType`) are fail-fast and always reach the
/// immediate caller. Runtime failures (`Transport`, `Queue`, ...) are expected
/// and are absorbed by the retry policy or the worker loop.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required collaborator (serializer, queue adapter, ...) is not configured
    #[error("Configuration error: {key}: {message}")]
    Configuration { key: String, message: String },

    /// Hydration was requested for a type name the registry does not know
    #[error("Unknown notification type: {type_name}")]
    UnknownType { type_name: String },

    /// A notification exposes neither a type tag nor a usable type name
    #[error("Cannot {operation} notification: missing type tag or type name")]
    MissingType { operation: &'static str },

    /// A channel adapter failed to deliver
    #[error("Delivery via {channel} channel failed")]
    Transport {
        channel: String,
        #[source]
        source: anyhow::Error,
    },

    /// Encoding or decoding of notification data failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Queue backend operation failed
    #[error("Queue operation failed: {operation}")]
    Queue {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn configuration(key: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Configuration {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn transport(channel: impl Into<String>, source: anyhow::Error) -> Self {
        AppError::Transport {
            channel: channel.into(),
            source,
        }
    }

    /// Whether this error signals a wiring or programming mistake that must
    /// propagate instead of being turned into a retry decision.
    pub fn is_fail_fast(&self) -> bool {
        matches!(
            self,
            AppError::Configuration { .. } | AppError::MissingType { .. }
        )
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_fast_classification() {
        assert!(AppError::configuration("queue", "missing serializer").is_fail_fast());
        assert!(AppError::MissingType { operation: "serialize" }.is_fail_fast());

        assert!(!AppError::UnknownType {
            type_name: "Welcome".to_string()
        }
        .is_fail_fast());
        assert!(!AppError::transport("mail", anyhow::anyhow!("smtp down")).is_fail_fast());
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::configuration("queue.serializer", "required to enqueue");
        assert_eq!(
            err.to_string(),
            "Configuration error: queue.serializer: required to enqueue"
        );

        let err = AppError::transport("mail", anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Delivery via mail channel failed");
        assert_eq!(
            std::error::Error::source(&err).map(|s| s.to_string()),
            Some("connection refused".to_string())
        );
    }

    #[test]
    fn test_from_anyhow() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AppError::Internal { .. }));
    }
}
