//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Payload could not be parsed while a partition key field is configured
    #[error("malformed payload for stream '{stream}': {message}")]
    MalformedPayload { stream: String, message: String },

    /// Two definitions share a stream name
    #[error("duplicate stream '{stream}'")]
    DuplicateStream { stream: String },

    /// Contract error (pattern compilation, sink transport, ...)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// Streams must be created inside a tokio runtime
    #[error("no tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a malformed payload error
    pub fn malformed_payload(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            stream: stream.into(),
            message: message.into(),
        }
    }
}
