//! Error types for the data-access helper.

use mongodb::error::ErrorKind;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by `VibeKit` store operations.
#[derive(Debug, Error, uniffi::Error)]
pub enum StoreError {
    /// No connection has been initialized (or it was closed).
    #[error("store not initialized")]
    NotInitialized,

    /// The presented input is not valid for the requested operation.
    #[error("invalid input on {attribute}: {reason}")]
    InvalidInput {
        /// The name of the offending argument.
        attribute: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The client could not be configured (bad URL, bad options).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The server rejected a command.
    #[error("command failed ({code}): {message}")]
    Command {
        /// Server error code.
        code: i32,
        /// Server error message.
        message: String,
    },

    /// Any other driver failure (network, server selection, write errors).
    #[error("database error: {0}")]
    Database(String),

    /// Local filesystem or stream failure.
    #[error("io error: {0}")]
    Io(String),

    /// Serialization/deserialization failures.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the error came from the server rejecting a command.
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(self, Self::Command { .. })
    }

    pub(crate) fn invalid_input(attribute: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(error: mongodb::error::Error) -> Self {
        match error.kind.as_ref() {
            ErrorKind::Command(command) => Self::Command {
                code: command.code,
                message: command.message.clone(),
            },
            ErrorKind::InvalidArgument { message, .. } => {
                Self::Configuration(message.clone())
            }
            ErrorKind::BsonSerialization(err) => Self::Serialization(err.to_string()),
            ErrorKind::BsonDeserialization(err) => Self::Serialization(err.to_string()),
            _ => Self::Database(error.to_string()),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<mongodb::bson::extjson::de::Error> for StoreError {
    fn from(error: mongodb::bson::extjson::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(error: mongodb::bson::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
