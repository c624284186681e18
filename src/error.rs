//! Error handling for the smartpool client
//!
//! Errors are split by what the caller can do about them: external I/O
//! (node, contract, files) is retryable, corrupt or impossible local state is
//! fatal. Share classification outcomes are values, never errors.

use thiserror::Error;

/// Result type alias for smartpool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the smartpool client
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Merkle tree precondition violations
    #[error("Merkle tree error: {message}")]
    Tree { message: String },

    /// Dataset file does not follow the 8-byte magic + 128-byte block layout
    #[error("Malformed dataset: {message}")]
    MalformedDataset { message: String },

    /// Pool contract call failures
    #[error("Contract error: {message}")]
    Contract { message: String },

    /// Ethereum node communication errors
    #[error("Node error: {message}")]
    Node { message: String },

    /// Proof-of-work collaborator errors
    #[error("PoW error: {message}")]
    Pow { message: String },

    /// Malformed values received from miners
    #[error("Invalid parameter: {message}")]
    InvalidParams { message: String },

    /// Timeout errors
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Cancellation errors for async operations
    #[error("Operation was cancelled: {operation}")]
    Cancelled { operation: String },

    /// Invalid state errors
    #[error("Invalid state: {message}")]
    InvalidState { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a merkle tree error
    pub fn tree(message: impl Into<String>) -> Self {
        Self::Tree {
            message: message.into(),
        }
    }

    /// Create a malformed dataset error
    pub fn malformed_dataset(message: impl Into<String>) -> Self {
        Self::MalformedDataset {
            message: message.into(),
        }
    }

    /// Create a contract error
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract {
            message: message.into(),
        }
    }

    /// Create a node error
    pub fn node(message: impl Into<String>) -> Self {
        Self::Node {
            message: message.into(),
        }
    }

    /// Create a PoW collaborator error
    pub fn pow(message: impl Into<String>) -> Self {
        Self::Pow {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Contract { .. } | Error::Node { .. } | Error::Timeout { .. }
        )
    }

    /// Check if error means local state can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Tree { .. } | Error::MalformedDataset { .. } | Error::InvalidState { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Config { .. } => "config",
            Error::Tree { .. } => "tree",
            Error::MalformedDataset { .. } => "dataset",
            Error::Contract { .. } => "contract",
            Error::Node { .. } => "node",
            Error::Pow { .. } => "pow",
            Error::InvalidParams { .. } => "invalid_params",
            Error::Timeout { .. } => "timeout",
            Error::Cancelled { .. } => "cancelled",
            Error::InvalidState { .. } => "invalid_state",
        }
    }
}
