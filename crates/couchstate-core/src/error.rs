//! Error types for storage operations

use thiserror::Error;

use crate::client::DocumentError;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Problems with the connection configuration supplied by the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration string was provided
    #[error("missing configuration")]
    Missing,

    /// The configuration is not valid JSON for a connection descriptor
    #[error("malformed configuration: {0}")]
    Malformed(String),

    /// One or more required fields are absent or empty
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Errors surfaced to the host by initialization and resource operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Configuration is absent, malformed, or incomplete
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The database server is unreachable or rejected a bootstrap request
    #[error("Error initializing database connection: {0}")]
    Connectivity(#[source] DocumentError),

    /// A resource operation was attempted before a successful init
    #[error("Storage not initialized")]
    NotInitialized,

    /// The backing database failed a get or save
    #[error("Error {operation} {document}: {source}")]
    Store {
        operation: &'static str,
        document: String,
        #[source]
        source: DocumentError,
    },
}

impl StorageError {
    pub(crate) fn store(
        operation: &'static str,
        document: impl Into<String>,
        source: DocumentError,
    ) -> Self {
        Self::Store {
            operation,
            document: document.into(),
            source,
        }
    }

    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Connectivity(_) => "CONNECTIVITY_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::Store { .. } => "STORE_ERROR",
        }
    }
}
