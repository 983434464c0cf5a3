//! Document database clients
//!
//! [`DocumentStore`] is the narrow slice of the CouchDB HTTP API the storage
//! layer relies on. [`CouchClient`] talks to a real server over HTTP;
//! [`MemoryStore`] keeps everything in process and follows the same
//! revision rules, for tests and embedding.

mod couch;
mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use couch::CouchClient;
pub use memory::MemoryStore;

/// A stored JSON document, including its `_id` and `_rev` fields
pub type Document = Map<String, Value>;

/// Field holding a document's identifier
pub const ID_FIELD: &str = "_id";

/// Field holding a document's revision token
pub const REV_FIELD: &str = "_rev";

/// Errors reported by a document store
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The server URL cannot be used
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    /// The request never produced a response
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The document (or database) does not exist
    #[error("Document not found")]
    NotFound,

    /// The write carried a stale or missing revision token
    #[error("Document update conflict: {0}")]
    Conflict(String),

    /// The database being created already exists
    #[error("Database already exists")]
    AlreadyExists,

    /// Any other non-success response
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Database and document operations needed by the storage layer
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of all databases on the server
    async fn list_databases(&self) -> Result<Vec<String>, DocumentError>;

    /// Create a database; [`DocumentError::AlreadyExists`] if it is present
    async fn create_database(&self, name: &str) -> Result<(), DocumentError>;

    /// Fetch a document by id; [`DocumentError::NotFound`] if it is absent
    async fn get_document(&self, database: &str, id: &str) -> Result<Document, DocumentError>;

    /// Insert or replace a document by id.
    ///
    /// Replacing an existing document requires the `_rev` it was read with,
    /// otherwise the write fails with [`DocumentError::Conflict`].
    async fn put_document(
        &self,
        database: &str,
        id: &str,
        document: &Document,
    ) -> Result<(), DocumentError>;
}
