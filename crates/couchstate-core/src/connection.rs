//! Document-keyed resource store
//!
//! Each resource lives as one field of one document. Reads resolve a
//! missing document, or a missing/null field, to the resource default.
//! Writes fetch the document, replace only their own field and put it back
//! with the revision it was read at, so other fields (and concurrent
//! writers) are never silently clobbered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::client::{Document, DocumentError, DocumentStore, ID_FIELD};
use crate::error::{StorageError, StorageResult};
use crate::resource::LogicalResource;

type DocumentLocks = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Live handle to the application database.
///
/// Produced by [`crate::bootstrap`]; cheap to clone and safe to share
/// across tasks.
#[derive(Clone)]
pub struct Connection {
    store: Arc<dyn DocumentStore>,
    database: String,
    locks: Arc<DocumentLocks>,
}

impl Connection {
    /// Wrap a document store bound to an existing database
    pub fn new(store: Arc<dyn DocumentStore>, database: impl Into<String>) -> Self {
        Self {
            store,
            database: database.into(),
            locks: Arc::default(),
        }
    }

    /// Name of the database in use
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Read a resource, falling back to its default when nothing is stored
    ///
    /// # Errors
    /// Returns [`StorageError::Store`] if the database fails for any reason
    /// other than the document being absent
    pub async fn get(&self, resource: LogicalResource) -> StorageResult<Value> {
        self.get_document(
            resource.document_id(),
            resource.field_name(),
            resource.default_value(),
        )
        .await
    }

    /// Store a resource's payload
    ///
    /// # Errors
    /// Returns [`StorageError::Store`] if the fetch or the write fails,
    /// including a revision conflict with another writer
    pub async fn save(&self, resource: LogicalResource, value: Value) -> StorageResult<()> {
        self.save_document(resource.document_id(), resource.field_name(), value)
            .await
    }

    /// Read `field` of document `doc_id`, or `default` when the document is
    /// missing or the field is absent or null
    ///
    /// # Errors
    /// Returns [`StorageError::Store`] for any fetch failure except not-found
    pub async fn get_document(
        &self,
        doc_id: &str,
        field: &str,
        default: Value,
    ) -> StorageResult<Value> {
        debug!("get {doc_id}");

        match self.store.get_document(&self.database, doc_id).await {
            Ok(mut document) => match document.remove(field) {
                Some(Value::Null) | None => Ok(default),
                Some(value) => Ok(value),
            },
            Err(DocumentError::NotFound) => {
                debug!("No {doc_id} document found, returning default value");
                Ok(default)
            }
            Err(source) => Err(StorageError::store("getting", doc_id, source)),
        }
    }

    /// Set `field` of document `doc_id` to `value`, leaving every other
    /// field untouched. Creates the document if it does not exist.
    ///
    /// Saves to the same document from this connection are serialized; a
    /// writer in another process can still win the race, in which case the
    /// stale revision makes this write fail instead of overwriting it.
    ///
    /// # Errors
    /// Returns [`StorageError::Store`] if the fetch fails (other than
    /// not-found) or the write is rejected
    pub async fn save_document(&self, doc_id: &str, field: &str, value: Value) -> StorageResult<()> {
        debug!("save {doc_id}");

        let lock = self.lock_for(doc_id);
        let _guard = lock.lock().await;

        let mut document = match self.store.get_document(&self.database, doc_id).await {
            Ok(document) => document,
            Err(DocumentError::NotFound) => new_document(doc_id),
            Err(source) => return Err(StorageError::store("saving", doc_id, source)),
        };

        document.insert(field.to_string(), value);

        self.store
            .put_document(&self.database, doc_id, &document)
            .await
            .map_err(|source| StorageError::store("saving", doc_id, source))?;

        debug!("{doc_id} saved successfully");
        Ok(())
    }

    fn lock_for(&self, doc_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(doc_id.to_string()).or_default())
    }
}

fn new_document(doc_id: &str) -> Document {
    let mut document = Document::new();
    document.insert(ID_FIELD.to_string(), Value::String(doc_id.to_string()));
    document
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}
