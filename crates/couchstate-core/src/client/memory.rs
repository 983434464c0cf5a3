//! In-process document store

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::{Document, DocumentError, DocumentStore, ID_FIELD, REV_FIELD};

type Databases = BTreeMap<String, HashMap<String, Document>>;

/// Document store kept in memory, with CouchDB revision semantics.
///
/// Every successful write bumps the document's `_rev`; replacing a document
/// requires the current `_rev`, and creating one requires none.
#[derive(Debug, Default)]
pub struct MemoryStore {
    databases: Mutex<Databases>,
}

impl MemoryStore {
    /// Create an empty store with no databases
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds the named databases
    #[must_use]
    pub fn with_databases<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let databases = names
            .into_iter()
            .map(|name| (name.into(), HashMap::new()))
            .collect();
        Self {
            databases: Mutex::new(databases),
        }
    }

    /// Raw stored document, as the server would return it
    #[must_use]
    pub fn document(&self, database: &str, id: &str) -> Option<Document> {
        self.lock().get(database)?.get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Databases> {
        // Handle mutex poisoning by recovering the lock
        self.databases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn revision_number(rev: &str) -> u64 {
    rev.split('-')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_databases(&self) -> Result<Vec<String>, DocumentError> {
        Ok(self.lock().keys().cloned().collect())
    }

    async fn create_database(&self, name: &str) -> Result<(), DocumentError> {
        let mut databases = self.lock();
        if databases.contains_key(name) {
            return Err(DocumentError::AlreadyExists);
        }
        databases.insert(name.to_string(), HashMap::new());
        Ok(())
    }

    async fn get_document(&self, database: &str, id: &str) -> Result<Document, DocumentError> {
        self.document(database, id).ok_or(DocumentError::NotFound)
    }

    async fn put_document(
        &self,
        database: &str,
        id: &str,
        document: &Document,
    ) -> Result<(), DocumentError> {
        let mut databases = self.lock();
        let documents = databases.get_mut(database).ok_or(DocumentError::NotFound)?;

        let supplied = document.get(REV_FIELD).and_then(Value::as_str);
        let current = documents
            .get(id)
            .and_then(|doc| doc.get(REV_FIELD))
            .and_then(Value::as_str);

        let next = match (current, supplied) {
            (None, None) => 1,
            (Some(current), Some(supplied)) if current == supplied => revision_number(current) + 1,
            _ => {
                return Err(DocumentError::Conflict(
                    "conflict: Document update conflict.".to_string(),
                ))
            }
        };

        let mut stored = document.clone();
        stored.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        stored.insert(REV_FIELD.to_string(), Value::String(format!("{next}-memory")));
        documents.insert(id.to_string(), stored);
        Ok(())
    }
}
