//! Connection bootstrap
//!
//! Parses the connection descriptor, binds a client to the server and makes
//! sure the application database exists. Nothing is returned (or
//! published) unless every step succeeds.

use std::sync::Arc;

use tracing::{debug, info};

use crate::client::{CouchClient, DocumentError, DocumentStore};
use crate::config::ConnectionDescriptor;
use crate::connection::Connection;
use crate::error::{StorageError, StorageResult};

/// Parse `source` as a connection descriptor and connect to it
///
/// # Errors
/// Returns [`StorageError::Config`] if the descriptor is missing, malformed
/// or incomplete (no request is made in that case), and
/// [`StorageError::Connectivity`] if the server cannot be reached or refuses
/// to list or create databases.
pub async fn initialize(source: Option<&str>) -> StorageResult<Connection> {
    let descriptor = ConnectionDescriptor::from_json(source)?;
    connect(&descriptor).await
}

/// Connect to the server a descriptor points at
///
/// # Errors
/// Returns [`StorageError::Connectivity`] if the URL is unusable or the
/// database cannot be listed or created.
pub async fn connect(descriptor: &ConnectionDescriptor) -> StorageResult<Connection> {
    debug!("Connecting to {}", descriptor.redacted_url());
    let client = CouchClient::new(&descriptor.url).map_err(StorageError::Connectivity)?;
    bootstrap(Arc::new(client), &descriptor.database_name).await
}

/// Ensure `database` exists in `store` and return a connection to it
///
/// # Errors
/// Returns [`StorageError::Connectivity`] if listing or creating the
/// database fails.
pub async fn bootstrap(
    store: Arc<dyn DocumentStore>,
    database: &str,
) -> StorageResult<Connection> {
    ensure_database(store.as_ref(), database)
        .await
        .map_err(StorageError::Connectivity)?;

    info!("Using database '{database}'");
    Ok(Connection::new(store, database))
}

/// Create `database` unless it is already listed. Listing and creating are
/// separate requests, so a create that reports the database as existing
/// means another process won the race and counts as success.
async fn ensure_database(store: &dyn DocumentStore, database: &str) -> Result<(), DocumentError> {
    let existing = store.list_databases().await?;
    if existing.iter().any(|name| name == database) {
        return Ok(());
    }

    match store.create_database(database).await {
        Ok(()) => {
            info!("Database '{database}' created successfully");
            Ok(())
        }
        Err(DocumentError::AlreadyExists) => {
            debug!("Database '{database}' was created concurrently");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
