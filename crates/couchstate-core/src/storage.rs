//! Host-facing storage API
//!
//! Hosts construct a [`Storage`], call [`Storage::init`] once at startup and
//! then use the typed get/save pairs. Calls made before a successful init
//! fail with [`StorageError::NotInitialized`].

use std::sync::{PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::bootstrap;
use crate::client::DocumentError;
use crate::config::ConnectionDescriptor;
use crate::connection::Connection;
use crate::error::{StorageError, StorageResult};
use crate::resource::LogicalResource;

/// Flows, credentials and settings storage backed by a document database
#[derive(Debug, Default)]
pub struct Storage {
    connection: RwLock<Option<Connection>>,
}

impl Storage {
    /// Create uninitialized storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage around an already established connection
    #[must_use]
    pub fn with_connection(connection: Connection) -> Self {
        Self {
            connection: RwLock::new(Some(connection)),
        }
    }

    /// Bootstrap from a JSON connection descriptor and publish the connection
    ///
    /// # Errors
    /// Returns [`StorageError::Config`] or [`StorageError::Connectivity`];
    /// on error any previously published connection is left in place.
    pub async fn init(&self, config: Option<&str>) -> StorageResult<()> {
        let connection = bootstrap::initialize(config).await?;
        self.publish(connection);
        Ok(())
    }

    /// Bootstrap from the descriptor in [`crate::CONFIG_ENV_VAR`]
    ///
    /// # Errors
    /// Same as [`Storage::init`].
    pub async fn init_from_env(&self) -> StorageResult<()> {
        let descriptor = ConnectionDescriptor::from_env()?;
        let connection = bootstrap::connect(&descriptor).await?;
        self.publish(connection);
        Ok(())
    }

    /// Check if a connection has been published
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The published connection
    ///
    /// # Errors
    /// Returns [`StorageError::NotInitialized`] before a successful init
    pub fn connection(&self) -> StorageResult<Connection> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StorageError::NotInitialized)
    }

    fn publish(&self, connection: Connection) {
        let mut guard = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(connection);
    }

    /// Read any resource as raw JSON
    ///
    /// # Errors
    /// Returns [`StorageError::NotInitialized`] or [`StorageError::Store`]
    pub async fn get(&self, resource: LogicalResource) -> StorageResult<Value> {
        self.connection()?.get(resource).await
    }

    /// Save any resource as raw JSON
    ///
    /// # Errors
    /// Returns [`StorageError::NotInitialized`] or [`StorageError::Store`]
    pub async fn save(&self, resource: LogicalResource, value: Value) -> StorageResult<()> {
        self.connection()?.save(resource, value).await
    }

    /// # Errors
    /// Returns [`StorageError::NotInitialized`] or [`StorageError::Store`],
    /// including when the stored flows are not an array
    pub async fn get_flows(&self) -> StorageResult<Vec<Value>> {
        let value = self.get(LogicalResource::Flows).await?;
        into_array(LogicalResource::Flows, value)
    }

    /// # Errors
    /// Returns [`StorageError::NotInitialized`] or [`StorageError::Store`]
    pub async fn save_flows(&self, flows: Vec<Value>) -> StorageResult<()> {
        self.save(LogicalResource::Flows, Value::Array(flows)).await
    }

    /// # Errors
    /// Returns [`StorageError::NotInitialized`] or [`StorageError::Store`],
    /// including when the stored credentials are not an object
    pub async fn get_credentials(&self) -> StorageResult<Map<String, Value>> {
        let value = self.get(LogicalResource::Credentials).await?;
        into_object(LogicalResource::Credentials, value)
    }

    /// # Errors
    /// Returns [`StorageError::NotInitialized`] or [`StorageError::Store`]
    pub async fn save_credentials(&self, credentials: Map<String, Value>) -> StorageResult<()> {
        self.save(LogicalResource::Credentials, Value::Object(credentials))
            .await
    }

    /// # Errors
    /// Returns [`StorageError::NotInitialized`] or [`StorageError::Store`],
    /// including when the stored settings are not an object
    pub async fn get_settings(&self) -> StorageResult<Map<String, Value>> {
        let value = self.get(LogicalResource::Settings).await?;
        into_object(LogicalResource::Settings, value)
    }

    /// # Errors
    /// Returns [`StorageError::NotInitialized`] or [`StorageError::Store`]
    pub async fn save_settings(&self, settings: Map<String, Value>) -> StorageResult<()> {
        self.save(LogicalResource::Settings, Value::Object(settings))
            .await
    }
}

fn into_array(resource: LogicalResource, value: Value) -> StorageResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(shape_error(resource, "an array", &other)),
    }
}

fn into_object(resource: LogicalResource, value: Value) -> StorageResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(shape_error(resource, "an object", &other)),
    }
}

fn shape_error(resource: LogicalResource, expected: &str, found: &Value) -> StorageError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    StorageError::store(
        "getting",
        resource.document_id(),
        DocumentError::Decode(format!(
            "field '{}' holds {found}, expected {expected}",
            resource.field_name()
        )),
    )
}
