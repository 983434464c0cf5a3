//! couchstate core - document-backed storage for host application state
//!
//! Persists the host's flows, credentials and settings as fields of
//! documents in a CouchDB-compatible database. A [`Connection`] is produced
//! by the bootstrapper in [`bootstrap`] and threaded into every resource
//! call; [`Storage`] wraps it in the init-then-use shape hosts expect.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_panics_doc)]

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod resource;
pub mod storage;

pub use bootstrap::initialize;
pub use client::{CouchClient, Document, DocumentError, DocumentStore, MemoryStore};
pub use config::{ConnectionDescriptor, CONFIG_ENV_VAR};
pub use connection::Connection;
pub use error::{ConfigError, StorageError, StorageResult};
pub use resource::LogicalResource;
pub use storage::Storage;
