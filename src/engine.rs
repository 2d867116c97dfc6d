//! The storage engine capability the inspector reflects over.
//!
//! The inspector never owns the data it shows. Everything it knows comes from
//! a [`StorageEngine`] handed to it by the host, so the browser's IndexedDB
//! ([`WebEngine`](crate::WebEngine), `web` feature) and the in-process
//! [`MemoryEngine`](crate::MemoryEngine) are interchangeable.
//!
//! All calls are asynchronous and may suspend. The futures are not `Send`:
//! the inspector runs on a single cooperative thread, like the page it lives in.

use crate::InspectorError;
use async_trait::async_trait;

/// One entry of the engine's database listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
	/// Database name. Engines may report unnamed entries as an empty string.
	pub name: String,
	pub version: u64,
}

/// A named-database storage engine.
#[async_trait(?Send)]
pub trait StorageEngine {
	/// The engine's native representation of fetched records.
	type Value: StructuredClone;

	/// An open database. Dropping it closes the connection.
	type Handle: DatabaseHandle<Value = Self::Value>;

	/// Lists every database visible to the runtime, in engine order.
	async fn databases(&self) -> Result<Vec<DatabaseInfo>, InspectorError>;

	/// Opens an existing database by name.
	async fn open(&self, name: &str) -> Result<Self::Handle, InspectorError>;

	/// Deletes a whole database, every store included.
	async fn delete_database(&self, name: &str) -> Result<(), InspectorError>;
}

/// A connection to one database.
///
/// Implementations close the underlying connection in `Drop`, which makes
/// closing unconditional on every exit path of the code holding the handle.
#[async_trait(?Send)]
pub trait DatabaseHandle {
	type Value;

	fn name(&self) -> &str;

	/// Object store names in the engine's enumeration order.
	async fn store_names(&self) -> Result<Vec<String>, InspectorError>;

	/// Number of records in `store`.
	async fn count(&self, store: &str) -> Result<u64, InspectorError>;

	/// Every record in `store`, as one engine value.
	async fn get_all(&self, store: &str) -> Result<Self::Value, InspectorError>;
}

/// A deep copy that only succeeds for plain, acyclic data.
pub trait StructuredClone {
	/// Returns a detached JSON copy, or an error when the value holds binary
	/// content, cycles, or anything else JSON cannot express.
	fn structured_clone(&self) -> Result<serde_json::Value, InspectorError>;
}

impl StructuredClone for serde_json::Value {
	fn structured_clone(&self) -> Result<serde_json::Value, InspectorError> {
		Ok(self.clone())
	}
}
