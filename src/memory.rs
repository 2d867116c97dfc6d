//! MemoryEngine - an in-process [`StorageEngine`] with IndexedDB's shape
//!
//! Databases and stores keep insertion order, records are [`Record`] values
//! that can express what IndexedDB can hold but JSON cannot (binary content
//! and cyclic object graphs). The engine also counts the calls made against it
//! and can be told to fail or to suspend, which is how the inspector's own
//! tests observe handle discipline, failure handling and interleaving.

use crate::engine::{DatabaseHandle, DatabaseInfo, StorageEngine, StructuredClone};
use crate::InspectorError;
use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// A stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
	Null,
	Bool(bool),
	Number(Number),
	String(String),
	/// Binary content, comparable to a `Blob` or `ArrayBuffer`
	Bytes(Vec<u8>),
	List(Vec<Record>),
	Map(BTreeMap<String, Record>),
	/// A reference to a value that may be reachable from several places,
	/// including from inside itself
	Shared(Shared),
}

/// A shared, mutable record node. Cloning shares the node.
#[derive(Clone)]
pub struct Shared(Rc<RefCell<Record>>);

impl Shared {
	pub fn new(record: Record) -> Self {
		Self(Rc::new(RefCell::new(record)))
	}

	/// Replaces the node's contents. Used to close reference cycles.
	pub fn set(&self, record: Record) {
		*self.0.borrow_mut() = record;
	}
}

impl PartialEq for Shared {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for Shared {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Shared({:p})", Rc::as_ptr(&self.0))
	}
}

impl From<Value> for Record {
	fn from(value: Value) -> Self {
		match value {
			Value::Null => Record::Null,
			Value::Bool(b) => Record::Bool(b),
			Value::Number(n) => Record::Number(n),
			Value::String(s) => Record::String(s),
			Value::Array(items) => Record::List(items.into_iter().map(Record::from).collect()),
			Value::Object(fields) => Record::Map(
				fields
					.into_iter()
					.map(|(key, value)| (key, Record::from(value)))
					.collect(),
			),
		}
	}
}

impl StructuredClone for Record {
	fn structured_clone(&self) -> Result<Value, InspectorError> {
		let mut path = Vec::new();
		clone_record(self, &mut path)
	}
}

fn clone_record(
	record: &Record,
	path: &mut Vec<*const RefCell<Record>>,
) -> Result<Value, InspectorError> {
	Ok(match record {
		Record::Null => Value::Null,
		Record::Bool(b) => Value::Bool(*b),
		Record::Number(n) => Value::Number(n.clone()),
		Record::String(s) => Value::String(s.clone()),
		Record::Bytes(bytes) => {
			return Err(InspectorError::Serialization(format!(
				"{} bytes of binary content",
				bytes.len()
			)))
		}
		Record::List(items) => Value::Array(
			items
				.iter()
				.map(|item| clone_record(item, path))
				.collect::<Result<_, _>>()?,
		),
		Record::Map(fields) => {
			let mut out = Map::new();
			for (key, value) in fields {
				out.insert(key.clone(), clone_record(value, path)?);
			}
			Value::Object(out)
		}
		Record::Shared(shared) => {
			let node = Rc::as_ptr(&shared.0);
			if path.contains(&node) {
				return Err(InspectorError::Serialization(
					"circular reference".to_string(),
				));
			}
			path.push(node);
			let cloned = clone_record(&shared.0.borrow(), path);
			path.pop();
			cloned?
		}
	})
}

/// Call counters, used to verify handle discipline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
	pub listings: usize,
	pub opens: usize,
	pub closes: usize,
	pub counts: usize,
	pub fetches: usize,
	pub deletes: usize,
}

#[derive(Debug)]
struct MemoryDatabase {
	name: String,
	version: u64,
	stores: Vec<(String, Vec<Record>)>,
}

#[derive(Debug, Default)]
struct EngineState {
	databases: Vec<MemoryDatabase>,
	unavailable: Option<String>,
	failing_counts: Vec<(String, String)>,
	suspensions: Vec<((String, String), usize)>,
	stats: EngineStats,
}

impl EngineState {
	fn database(&self, name: &str) -> Option<&MemoryDatabase> {
		self.databases.iter().find(|db| db.name == name)
	}

	fn database_mut(&mut self, name: &str) -> &mut MemoryDatabase {
		let index = match self.databases.iter().position(|db| db.name == name) {
			Some(index) => index,
			None => {
				self.databases.push(MemoryDatabase {
					name: name.to_string(),
					version: 1,
					stores: Vec::new(),
				});
				self.databases.len() - 1
			}
		};
		&mut self.databases[index]
	}

	fn check_available(&self) -> Result<(), InspectorError> {
		match &self.unavailable {
			Some(reason) => Err(InspectorError::Unavailable(reason.clone())),
			None => Ok(()),
		}
	}
}

impl MemoryDatabase {
	fn store_mut(&mut self, name: &str) -> &mut Vec<Record> {
		let index = match self.stores.iter().position(|(store, _)| store == name) {
			Some(index) => index,
			None => {
				self.stores.push((name.to_string(), Vec::new()));
				self.stores.len() - 1
			}
		};
		&mut self.stores[index].1
	}
}

/// An in-process storage engine.
///
/// Clones share the same state, so a test can keep one clone to seed and
/// observe the engine while the inspector owns another.
///
/// # Examples
/// ```
/// use idb_inspector::MemoryEngine;
/// use serde_json::json;
///
/// let engine = MemoryEngine::new();
/// engine.insert("app", "users", json!({"id": 1}));
/// engine.create_store("app", "sessions");
///
/// assert_eq!(engine.database_names(), vec!["app".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
	state: Rc<RefCell<EngineState>>,
}

impl MemoryEngine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an empty database. An empty name models an unnamed entry.
	pub fn create_database(&self, name: &str) {
		self.state.borrow_mut().database_mut(name);
	}

	/// Creates an empty store, and its database if needed.
	pub fn create_store(&self, database: &str, store: &str) {
		self.state.borrow_mut().database_mut(database).store_mut(store);
	}

	/// Appends a record, creating the database and store if needed.
	pub fn insert(&self, database: &str, store: &str, record: impl Into<Record>) {
		self.state
			.borrow_mut()
			.database_mut(database)
			.store_mut(store)
			.push(record.into());
	}

	pub fn database_names(&self) -> Vec<String> {
		self.state
			.borrow()
			.databases
			.iter()
			.map(|db| db.name.clone())
			.collect()
	}

	/// Makes every engine call fail as if the storage API were missing.
	pub fn set_unavailable(&self, reason: Option<&str>) {
		self.state.borrow_mut().unavailable = reason.map(str::to_string);
	}

	/// Makes counting `store` in `database` fail.
	pub fn fail_count(&self, database: &str, store: &str) {
		self.state
			.borrow_mut()
			.failing_counts
			.push((database.to_string(), store.to_string()));
	}

	/// Makes counting `store` in `database` suspend `polls` times first.
	pub fn suspend_count(&self, database: &str, store: &str, polls: usize) {
		self.state
			.borrow_mut()
			.suspensions
			.push(((database.to_string(), store.to_string()), polls));
	}

	pub fn stats(&self) -> EngineStats {
		self.state.borrow().stats
	}

	/// Handles opened and not yet closed.
	pub fn open_handles(&self) -> usize {
		let stats = self.stats();
		stats.opens - stats.closes
	}
}

#[async_trait(?Send)]
impl StorageEngine for MemoryEngine {
	type Value = Record;
	type Handle = MemoryHandle;

	async fn databases(&self) -> Result<Vec<DatabaseInfo>, InspectorError> {
		let mut state = self.state.borrow_mut();
		state.stats.listings += 1;
		state.check_available()?;

		Ok(state
			.databases
			.iter()
			.map(|db| DatabaseInfo {
				name: db.name.clone(),
				version: db.version,
			})
			.collect())
	}

	async fn open(&self, name: &str) -> Result<MemoryHandle, InspectorError> {
		let mut state = self.state.borrow_mut();
		state.check_available()?;
		if state.database(name).is_none() {
			return Err(InspectorError::NotFound(format!("database '{}'", name)));
		}
		state.stats.opens += 1;

		Ok(MemoryHandle {
			name: name.to_string(),
			state: self.state.clone(),
		})
	}

	async fn delete_database(&self, name: &str) -> Result<(), InspectorError> {
		let mut state = self.state.borrow_mut();
		state.check_available()?;
		state.stats.deletes += 1;
		state.databases.retain(|db| db.name != name);
		Ok(())
	}
}

/// An open [`MemoryEngine`] database. Reads are live; dropping closes it.
#[derive(Debug)]
pub struct MemoryHandle {
	name: String,
	state: Rc<RefCell<EngineState>>,
}

impl MemoryHandle {
	fn with_store<T>(
		&self,
		store: &str,
		f: impl FnOnce(&[Record]) -> T,
	) -> Result<T, InspectorError> {
		let state = self.state.borrow();
		let database = state
			.database(&self.name)
			.ok_or_else(|| InspectorError::NotFound(format!("database '{}'", self.name)))?;
		let (_, records) = database
			.stores
			.iter()
			.find(|(name, _)| name == store)
			.ok_or_else(|| {
				InspectorError::NotFound(format!("store '{}' in '{}'", store, self.name))
			})?;
		Ok(f(records))
	}
}

#[async_trait(?Send)]
impl DatabaseHandle for MemoryHandle {
	type Value = Record;

	fn name(&self) -> &str {
		&self.name
	}

	async fn store_names(&self) -> Result<Vec<String>, InspectorError> {
		let state = self.state.borrow();
		Ok(state
			.database(&self.name)
			.map(|db| db.stores.iter().map(|(name, _)| name.clone()).collect())
			.unwrap_or_default())
	}

	async fn count(&self, store: &str) -> Result<u64, InspectorError> {
		let polls = {
			let mut state = self.state.borrow_mut();
			state.stats.counts += 1;
			let key = (self.name.clone(), store.to_string());
			if state.failing_counts.contains(&key) {
				return Err(InspectorError::engine(format!(
					"count failed for '{}' in '{}'",
					store, self.name
				)));
			}
			state
				.suspensions
				.iter()
				.find(|(k, _)| *k == key)
				.map(|(_, polls)| *polls)
				.unwrap_or(0)
		};

		Suspend { remaining: polls }.await;

		self.with_store(store, |records| records.len() as u64)
	}

	async fn get_all(&self, store: &str) -> Result<Record, InspectorError> {
		self.state.borrow_mut().stats.fetches += 1;
		self.with_store(store, |records| Record::List(records.to_vec()))
	}
}

impl Drop for MemoryHandle {
	fn drop(&mut self) {
		self.state.borrow_mut().stats.closes += 1;
	}
}

/// Returns `Pending` a fixed number of times before completing.
struct Suspend {
	remaining: usize,
}

impl Future for Suspend {
	type Output = ();

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		if self.remaining == 0 {
			return Poll::Ready(());
		}
		self.remaining -= 1;
		cx.waker().wake_by_ref();
		Poll::Pending
	}
}
