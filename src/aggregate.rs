//! Storage aggregation: one `(database, store, count)` row per object store.
//!
//! A refresh lists every database, opens the named ones concurrently, counts
//! each of their stores concurrently, and flattens the result. Row order is
//! structural (listing order, then store order) no matter which count
//! finishes first. A pass is all or nothing: any failure discards the pass
//! and marks the storage API as unsupported for the aggregator's lifetime.

use crate::engine::{DatabaseHandle, DatabaseInfo, StorageEngine};
use crate::InspectorError;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

/// One object store of one database, as seen by the last refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRow {
	pub database: String,
	pub store: String,
	/// Decimal record count
	pub objects: String,
}

impl StorageRow {
	pub fn new(database: impl Into<String>, store: impl Into<String>, objects: u64) -> Self {
		Self {
			database: database.into(),
			store: store.into(),
			objects: objects.to_string(),
		}
	}

	/// The record count as a number, `None` if `objects` is not a count.
	pub fn object_count(&self) -> Option<u64> {
		self.objects.parse().ok()
	}
}

/// The rows of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSet {
	rows: Vec<StorageRow>,
	taken_at: Option<DateTime<Utc>>,
}

impl RowSet {
	fn snapshot(rows: Vec<StorageRow>) -> Self {
		Self {
			rows,
			taken_at: Some(Utc::now()),
		}
	}

	pub fn rows(&self) -> &[StorageRow] {
		&self.rows
	}

	pub fn iter(&self) -> std::slice::Iter<'_, StorageRow> {
		self.rows.iter()
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// When the pass that produced these rows completed. `None` before the
	/// first successful refresh.
	pub fn taken_at(&self) -> Option<DateTime<Utc>> {
		self.taken_at
	}
}

impl<'a> IntoIterator for &'a RowSet {
	type Item = &'a StorageRow;
	type IntoIter = std::slice::Iter<'a, StorageRow>;

	fn into_iter(self) -> Self::IntoIter {
		self.rows.iter()
	}
}

/// What the presentation layer should do after a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// Rows were replaced and should be rendered.
	Updated,
	/// Storage is unsupported here; the panel should hide itself.
	Hidden,
}

/// Owns the current [`RowSet`] and the support flag.
#[derive(Debug)]
pub struct StorageAggregator {
	supported: bool,
	rows: RowSet,
}

impl Default for StorageAggregator {
	fn default() -> Self {
		Self::new()
	}
}

impl StorageAggregator {
	pub fn new() -> Self {
		Self {
			supported: true,
			rows: RowSet::default(),
		}
	}

	/// `false` once a refresh has failed. It never flips back.
	pub fn is_supported(&self) -> bool {
		self.supported
	}

	pub fn rows(&self) -> &RowSet {
		&self.rows
	}

	/// Runs one aggregation pass and replaces the current rows with it.
	///
	/// Once unsupported, this returns [`RefreshOutcome::Hidden`] without
	/// touching the engine. A failed pass leaves the previous rows in place.
	pub async fn refresh<E: StorageEngine>(&mut self, engine: &E) -> RefreshOutcome {
		if !self.supported {
			tracing::debug!("storage unsupported, skipping refresh");
			return RefreshOutcome::Hidden;
		}

		match collect_rows(engine).await {
			Ok(rows) => {
				tracing::debug!(
					rows = rows.len(),
					taken_at = ?rows.taken_at(),
					"storage refresh complete"
				);
				self.rows = rows;
				RefreshOutcome::Updated
			}
			Err(e) => {
				tracing::warn!(error = %e, "storage refresh failed, disabling inspector");
				self.supported = false;
				RefreshOutcome::Hidden
			}
		}
	}
}

/// Aggregates every store of every named database into a fresh [`RowSet`].
pub async fn collect_rows<E: StorageEngine>(engine: &E) -> Result<RowSet, InspectorError> {
	let databases = engine.databases().await?;

	let per_database = try_join_all(
		databases
			.iter()
			.filter(|info| !info.name.is_empty())
			.map(|info| collect_database(engine, info)),
	)
	.await?;

	Ok(RowSet::snapshot(per_database.into_iter().flatten().collect()))
}

async fn collect_database<E: StorageEngine>(
	engine: &E,
	info: &DatabaseInfo,
) -> Result<Vec<StorageRow>, InspectorError> {
	let handle = engine.open(&info.name).await?;
	let stores = handle.store_names().await?;

	let rows = try_join_all(stores.iter().map(|store| count_store(&handle, store))).await?;

	drop(handle);
	Ok(rows)
}

async fn count_store<H: DatabaseHandle>(
	handle: &H,
	store: &str,
) -> Result<StorageRow, InspectorError> {
	let count = handle.count(store).await?;
	Ok(StorageRow::new(handle.name(), store, count))
}
