//! Which row is selected, and what can be done with it.

use crate::aggregate::StorageRow;
use crate::engine::{DatabaseHandle, StorageEngine};
use crate::viewer::{Detail, DetailViewer};
use crate::InspectorError;

/// Selection state. A selection is a copy of the row, never a reference into
/// the [`RowSet`](crate::RowSet) it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
	#[default]
	Unselected,
	Selected(StorageRow),
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
	state: Selection,
}

impl SelectionController {
	pub fn new() -> Self {
		Self::default()
	}

	/// Selects `row`, replacing any previous selection.
	pub fn pick(&mut self, row: StorageRow) {
		self.state = Selection::Selected(row);
	}

	/// Clears the selection. A no-op when nothing is selected.
	pub fn deselect(&mut self) {
		self.state = Selection::Unselected;
	}

	pub fn state(&self) -> &Selection {
		&self.state
	}

	pub fn selected(&self) -> Option<&StorageRow> {
		match &self.state {
			Selection::Selected(row) => Some(row),
			Selection::Unselected => None,
		}
	}

	/// Whether the "view detail" affordance should be enabled.
	pub fn detail_enabled(&self) -> bool {
		self.selected().is_some()
	}

	/// Fetches every record of the selected store and hands it to `viewer`.
	///
	/// Returns `Ok(false)` without touching the engine when nothing is
	/// selected or there is no viewer. The database is opened afresh and
	/// closed before returning, whatever happens.
	pub async fn view_detail<E: StorageEngine>(
		&self,
		engine: &E,
		viewer: Option<&mut dyn DetailViewer<E::Value>>,
	) -> Result<bool, InspectorError> {
		let Some(row) = self.selected() else {
			return Ok(false);
		};
		let Some(viewer) = viewer else {
			tracing::debug!("no detail viewer available");
			return Ok(false);
		};

		let value = fetch_store(engine, &row.database, &row.store).await?;
		let detail = Detail::from_value(value);
		tracing::debug!(
			database = %row.database,
			store = %row.store,
			kind = detail.kind(),
			"showing store detail"
		);

		viewer.set(detail);
		viewer.activate();
		Ok(true)
	}
}

async fn fetch_store<E: StorageEngine>(
	engine: &E,
	database: &str,
	store: &str,
) -> Result<E::Value, InspectorError> {
	let handle = engine.open(database).await?;
	let value = handle.get_all(store).await?;
	drop(handle);
	Ok(value)
}
