//! Contract for the table widget that displays a [`RowSet`].
//!
//! The widget is owned by the host. The panel only ever pushes copies of its
//! rows into it ([`sync_rows`]) and receives selection changes back as
//! [`GridEvent`]s.

use crate::aggregate::{RowSet, StorageRow};
use serde::{Deserialize, Serialize};

/// One column of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
	/// Field of [`StorageRow`] shown in this column
	pub id: String,
	pub title: String,
	/// Relative width
	pub weight: u32,
}

impl ColumnDef {
	pub fn new(id: &str, title: &str, weight: u32) -> Self {
		Self {
			id: id.to_string(),
			title: title.to_string(),
			weight,
		}
	}
}

/// Construction options for a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridOptions {
	pub columns: Vec<ColumnDef>,
	pub min_height: u32,
	pub max_height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendOptions {
	pub selectable: bool,
}

/// A table widget.
pub trait DisplayGrid {
	/// Removes every row.
	fn clear(&mut self);

	/// Appends a copy of `row`.
	fn append(&mut self, row: &StorageRow, options: AppendOptions);
}

/// Builds grids inside the panel's mount point.
pub trait GridFactory {
	/// `container` is the (namespaced) selector of the element to render into.
	fn create(&self, container: &str, options: GridOptions) -> Box<dyn DisplayGrid>;
}

/// A selection change reported by the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridEvent {
	Select(StorageRow),
	Deselect,
}

/// Replaces the grid's contents with `rows`, in order, each selectable.
pub fn sync_rows(grid: &mut dyn DisplayGrid, rows: &RowSet) {
	grid.clear();
	for row in rows {
		grid.append(row, AppendOptions { selectable: true });
	}
}
