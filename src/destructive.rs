//! Deleting the database behind the selected row.
//!
//! Selection is per store but deletion is per database: confirming removes
//! every store of the selected row's database.

use crate::engine::StorageEngine;
use crate::host::Prompter;
use crate::selection::SelectionController;
use crate::InspectorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
	NothingSelected,
	/// The user answered no
	Declined,
	/// The named database was deleted
	Deleted(String),
}

pub fn confirmation_message(database: &str) -> String {
	format!(
		"Are you sure that you want to delete the '{}' database?",
		database
	)
}

/// Asks the user, then deletes the selected row's whole database.
///
/// Only the prompt is consulted before the user agrees; nothing reaches the
/// engine on a decline.
pub async fn delete_selected<E: StorageEngine>(
	selection: &SelectionController,
	engine: &E,
	prompter: &dyn Prompter,
) -> Result<DeleteOutcome, InspectorError> {
	let Some(row) = selection.selected() else {
		return Ok(DeleteOutcome::NothingSelected);
	};

	if !prompter.confirm(&confirmation_message(&row.database)).await {
		return Ok(DeleteOutcome::Declined);
	}

	engine.delete_database(&row.database).await?;
	tracing::info!(database = %row.database, "deleted database");

	Ok(DeleteOutcome::Deleted(row.database.clone()))
}
