//! Panel configuration, with defaults matching the stock eruda tool.

use crate::grid::{ColumnDef, GridOptions};
use crate::namespace::ClassNamespacer;
use crate::InspectorError;
use serde::Deserialize;

/// Configuration for the inspector panel.
///
/// Every field has a default, so a host only passes what it wants to change:
///
/// ```
/// use idb_inspector::PanelConfig;
///
/// let config = PanelConfig::from_json(r#"{ "class_prefix": "dbg-" }"#).unwrap();
/// assert_eq!(config.class_prefix, "dbg-");
/// assert_eq!(config.name, "IndexedDB");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
	/// Name the tool is registered under.
	pub name: String,
	/// Prefix applied to every CSS class the panel renders.
	pub class_prefix: String,
	/// Grid columns, in display order.
	pub columns: Vec<ColumnDef>,
	/// Grid height bounds, in pixels.
	pub min_height: u32,
	pub max_height: u32,
	/// Toast shown after a manual refresh.
	pub refreshed_message: String,
}

impl Default for PanelConfig {
	fn default() -> Self {
		Self {
			name: "IndexedDB".to_string(),
			class_prefix: "eruda-".to_string(),
			columns: vec![
				ColumnDef::new("database", "Database", 30),
				ColumnDef::new("store", "Store", 60),
				ColumnDef::new("objects", "Objects", 20),
			],
			min_height: 60,
			max_height: 223,
			refreshed_message: "Refreshed".to_string(),
		}
	}
}

impl PanelConfig {
	/// Parses and validates a JSON configuration object.
	pub fn from_json(json: &str) -> Result<Self, InspectorError> {
		let config: PanelConfig =
			serde_json::from_str(json).map_err(|e| InspectorError::Config(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), InspectorError> {
		if self.name.trim().is_empty() {
			return Err(InspectorError::Config("name must not be empty".into()));
		}
		if !ClassNamespacer::is_valid_prefix(&self.class_prefix) {
			return Err(InspectorError::Config(format!(
				"class_prefix `{}` must be a non-empty run of letters, digits, `_` or `-`",
				self.class_prefix
			)));
		}
		if self.columns.is_empty() {
			return Err(InspectorError::Config("at least one column is required".into()));
		}
		if self.min_height > self.max_height {
			return Err(InspectorError::Config(format!(
				"min_height {} exceeds max_height {}",
				self.min_height, self.max_height
			)));
		}
		Ok(())
	}

	pub fn grid_options(&self) -> GridOptions {
		GridOptions {
			columns: self.columns.clone(),
			min_height: self.min_height,
			max_height: self.max_height,
		}
	}
}
