//! IndexedDbPanel - the inspector tool itself
//!
//! Ties the pieces together the way a user drives them:
//!
//! ```text
//! show() / Refresh ──► StorageAggregator ──► RowSet ──► grid (copy)
//!                           │
//!                     (unsupported) ──► hide mount
//!
//! grid select/deselect ──► SelectionController ──► show-detail enabled?
//! ShowDetail ──► fetch selected store ──► viewer.set() + activate()
//! ClearDatabase ──► confirm ──► delete database ──► refresh
//! ```

use crate::aggregate::{RefreshOutcome, RowSet, StorageAggregator};
use crate::config::PanelConfig;
use crate::destructive::{delete_selected, DeleteOutcome};
use crate::engine::StorageEngine;
use crate::grid::{sync_rows, DisplayGrid, GridEvent};
use crate::host::{HostServices, MountPoint, NotifyStyle, Tool};
use crate::namespace::ClassNamespacer;
use crate::selection::SelectionController;
use crate::viewer::DetailViewer;
use crate::InspectorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

const TEMPLATE: &str = r#"<div class="actions" style="display:flex;gap:4px;margin:10px">
  <h2>IndexedDB</h2>
  <span style="flex:1"></span>
  <div class="btn refresh-databases">
    <span class="icon icon-refresh"></span>
  </div>
  <div class="btn show-detail btn-disabled">
    <span class="icon icon-eye"></span>
  </div>
  <div class="btn clear-database">
    <span class="icon icon-clear"></span>
  </div>
</div>
<div class="data-grid" style="margin:10px"></div>"#;

const GRID_CONTAINER: &str = ".data-grid";
const DISABLED: &str = "btn-disabled";

/// A toolbar button of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
	Refresh,
	ShowDetail,
	ClearDatabase,
}

impl PanelAction {
	pub const ALL: [PanelAction; 3] = [
		PanelAction::Refresh,
		PanelAction::ShowDetail,
		PanelAction::ClearDatabase,
	];

	/// The button's class before namespacing.
	pub fn class(self) -> &'static str {
		match self {
			PanelAction::Refresh => "refresh-databases",
			PanelAction::ShowDetail => "show-detail",
			PanelAction::ClearDatabase => "clear-database",
		}
	}

	/// The selector a host binds the button's click handler to.
	pub fn selector(self, namespacer: &ClassNamespacer) -> String {
		namespacer.namespace(&format!(".{}", self.class()))
	}
}

/// The IndexedDB inspector panel.
///
/// The panel owns its rows and selection. The host owns the mount point,
/// the grid, and the other services lent at [`Tool::init`].
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use idb_inspector::{IndexedDbPanel, MemoryEngine, PanelConfig};
/// use serde_json::json;
///
/// let engine = MemoryEngine::new();
/// engine.insert("app", "users", json!({"id": 1}));
///
/// let mut panel = IndexedDbPanel::new(engine, PanelConfig::default()).unwrap();
/// block_on(panel.refresh());
///
/// assert_eq!(panel.rows().len(), 1);
/// assert_eq!(panel.rows().rows()[0].objects, "1");
/// ```
pub struct IndexedDbPanel<E: StorageEngine> {
	config: PanelConfig,
	namespacer: ClassNamespacer,
	engine: E,
	aggregator: StorageAggregator,
	selection: SelectionController,
	mount: Option<Box<dyn MountPoint>>,
	grid: Option<Box<dyn DisplayGrid>>,
	services: Option<HostServices<E::Value>>,
}

impl<E: StorageEngine> IndexedDbPanel<E> {
	pub fn new(engine: E, config: PanelConfig) -> Result<Self, InspectorError> {
		config.validate()?;

		Ok(Self {
			namespacer: ClassNamespacer::new(config.class_prefix.clone()),
			config,
			engine,
			aggregator: StorageAggregator::new(),
			selection: SelectionController::new(),
			mount: None,
			grid: None,
			services: None,
		})
	}

	pub fn config(&self) -> &PanelConfig {
		&self.config
	}

	pub fn namespacer(&self) -> &ClassNamespacer {
		&self.namespacer
	}

	pub fn engine(&self) -> &E {
		&self.engine
	}

	pub fn rows(&self) -> &RowSet {
		self.aggregator.rows()
	}

	/// When the rows on display were read. Survives failed refreshes.
	pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
		self.aggregator.rows().taken_at()
	}

	pub fn selection(&self) -> &SelectionController {
		&self.selection
	}

	pub fn is_supported(&self) -> bool {
		self.aggregator.is_supported()
	}

	/// The panel's markup, namespaced.
	pub fn markup(&self) -> String {
		self.namespacer.namespace(TEMPLATE)
	}

	/// Re-reads every database and store and re-renders the grid.
	///
	/// Always clears the selection first: it may point at a store that no
	/// longer exists.
	pub async fn refresh(&mut self) -> RefreshOutcome {
		self.selection.deselect();
		self.update_buttons();

		let outcome = self.aggregator.refresh(&self.engine).await;
		match outcome {
			RefreshOutcome::Updated => {
				if let Some(grid) = self.grid.as_deref_mut() {
					sync_rows(grid, self.aggregator.rows());
				}
			}
			RefreshOutcome::Hidden => {
				if let Some(mount) = self.mount.as_deref_mut().filter(|mount| mount.is_visible()) {
					tracing::info!(tool = %self.config.name, "storage unavailable, hiding panel");
					mount.hide();
				}
			}
		}
		outcome
	}

	/// Runs the action behind a toolbar button.
	///
	/// Failures are logged; the panel never renders errors.
	pub async fn handle(&mut self, action: PanelAction) {
		match action {
			PanelAction::Refresh => {
				if let Some(services) = self.services.as_mut() {
					services
						.notifier
						.notify(&self.config.refreshed_message, NotifyStyle::Success);
				}
				self.refresh().await;
			}
			PanelAction::ShowDetail => {
				if let Err(e) = self.view_detail().await {
					tracing::warn!(error = %e, "failed to load store detail");
				}
			}
			PanelAction::ClearDatabase => {
				if let Err(e) = self.clear_database().await {
					tracing::warn!(error = %e, "failed to delete database");
				}
			}
		}
	}

	/// Applies a selection change reported by the grid.
	pub fn on_grid_event(&mut self, event: GridEvent) {
		match event {
			GridEvent::Select(row) => self.selection.pick(row),
			GridEvent::Deselect => self.selection.deselect(),
		}
		self.update_buttons();
	}

	/// Shows the selected store's contents in the host's viewer.
	///
	/// Returns whether anything was shown.
	pub async fn view_detail(&mut self) -> Result<bool, InspectorError> {
		let viewer: Option<&mut dyn DetailViewer<E::Value>> = match self.services.as_mut() {
			Some(HostServices {
				viewer: Some(viewer),
				..
			}) => Some(viewer.as_mut()),
			_ => None,
		};
		self.selection.view_detail(&self.engine, viewer).await
	}

	/// Deletes the selected row's database after confirmation, then refreshes.
	pub async fn clear_database(&mut self) -> Result<DeleteOutcome, InspectorError> {
		let Some(services) = self.services.as_ref() else {
			return Ok(DeleteOutcome::NothingSelected);
		};

		let outcome =
			delete_selected(&self.selection, &self.engine, services.prompter.as_ref()).await?;
		if let DeleteOutcome::Deleted(_) = outcome {
			self.refresh().await;
		}
		Ok(outcome)
	}

	fn update_buttons(&mut self) {
		let Some(mount) = self.mount.as_deref_mut() else {
			return;
		};
		let selector = PanelAction::ShowDetail.selector(&self.namespacer);
		let disabled = self.namespacer.namespace(DISABLED);
		mount.set_class(&selector, &disabled, !self.selection.detail_enabled());
	}
}

#[async_trait(?Send)]
impl<E: StorageEngine> Tool for IndexedDbPanel<E> {
	type Services = HostServices<E::Value>;

	fn name(&self) -> &str {
		&self.config.name
	}

	fn init(
		&mut self,
		mut mount: Box<dyn MountPoint>,
		services: HostServices<E::Value>,
	) -> Result<(), InspectorError> {
		mount.set_html(&self.markup());

		let container = self.namespacer.namespace(GRID_CONTAINER);
		self.grid = Some(services.grids.create(&container, self.config.grid_options()));
		self.mount = Some(mount);
		self.services = Some(services);
		self.update_buttons();

		tracing::debug!(tool = %self.config.name, "panel initialised");
		Ok(())
	}

	/// Once storage is known to be unsupported the mount is left hidden.
	async fn show(&mut self) {
		if self.is_supported() {
			if let Some(mount) = self.mount.as_deref_mut() {
				mount.show();
			}
		}
		self.refresh().await;
	}

	fn hide(&mut self) {
		if let Some(mount) = self.mount.as_deref_mut() {
			mount.hide();
		}
	}

	fn destroy(&mut self) {
		self.selection.deselect();
		self.grid = None;
		self.services = None;
		self.mount = None;
	}
}
