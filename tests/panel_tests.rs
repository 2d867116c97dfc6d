//! End-to-end tests for IndexedDbPanel driven the way a host drives it,
//! over a MemoryEngine and recording stand-ins for the host's services.

use async_trait::async_trait;
use futures::executor::block_on;
use idb_inspector::{
	AppendOptions, Detail, DetailViewer, DisplayGrid, GridEvent, GridFactory, GridOptions,
	HostServices, IndexedDbPanel, MemoryEngine, MountPoint, Notifier, NotifyStyle, PanelAction,
	PanelConfig, Prompter, Record, RefreshOutcome, StorageRow, Tool,
};
use serde_json::json;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

// =============================================================================
// Recording host
// =============================================================================

#[derive(Default)]
struct HostLog {
	html: Option<String>,
	visible: bool,
	shows: usize,
	hides: usize,
	classes: HashMap<(String, String), bool>,
	grid: Option<(String, GridOptions)>,
	grid_rows: Vec<(StorageRow, AppendOptions)>,
	grid_clears: usize,
	notices: Vec<(String, NotifyStyle)>,
	answer: bool,
	prompts: Vec<String>,
	shown: Vec<Detail<Record>>,
	activations: usize,
}

type Log = Rc<RefCell<HostLog>>;

struct FakeMount(Log);

impl MountPoint for FakeMount {
	fn set_html(&mut self, markup: &str) {
		self.0.borrow_mut().html = Some(markup.to_string());
	}

	fn show(&mut self) {
		let mut log = self.0.borrow_mut();
		log.visible = true;
		log.shows += 1;
	}

	fn hide(&mut self) {
		let mut log = self.0.borrow_mut();
		log.visible = false;
		log.hides += 1;
	}

	fn is_visible(&self) -> bool {
		self.0.borrow().visible
	}

	fn set_class(&mut self, selector: &str, class: &str, enabled: bool) {
		self.0
			.borrow_mut()
			.classes
			.insert((selector.to_string(), class.to_string()), enabled);
	}
}

struct FakeGrid(Log);

impl DisplayGrid for FakeGrid {
	fn clear(&mut self) {
		let mut log = self.0.borrow_mut();
		log.grid_clears += 1;
		log.grid_rows.clear();
	}

	fn append(&mut self, row: &StorageRow, options: AppendOptions) {
		self.0.borrow_mut().grid_rows.push((row.clone(), options));
	}
}

struct FakeGrids(Log);

impl GridFactory for FakeGrids {
	fn create(&self, container: &str, options: GridOptions) -> Box<dyn DisplayGrid> {
		self.0.borrow_mut().grid = Some((container.to_string(), options));
		Box::new(FakeGrid(self.0.clone()))
	}
}

struct FakePrompter(Log);

#[async_trait(?Send)]
impl Prompter for FakePrompter {
	async fn confirm(&self, message: &str) -> bool {
		let mut log = self.0.borrow_mut();
		log.prompts.push(message.to_string());
		log.answer
	}
}

struct FakeNotifier(Log);

impl Notifier for FakeNotifier {
	fn notify(&mut self, message: &str, style: NotifyStyle) {
		self.0.borrow_mut().notices.push((message.to_string(), style));
	}
}

struct FakeViewer(Log);

impl DetailViewer<Record> for FakeViewer {
	fn set(&mut self, detail: Detail<Record>) {
		self.0.borrow_mut().shown.push(detail);
	}

	fn activate(&mut self) {
		self.0.borrow_mut().activations += 1;
	}
}

fn services(log: &Log, with_viewer: bool) -> HostServices<Record> {
	HostServices {
		grids: Box::new(FakeGrids(log.clone())),
		prompter: Box::new(FakePrompter(log.clone())),
		notifier: Box::new(FakeNotifier(log.clone())),
		viewer: if with_viewer {
			Some(Box::new(FakeViewer(log.clone())))
		} else {
			None
		},
	}
}

fn seeded_engine() -> MemoryEngine {
	let engine = MemoryEngine::new();
	for i in 0..3 {
		engine.insert("A", "x", json!({ "id": i }));
	}
	engine.create_store("A", "y");
	for i in 0..5 {
		engine.insert("B", "z", json!(i));
	}
	engine
}

fn mounted(engine: &MemoryEngine, with_viewer: bool) -> (IndexedDbPanel<MemoryEngine>, Log) {
	let log: Log = Rc::new(RefCell::new(HostLog::default()));
	let mut panel = IndexedDbPanel::new(engine.clone(), PanelConfig::default()).unwrap();
	panel
		.init(Box::new(FakeMount(log.clone())), services(&log, with_viewer))
		.unwrap();
	(panel, log)
}

fn detail_disabled(log: &Log) -> Option<bool> {
	log.borrow()
		.classes
		.get(&(
			".eruda-show-detail".to_string(),
			"eruda-btn-disabled".to_string(),
		))
		.copied()
}

fn grid_pairs(log: &Log) -> Vec<(String, String, String)> {
	log.borrow()
		.grid_rows
		.iter()
		.map(|(row, _)| (row.database.clone(), row.store.clone(), row.objects.clone()))
		.collect()
}

fn triple(database: &str, store: &str, objects: &str) -> (String, String, String) {
	(database.to_string(), store.to_string(), objects.to_string())
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_init_mounts_namespaced_markup_and_grid() {
	let engine = seeded_engine();
	let (panel, log) = mounted(&engine, true);

	assert_eq!(panel.name(), "IndexedDB");

	let log_ref = log.borrow();
	let html = log_ref.html.as_deref().unwrap();
	assert!(html.contains(r#"class="eruda-btn eruda-refresh-databases""#));
	assert!(html.contains(r#"class="eruda-icon eruda-icon-eye""#));

	let (container, options) = log_ref.grid.clone().unwrap();
	assert_eq!(container, ".eruda-data-grid");
	assert_eq!(options, PanelConfig::default().grid_options());
	drop(log_ref);

	assert_eq!(detail_disabled(&log), Some(true));
	assert_eq!(engine.stats().listings, 0, "init must not query storage");
}

#[test]
fn test_show_renders_rows_in_structural_order() {
	let engine = seeded_engine();
	engine.suspend_count("A", "x", 4);
	let (mut panel, log) = mounted(&engine, true);

	block_on(panel.show());

	assert!(log.borrow().visible);
	assert_eq!(
		grid_pairs(&log),
		vec![triple("A", "x", "3"), triple("A", "y", "0"), triple("B", "z", "5")]
	);
	assert!(log
		.borrow()
		.grid_rows
		.iter()
		.all(|(_, options)| options.selectable));
	assert_eq!(engine.open_handles(), 0);
}

#[test]
fn test_hide_and_destroy() {
	let engine = seeded_engine();
	let (mut panel, log) = mounted(&engine, true);

	block_on(panel.show());
	panel.hide();
	assert!(!log.borrow().visible);

	panel.on_grid_event(GridEvent::Select(StorageRow::new("A", "x", 3)));
	panel.destroy();
	assert!(!panel.selection().detail_enabled());

	// Rows survive; only the host's objects are released
	assert_eq!(panel.rows().len(), 3);
	assert_eq!(Rc::strong_count(&log), 1);
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_selection_toggles_detail_button() {
	let engine = seeded_engine();
	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());

	panel.on_grid_event(GridEvent::Select(StorageRow::new("B", "z", 5)));
	assert_eq!(detail_disabled(&log), Some(false));
	assert_eq!(
		panel.selection().selected(),
		Some(&StorageRow::new("B", "z", 5))
	);

	panel.on_grid_event(GridEvent::Deselect);
	assert_eq!(detail_disabled(&log), Some(true));
	assert_eq!(panel.selection().selected(), None);
}

#[test]
fn test_refresh_drops_selection_even_if_row_reappears() {
	let engine = seeded_engine();
	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());

	panel.on_grid_event(GridEvent::Select(StorageRow::new("A", "x", 3)));
	assert_eq!(block_on(panel.refresh()), RefreshOutcome::Updated);

	assert!(panel.rows().rows().contains(&StorageRow::new("A", "x", 3)));
	assert_eq!(panel.selection().selected(), None);
	assert_eq!(detail_disabled(&log), Some(true));
}

#[test]
fn test_failed_refresh_also_drops_selection() {
	let engine = seeded_engine();
	let (mut panel, _log) = mounted(&engine, true);

	panel.on_grid_event(GridEvent::Select(StorageRow::new("A", "x", 3)));
	engine.set_unavailable(Some("blocked"));

	assert_eq!(block_on(panel.refresh()), RefreshOutcome::Hidden);
	assert_eq!(panel.selection().selected(), None);
}

#[test]
fn test_last_refreshed_survives_failed_refresh() {
	let engine = seeded_engine();
	let (mut panel, _log) = mounted(&engine, true);
	assert_eq!(panel.last_refreshed(), None);

	block_on(panel.refresh());
	let refreshed = panel.last_refreshed();
	assert!(refreshed.is_some());

	engine.fail_count("B", "z");
	assert_eq!(block_on(panel.refresh()), RefreshOutcome::Hidden);
	assert_eq!(panel.last_refreshed(), refreshed);
}

// =============================================================================
// Refresh
// =============================================================================

#[test]
fn test_manual_refresh_notifies_and_picks_up_changes() {
	let engine = seeded_engine();
	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());

	engine.insert("C", "late", json!(true));
	block_on(panel.handle(PanelAction::Refresh));

	assert_eq!(
		log.borrow().notices,
		vec![("Refreshed".to_string(), NotifyStyle::Success)]
	);
	assert_eq!(grid_pairs(&log).len(), 4);
	assert_eq!(grid_pairs(&log)[3], triple("C", "late", "1"));
	assert_eq!(log.borrow().grid_clears, 2);
}

#[test]
fn test_unsupported_storage_hides_panel_for_good() {
	let engine = seeded_engine();
	engine.set_unavailable(Some("indexedDB is undefined"));
	let (mut panel, log) = mounted(&engine, true);

	block_on(panel.show());

	assert!(!panel.is_supported());
	assert!(!log.borrow().visible);
	assert!(panel.rows().is_empty());
	assert_eq!(log.borrow().grid_clears, 0);
	assert_eq!(engine.stats().listings, 1);

	engine.set_unavailable(None);
	block_on(panel.show());
	assert!(!log.borrow().visible);
	assert_eq!(engine.stats().listings, 1);
}

#[test]
fn test_unsupported_panel_is_not_shown_again() {
	let engine = seeded_engine();
	engine.set_unavailable(Some("indexedDB is undefined"));
	let (mut panel, log) = mounted(&engine, true);

	block_on(panel.show());
	assert_eq!((log.borrow().shows, log.borrow().hides), (1, 1));

	block_on(panel.show());
	block_on(panel.handle(PanelAction::Refresh));
	assert_eq!((log.borrow().shows, log.borrow().hides), (1, 1));
	assert!(!log.borrow().visible);
}

// =============================================================================
// Detail view
// =============================================================================

#[test]
fn test_show_detail_forwards_structured_contents() {
	let engine = seeded_engine();
	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());

	panel.on_grid_event(GridEvent::Select(StorageRow::new("A", "x", 3)));
	block_on(panel.handle(PanelAction::ShowDetail));

	let log = log.borrow();
	assert_eq!(
		log.shown,
		vec![Detail::Object(json!([{"id": 0}, {"id": 1}, {"id": 2}]))]
	);
	assert_eq!(log.activations, 1);
	assert_eq!(engine.open_handles(), 0);
}

#[test]
fn test_show_detail_without_selection_is_inert() {
	let engine = seeded_engine();
	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());
	let opens = engine.stats().opens;

	block_on(panel.handle(PanelAction::ShowDetail));

	assert!(log.borrow().shown.is_empty());
	assert_eq!(log.borrow().activations, 0);
	assert_eq!(engine.stats().opens, opens);
}

#[test]
fn test_show_detail_with_circular_value_is_raw() {
	let engine = seeded_engine();
	let node = idb_inspector::Shared::new(Record::Null);
	let mut fields = BTreeMap::new();
	fields.insert("next".to_string(), Record::Shared(node.clone()));
	node.set(Record::Map(fields));
	engine.insert("graph", "nodes", Record::Shared(node.clone()));

	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());
	panel.on_grid_event(GridEvent::Select(StorageRow::new("graph", "nodes", 1)));
	block_on(panel.handle(PanelAction::ShowDetail));

	{
		let log = log.borrow();
		assert_eq!(log.shown.len(), 1);
		assert_eq!(log.shown[0].kind(), "raw");
		assert_eq!(
			log.shown[0],
			Detail::Raw(Record::List(vec![Record::Shared(node.clone())]))
		);
	}

	log.borrow_mut().shown.clear();
	node.set(Record::Null);
}

#[test]
fn test_show_detail_with_binary_value_is_raw() {
	let engine = MemoryEngine::new();
	engine.insert("files", "blobs", Record::Bytes(vec![0xde, 0xad]));
	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());

	panel.on_grid_event(GridEvent::Select(StorageRow::new("files", "blobs", 1)));
	block_on(panel.handle(PanelAction::ShowDetail));

	assert_eq!(
		log.borrow().shown,
		vec![Detail::Raw(Record::List(vec![Record::Bytes(vec![0xde, 0xad])]))]
	);
}

#[test]
fn test_show_detail_without_host_viewer() {
	let engine = seeded_engine();
	let (mut panel, _log) = mounted(&engine, false);
	block_on(panel.show());

	panel.on_grid_event(GridEvent::Select(StorageRow::new("A", "x", 3)));
	assert_eq!(block_on(panel.view_detail()), Ok(false));
	assert_eq!(engine.stats().fetches, 0);
}

#[test]
fn test_show_detail_for_vanished_store_is_swallowed() {
	let engine = seeded_engine();
	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());

	panel.on_grid_event(GridEvent::Select(StorageRow::new("A", "x", 3)));
	block_on(engine_delete(&engine, "A"));
	block_on(panel.handle(PanelAction::ShowDetail));

	assert!(log.borrow().shown.is_empty());
	assert_eq!(engine.open_handles(), 0);
}

async fn engine_delete(engine: &MemoryEngine, name: &str) {
	use idb_inspector::StorageEngine;
	engine.delete_database(name).await.unwrap();
}

// =============================================================================
// Deletion
// =============================================================================

#[test]
fn test_declined_delete_changes_nothing() {
	let engine = seeded_engine();
	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());
	panel.on_grid_event(GridEvent::Select(StorageRow::new("A", "y", 0)));

	let listings = engine.stats().listings;
	let clears = log.borrow().grid_clears;
	log.borrow_mut().answer = false;

	block_on(panel.handle(PanelAction::ClearDatabase));

	assert_eq!(
		log.borrow().prompts,
		vec!["Are you sure that you want to delete the 'A' database?".to_string()]
	);
	assert_eq!(engine.stats().deletes, 0);
	assert_eq!(engine.stats().listings, listings);
	assert_eq!(log.borrow().grid_clears, clears);
	assert_eq!(
		panel.selection().selected(),
		Some(&StorageRow::new("A", "y", 0))
	);
}

#[test]
fn test_confirmed_delete_removes_database_and_refreshes() {
	let engine = seeded_engine();
	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());
	panel.on_grid_event(GridEvent::Select(StorageRow::new("A", "y", 0)));
	log.borrow_mut().answer = true;

	let outcome = block_on(panel.clear_database()).unwrap();

	assert_eq!(outcome, idb_inspector::DeleteOutcome::Deleted("A".to_string()));
	assert_eq!(engine.database_names(), vec!["B"]);
	assert_eq!(grid_pairs(&log), vec![triple("B", "z", "5")]);
	assert_eq!(panel.selection().selected(), None);
	assert_eq!(detail_disabled(&log), Some(true));
}

#[test]
fn test_delete_without_selection_does_not_prompt() {
	let engine = seeded_engine();
	let (mut panel, log) = mounted(&engine, true);
	block_on(panel.show());
	log.borrow_mut().answer = true;

	block_on(panel.handle(PanelAction::ClearDatabase));

	assert!(log.borrow().prompts.is_empty());
	assert_eq!(engine.stats().deletes, 0);
}
