//! WebEngine - the browser's IndexedDB as a [`StorageEngine`]
//!
//! This module provides the browser side of the inspector:
//! - [`WebEngine`] lists, opens, counts, reads and deletes IndexedDB databases
//! - [`ElementMount`] mounts the panel into a DOM element
//! - [`BrowserPrompter`] asks for confirmation with `window.confirm`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     WebEngine                        │
//! │                                                      │
//! │  databases() ──► indexedDB.databases() ──► JsFuture  │
//! │                                                      │
//! │  open/count/getAll/deleteDatabase ──► IdbRequest     │
//! │        ▲                                 │           │
//! │        └──── oneshot ◄── onsuccess/onerror           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The factory is looked up on every call rather than at construction, so a
//! page without IndexedDB yields an engine whose calls fail, which the
//! aggregator turns into a hidden panel.

use crate::engine::{DatabaseHandle, DatabaseInfo, StorageEngine, StructuredClone};
use crate::host::{MountPoint, Prompter};
use crate::InspectorError;
use async_trait::async_trait;
use js_sys::{Array, Function, Promise, Reflect};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlElement, IdbDatabase, IdbFactory, IdbRequest, IdbTransactionMode};

fn js_error(context: &str, e: JsValue) -> InspectorError {
	InspectorError::engine(format!("{}: {:?}", context, e))
}

/// The current origin's IndexedDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebEngine;

impl WebEngine {
	pub fn new() -> Self {
		Self
	}

	fn factory(&self) -> Result<IdbFactory, InspectorError> {
		let window =
			web_sys::window().ok_or_else(|| InspectorError::Unavailable("No window object".into()))?;

		window
			.indexed_db()
			.map_err(|e| InspectorError::Unavailable(format!("IndexedDB error: {:?}", e)))?
			.ok_or_else(|| InspectorError::Unavailable("IndexedDB not available".into()))
	}
}

#[async_trait(?Send)]
impl StorageEngine for WebEngine {
	type Value = JsValue;
	type Handle = WebHandle;

	async fn databases(&self) -> Result<Vec<DatabaseInfo>, InspectorError> {
		let factory = self.factory()?;
		let promise = idb_databases(&factory)?;
		let result = JsFuture::from(promise)
			.await
			.map_err(|e| js_error("indexedDB.databases() rejected", e))?;
		let array: Array = result
			.dyn_into()
			.map_err(|_| InspectorError::engine("indexedDB.databases() did not return an array"))?;

		let mut databases = Vec::with_capacity(array.length() as usize);
		for entry in array.iter() {
			let name = Reflect::get(&entry, &"name".into())
				.ok()
				.and_then(|name| name.as_string())
				.unwrap_or_default();
			let version = Reflect::get(&entry, &"version".into())
				.ok()
				.and_then(|version| version.as_f64())
				.unwrap_or(0.0) as u64;

			databases.push(DatabaseInfo { name, version });
		}

		Ok(databases)
	}

	async fn open(&self, name: &str) -> Result<WebHandle, InspectorError> {
		let factory = self.factory()?;
		let request = factory
			.open(name)
			.map_err(|e| js_error("Failed to open DB", e))?;

		let db = await_request::<IdbDatabase>(&request).await?;

		Ok(WebHandle {
			name: name.to_string(),
			db,
		})
	}

	async fn delete_database(&self, name: &str) -> Result<(), InspectorError> {
		let factory = self.factory()?;
		let request = factory
			.delete_database(name)
			.map_err(|e| js_error("Failed to delete DB", e))?;

		await_request::<JsValue>(&request).await?;

		Ok(())
	}
}

/// An open IndexedDB connection. Dropping it closes the connection.
#[derive(Debug)]
pub struct WebHandle {
	name: String,
	db: IdbDatabase,
}

impl WebHandle {
	fn object_store(&self, store: &str) -> Result<web_sys::IdbObjectStore, InspectorError> {
		let transaction = self
			.db
			.transaction_with_str_and_mode(store, IdbTransactionMode::Readonly)
			.map_err(|e| js_error("Transaction error", e))?;

		transaction
			.object_store(store)
			.map_err(|e| js_error("Object store error", e))
	}
}

#[async_trait(?Send)]
impl DatabaseHandle for WebHandle {
	type Value = JsValue;

	fn name(&self) -> &str {
		&self.name
	}

	async fn store_names(&self) -> Result<Vec<String>, InspectorError> {
		let names = self.db.object_store_names();
		Ok((0..names.length()).filter_map(|i| names.get(i)).collect())
	}

	async fn count(&self, store: &str) -> Result<u64, InspectorError> {
		let request = self
			.object_store(store)?
			.count()
			.map_err(|e| js_error("Count error", e))?;

		let count = await_request::<JsValue>(&request).await?;
		count
			.as_f64()
			.map(|n| n as u64)
			.ok_or_else(|| InspectorError::engine("count() did not return a number"))
	}

	async fn get_all(&self, store: &str) -> Result<JsValue, InspectorError> {
		let request = self
			.object_store(store)?
			.get_all()
			.map_err(|e| js_error("GetAll error", e))?;

		await_request::<JsValue>(&request).await
	}
}

impl Drop for WebHandle {
	fn drop(&mut self) {
		self.db.close();
	}
}

/// `JSON.parse(JSON.stringify(value))`, read into `serde_json`.
impl StructuredClone for JsValue {
	fn structured_clone(&self) -> Result<serde_json::Value, InspectorError> {
		let json = js_sys::JSON::stringify(self)
			.map_err(|e| InspectorError::Serialization(format!("{:?}", e)))?
			.as_string()
			.ok_or_else(|| InspectorError::Serialization("value has no JSON form".into()))?;

		serde_json::from_str(&json).map_err(|e| InspectorError::Serialization(e.to_string()))
	}
}

/// Callbacks attached to a request. Dropping detaches and frees them, also
/// when the awaiting future is dropped before the request settles.
struct RequestCallbacks<'a> {
	request: &'a IdbRequest,
	_onsuccess: Closure<dyn FnMut(web_sys::Event)>,
	_onerror: Closure<dyn FnMut(web_sys::Event)>,
}

impl Drop for RequestCallbacks<'_> {
	fn drop(&mut self) {
		self.request.set_onsuccess(None);
		self.request.set_onerror(None);
	}
}

/// Awaits an IdbRequest and extracts its result
async fn await_request<T: JsCast>(request: &IdbRequest) -> Result<T, InspectorError> {
	let (sender, receiver) = futures_channel::oneshot::channel();
	let sender = Rc::new(RefCell::new(Some(sender)));

	let success_sender = sender.clone();
	let onsuccess = Closure::once(move |_event: web_sys::Event| {
		if let Some(sender) = success_sender.borrow_mut().take() {
			let _ = sender.send(Ok(()));
		}
	});

	let onerror = Closure::once(move |_event: web_sys::Event| {
		if let Some(sender) = sender.borrow_mut().take() {
			let _ = sender.send(Err(InspectorError::engine("IndexedDB request failed")));
		}
	});

	request.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
	request.set_onerror(Some(onerror.as_ref().unchecked_ref()));
	let callbacks = RequestCallbacks {
		request,
		_onsuccess: onsuccess,
		_onerror: onerror,
	};

	let settled = receiver.await;
	drop(callbacks);
	settled.map_err(|_| InspectorError::engine("Channel closed"))??;

	request
		.result()
		.map_err(|e| js_error("Result error", e))?
		.dyn_into::<T>()
		.map_err(|_| InspectorError::engine("Type cast failed"))
}

/// Calls `indexedDB.databases()`, which web-sys does not wrap.
fn idb_databases(factory: &IdbFactory) -> Result<Promise, InspectorError> {
	let databases = Reflect::get(factory.as_ref(), &"databases".into())
		.map_err(|e| js_error("indexedDB.databases lookup", e))?;
	let databases: Function = databases
		.dyn_into()
		.map_err(|_| InspectorError::Unavailable("indexedDB.databases() is not supported".into()))?;

	databases
		.call0(factory.as_ref())
		.map_err(|e| js_error("indexedDB.databases() threw", e))?
		.dyn_into()
		.map_err(|_| InspectorError::engine("indexedDB.databases() did not return a promise"))
}

/// A DOM element used as the panel's mount point.
#[derive(Debug, Clone)]
pub struct ElementMount {
	element: HtmlElement,
}

impl ElementMount {
	pub fn new(element: HtmlElement) -> Self {
		Self { element }
	}

	pub fn element(&self) -> &HtmlElement {
		&self.element
	}
}

impl MountPoint for ElementMount {
	fn set_html(&mut self, markup: &str) {
		self.element.set_inner_html(markup);
	}

	fn show(&mut self) {
		if let Err(e) = self.element.style().remove_property("display") {
			tracing::warn!(error = ?e, "failed to show panel");
		}
	}

	fn hide(&mut self) {
		if let Err(e) = self.element.style().set_property("display", "none") {
			tracing::warn!(error = ?e, "failed to hide panel");
		}
	}

	fn is_visible(&self) -> bool {
		self.element
			.style()
			.get_property_value("display")
			.map(|display| display != "none")
			.unwrap_or(true)
	}

	fn set_class(&mut self, selector: &str, class: &str, enabled: bool) {
		let nodes = match self.element.query_selector_all(selector) {
			Ok(nodes) => nodes,
			Err(e) => {
				tracing::warn!(selector, error = ?e, "invalid selector");
				return;
			}
		};

		for i in 0..nodes.length() {
			let Some(element) = nodes.get(i).and_then(|node| node.dyn_into::<web_sys::Element>().ok())
			else {
				continue;
			};
			if let Err(e) = element.class_list().toggle_with_force(class, enabled) {
				tracing::warn!(class, error = ?e, "failed to toggle class");
			}
		}
	}
}

/// Confirmation through the browser's blocking `window.confirm` dialog.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserPrompter;

#[async_trait(?Send)]
impl Prompter for BrowserPrompter {
	async fn confirm(&self, message: &str) -> bool {
		web_sys::window()
			.and_then(|window| window.confirm_with_message(message).ok())
			.unwrap_or(false)
	}
}
