//! An embeddable inspector panel for client-side IndexedDB-style storage.
//!
//! The panel lists every object store of every database visible to the page
//! together with its record count, lets the user pick a row, shows the picked
//! store's contents in the host's source viewer, and deletes whole databases
//! after confirmation. It reflects live state it does not own, and does no
//! writing of its own beyond deletion.
//!
//! Storage is reached through the [`StorageEngine`] trait: [`MemoryEngine`]
//! runs anywhere, `WebEngine` (feature `web`) talks to the browser's
//! `indexedDB`. The host lends the panel a [`MountPoint`] plus
//! [`HostServices`] and drives it through the [`Tool`] lifecycle.

mod aggregate;
mod config;
mod destructive;
mod engine;
mod error;
mod grid;
mod host;
mod memory;
mod namespace;
mod panel;
mod selection;
mod viewer;

#[cfg(feature = "web")]
mod web;

pub use aggregate::{collect_rows, RefreshOutcome, RowSet, StorageAggregator, StorageRow};
pub use config::PanelConfig;
pub use destructive::{confirmation_message, delete_selected, DeleteOutcome};
pub use engine::{DatabaseHandle, DatabaseInfo, StorageEngine, StructuredClone};
pub use error::InspectorError;
pub use grid::{sync_rows, AppendOptions, ColumnDef, DisplayGrid, GridEvent, GridFactory, GridOptions};
pub use host::{HostServices, MountPoint, Notifier, NotifyStyle, Prompter, Tool};
pub use memory::{EngineStats, MemoryEngine, MemoryHandle, Record, Shared};
pub use namespace::ClassNamespacer;
pub use panel::{IndexedDbPanel, PanelAction};
pub use selection::{Selection, SelectionController};
pub use viewer::{Detail, DetailViewer};

#[cfg(feature = "web")]
pub use web::{BrowserPrompter, ElementMount, WebEngine, WebHandle};
