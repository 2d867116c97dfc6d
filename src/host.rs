//! The capabilities a host shell provides to a tool, and the lifecycle it
//! drives the tool through.
//!
//! A host instantiates the tool, calls [`Tool::init`] with the element it
//! mounted it on plus its services, then [`Tool::show`] / [`Tool::hide`] as
//! the user switches tools, and finally [`Tool::destroy`].

use crate::grid::GridFactory;
use crate::viewer::DetailViewer;
use crate::InspectorError;
use async_trait::async_trait;

/// The element a tool renders into.
pub trait MountPoint {
	/// Replaces the element's contents with `markup`.
	fn set_html(&mut self, markup: &str);

	fn show(&mut self);

	fn hide(&mut self);

	fn is_visible(&self) -> bool;

	/// Adds (`enabled`) or removes `class` on every element matching `selector`.
	fn set_class(&mut self, selector: &str, class: &str, enabled: bool);
}

/// A yes/no question put to the user. May be answered asynchronously.
#[async_trait(?Send)]
pub trait Prompter {
	async fn confirm(&self, message: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStyle {
	Success,
	Info,
	Warning,
	Error,
}

/// Fire-and-forget toast notifications.
pub trait Notifier {
	fn notify(&mut self, message: &str, style: NotifyStyle);
}

/// Everything the host lends a tool at init.
pub struct HostServices<V> {
	pub grids: Box<dyn GridFactory>,
	pub prompter: Box<dyn Prompter>,
	pub notifier: Box<dyn Notifier>,
	/// The host's source viewer, if it has one
	pub viewer: Option<Box<dyn DetailViewer<V>>>,
}

/// A panel the host can register and drive.
#[async_trait(?Send)]
pub trait Tool {
	type Services;

	fn name(&self) -> &str;

	fn init(
		&mut self,
		mount: Box<dyn MountPoint>,
		services: Self::Services,
	) -> Result<(), InspectorError>;

	/// Makes the tool visible and brings its contents up to date.
	async fn show(&mut self);

	fn hide(&mut self);

	/// Releases everything acquired in `init`.
	fn destroy(&mut self);
}
