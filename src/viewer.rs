//! The detail viewer the panel hands a store's contents to.

use crate::engine::StructuredClone;

/// A store's contents, in the form the viewer should display them.
#[derive(Debug, Clone, PartialEq)]
pub enum Detail<V> {
	/// A detached, structurally cloned copy
	Object(serde_json::Value),
	/// The original engine value, for contents that could not be cloned
	Raw(V),
}

impl<V: StructuredClone> Detail<V> {
	/// Clones `value` when possible, otherwise keeps it as it is.
	pub fn from_value(value: V) -> Self {
		match value.structured_clone() {
			Ok(cloned) => Detail::Object(cloned),
			Err(e) => {
				tracing::debug!(error = %e, "falling back to raw display");
				Detail::Raw(value)
			}
		}
	}
}

impl<V> Detail<V> {
	/// The viewer's display mode name.
	pub fn kind(&self) -> &'static str {
		match self {
			Detail::Object(_) => "object",
			Detail::Raw(_) => "raw",
		}
	}
}

/// A source viewer provided by the host.
pub trait DetailViewer<V> {
	fn set(&mut self, detail: Detail<V>);

	/// Brings the viewer to the front.
	fn activate(&mut self);
}
