use thiserror::Error;

/// Errors produced while talking to a storage engine or setting up the panel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectorError {
	/// The storage API is missing from this environment
	#[error("Storage engine unavailable: {0}")]
	Unavailable(String),

	/// A single engine call (open, enumerate, count, fetch, delete) failed
	#[error("Storage engine error: {0}")]
	Engine(String),

	/// A database or object store that was asked for does not exist
	#[error("Not found: {0}")]
	NotFound(String),

	/// A value could not be structurally cloned
	#[error("Serialization error: {0}")]
	Serialization(String),

	/// The panel configuration is unusable
	#[error("Invalid configuration: {0}")]
	Config(String),
}

impl InspectorError {
	pub(crate) fn engine(message: impl Into<String>) -> Self {
		InspectorError::Engine(message.into())
	}
}
