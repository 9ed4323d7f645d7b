//! Persistence contracts and built-in store implementations for registry snapshots.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, registry::RegistryState};

/// Storage backend contract implemented by registry snapshot stores.
///
/// A store holds at most one snapshot: the latest committed state.
pub trait RegistryStore
where
	Self: Send + Sync,
{
	/// Persists `snapshot`, replacing any previous one.
	fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), StoreError>;

	/// Loads the latest snapshot, if one was saved.
	fn load(&self) -> Result<Option<RegistrySnapshot>, StoreError>;
}

/// Committed registry state plus bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
	/// Number of committed operations that produced this state.
	pub revision: u64,
	/// Instant the snapshot was taken.
	pub taken_at: OffsetDateTime,
	/// Registry and ledger.
	pub state: RegistryState,
}

/// Error type produced by [`RegistryStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_registry_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unplugged".into() };
		let registry_error: Error = store_error.clone().into();

		assert!(matches!(registry_error, Error::Storage(_)));
		assert!(registry_error.to_string().contains("disk unplugged"));

		let source = StdError::source(&registry_error)
			.expect("Registry error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
