//! Thread-safe in-memory [`RegistryStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{RegistrySnapshot, RegistryStore, StoreError},
};

/// Thread-safe storage backend that keeps the latest snapshot in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<RegistrySnapshot>>>);
impl MemoryStore {
	/// Revision of the stored snapshot, if any.
	pub fn revision(&self) -> Option<u64> {
		self.0.read().as_ref().map(|snapshot| snapshot.revision)
	}
}
impl RegistryStore for MemoryStore {
	fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), StoreError> {
		*self.0.write() = Some(snapshot.clone());

		Ok(())
	}

	fn load(&self) -> Result<Option<RegistrySnapshot>, StoreError> {
		Ok(self.0.read().clone())
	}
}
