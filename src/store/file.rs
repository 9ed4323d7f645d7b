//! Simple file-backed [`RegistryStore`] for single-node deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{RegistrySnapshot, RegistryStore, StoreError},
};

/// Persists the latest snapshot to a JSON file, replacing it atomically on every save.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	write_lock: Arc<Mutex<()>>,
}
impl FileStore {
	/// Opens (or prepares) a store at the provided path.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path, write_lock: Default::default() })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn write_atomically(&self, bytes: &[u8]) -> Result<(), StoreError> {
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(bytes).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl RegistryStore for FileStore {
	fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), StoreError> {
		let serialized =
			serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize registry snapshot: {e}"),
			})?;
		let _guard = self.write_lock.lock();

		Self::ensure_parent_exists(&self.path)?;
		self.write_atomically(&serialized)
	}

	fn load(&self) -> Result<Option<RegistrySnapshot>, StoreError> {
		if !self.path.exists() {
			return Ok(None);
		}

		let bytes = fs::read(&self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", self.path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(None);
		}

		serde_json::from_slice(&bytes).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", self.path.display()),
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::registry::{RegistryConfig, RegistryState};

	fn temp_path() -> PathBuf {
		let unique = format!(
			"membership_registry_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn missing_or_empty_file_loads_nothing() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store.");

		assert_eq!(store.load().expect("Loading a missing file should succeed."), None);

		File::create(&path).expect("Failed to create empty snapshot file.");

		assert_eq!(store.load().expect("Loading an empty file should succeed."), None);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let snapshot = RegistrySnapshot {
			revision: 3,
			taken_at: macros::datetime!(2025-01-01 00:00 UTC),
			state: RegistryState::new(RegistryConfig::default())
				.expect("Default state should build."),
		};

		store.save(&snapshot).expect("Failed to save snapshot.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store.");
		let loaded = reopened
			.load()
			.expect("Failed to load snapshot.")
			.expect("File store lost the snapshot after reopen.");

		assert_eq!(loaded, snapshot);

		fs::write(&path, b"{ not json").expect("Failed to corrupt snapshot file.");

		assert!(matches!(reopened.load(), Err(StoreError::Serialization { .. })));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary snapshot {}: {e}", path.display())
		});
	}
}
