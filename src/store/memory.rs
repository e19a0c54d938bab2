//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialKind, CredentialSecret},
	store::{CredentialStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<BTreeMap<CredentialKind, CredentialSecret>>>;

/// Storage backend that keeps both credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Creates a store seeded with the provided credentials.
	pub fn seeded(access: Option<&str>, renewal: Option<&str>) -> Self {
		let store = Self::default();

		{
			let mut map = store.0.write();

			if let Some(value) = access {
				map.insert(CredentialKind::Access, CredentialSecret::new(value));
			}
			if let Some(value) = renewal {
				map.insert(CredentialKind::Renewal, CredentialSecret::new(value));
			}
		}

		store
	}

	/// Returns the stored credential without going through the async contract.
	pub fn peek(&self, kind: CredentialKind) -> Option<CredentialSecret> {
		self.0.read().get(&kind).cloned()
	}

	fn set_now(
		map: StoreMap,
		kind: CredentialKind,
		value: CredentialSecret,
	) -> Result<(), StoreError> {
		map.write().insert(kind, value);

		Ok(())
	}

	fn clear_now(map: StoreMap, kind: CredentialKind) -> Result<(), StoreError> {
		map.write().remove(&kind);

		Ok(())
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, kind: CredentialKind) -> StoreFuture<'_, Option<CredentialSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&kind).cloned()) })
	}

	fn set(&self, kind: CredentialKind, value: CredentialSecret) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::set_now(map, kind, value) })
	}

	fn clear(&self, kind: CredentialKind) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::clear_now(map, kind) })
	}
}
