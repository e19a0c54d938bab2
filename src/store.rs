//! Storage contract for the two opaque credentials plus the built-in in-memory store.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialKind, CredentialSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for the access and renewal credentials.
///
/// The coordinator never interprets stored values. Implementations decide the medium (keychain,
/// browser storage bridge, file, memory) and must be safe to share across tasks.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored credential for `kind`, if any.
	fn get(&self, kind: CredentialKind) -> StoreFuture<'_, Option<CredentialSecret>>;

	/// Persists or replaces the credential for `kind`.
	fn set(&self, kind: CredentialKind, value: CredentialSecret) -> StoreFuture<'_, ()>;

	/// Removes the credential for `kind`; clearing an absent credential is not an error.
	fn clear(&self, kind: CredentialKind) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
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
