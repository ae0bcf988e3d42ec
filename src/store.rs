//! Storage contracts and built-in credential store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::Credential};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the single active credential.
///
/// The client reads the store before every send, overwrites it after a successful renewal, and
/// clears it on logout or failed renewal.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the active credential, if any.
	fn get(&self) -> StoreFuture<'_, Option<Credential>>;

	/// Persists or replaces the active credential.
	fn set(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Removes the active credential.
	fn clear(&self) -> StoreFuture<'_, ()>;
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
