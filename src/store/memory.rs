//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{CredentialStore, StoreFuture},
};

type Slot = Arc<RwLock<Option<Credential>>>;

/// Storage backend that keeps the credential in-process; lost when the process exits.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	/// Creates a store that already holds `credential`.
	pub fn with_credential(credential: Credential) -> Self {
		Self(Arc::new(RwLock::new(Some(credential))))
	}

	/// Returns the current credential without going through the async contract.
	pub fn snapshot(&self) -> Option<Credential> {
		self.0.read().clone()
	}

	/// Synchronously swaps the stored credential, returning the previous one.
	pub fn replace(&self, credential: Option<Credential>) -> Option<Credential> {
		std::mem::replace(&mut *self.0.write(), credential)
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self) -> StoreFuture<'_, Option<Credential>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn set(&self, credential: Credential) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(credential);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = None;

			Ok(())
		})
	}
}
