//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::Session,
	store::{SessionStore, StoreError, StoredSession},
};

/// Thread-safe storage backend that keeps the session snapshot in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<StoredSession>>>);
impl MemoryStore {
	/// Creates a store pre-populated with a raw snapshot, including partially written ones.
	pub fn with_snapshot(snapshot: StoredSession) -> Self {
		Self(Arc::new(RwLock::new(Some(snapshot))))
	}

	/// Returns a copy of the raw snapshot currently held.
	pub fn snapshot(&self) -> Option<StoredSession> {
		self.0.read().clone()
	}
}
impl SessionStore for MemoryStore {
	fn load(&self) -> Result<Option<Session>, StoreError> {
		Ok(self.0.read().as_ref().and_then(StoredSession::restore))
	}

	fn save(&self, session: &Session) -> Result<(), StoreError> {
		*self.0.write() = Some(StoredSession::from(session));

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().take();

		Ok(())
	}
}
