//! In-process holder of the signed-in session with write-through persistence.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, Session, TokenSecret},
	store::{CompareAndSwapOutcome, SessionStore, StoreError},
};

/// Owns the current session and mirrors every mutation into a durable [`SessionStore`].
///
/// Readers always observe a whole credential pair: mutations build the replacement session,
/// persist it, and swap it in under a single write lock.
pub struct TokenStore {
	session: RwLock<Option<Session>>,
	backend: Arc<dyn SessionStore>,
}
impl TokenStore {
	/// Restores whatever session the backend holds; partial snapshots count as signed out.
	pub fn bootstrap(backend: Arc<dyn SessionStore>) -> Result<Self, StoreError> {
		let session = backend.load()?;

		Ok(Self { session: RwLock::new(session), backend })
	}

	/// Returns the current credential pair, if signed in.
	pub fn credentials(&self) -> Option<CredentialPair> {
		self.session.read().as_ref().map(|session| session.credentials.clone())
	}

	/// Returns the current access token, if signed in.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.session.read().as_ref().map(|session| session.credentials.access_token.clone())
	}

	/// Returns the current refresh token, if signed in and non-empty.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.session
			.read()
			.as_ref()
			.map(|session| session.credentials.refresh_token.clone())
			.filter(|secret| !secret.is_blank())
	}

	/// Returns a copy of the current session.
	pub fn session(&self) -> Option<Session> {
		self.session.read().clone()
	}

	/// Returns `true` while a session is held.
	pub fn is_authenticated(&self) -> bool {
		self.session.read().is_some()
	}

	/// Installs a freshly signed-in session.
	pub fn login(&self, session: Session) -> Result<(), StoreError> {
		let mut guard = self.session.write();

		self.backend.save(&session)?;
		*guard = Some(session);

		Ok(())
	}

	/// Replaces the credential pair of the current session in place.
	pub fn set_credentials(&self, credentials: CredentialPair) -> Result<(), StoreError> {
		let mut guard = self.session.write();
		let mut session = guard.clone().ok_or(StoreError::NoSession)?;

		session.rotate(credentials, OffsetDateTime::now_utc());
		self.backend.save(&session)?;
		*guard = Some(session);

		Ok(())
	}

	/// Rotates the pair only if the held refresh token still equals `expected_refresh`.
	///
	/// Lets a refresh cycle that started under one session finish without touching a session
	/// that was signed in while its call was in flight.
	pub fn compare_and_swap_refresh(
		&self,
		expected_refresh: &TokenSecret,
		replacement: CredentialPair,
	) -> Result<CompareAndSwapOutcome, StoreError> {
		let mut guard = self.session.write();
		let Some(mut session) = guard.clone() else {
			return Ok(CompareAndSwapOutcome::Missing);
		};

		if &session.credentials.refresh_token != expected_refresh {
			return Ok(CompareAndSwapOutcome::RefreshMismatch);
		}

		session.rotate(replacement, OffsetDateTime::now_utc());
		self.backend.save(&session)?;
		*guard = Some(session);

		Ok(CompareAndSwapOutcome::Updated)
	}

	/// Drops the session from memory, then from the backend.
	///
	/// The in-memory session is gone even when the backend reports an error.
	pub fn clear(&self) -> Result<(), StoreError> {
		let mut guard = self.session.write();

		guard.take();
		self.backend.clear()
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore").field("authenticated", &self.is_authenticated()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	struct FailingStore;
	impl SessionStore for FailingStore {
		fn load(&self) -> Result<Option<Session>, StoreError> {
			Ok(None)
		}

		fn save(&self, _session: &Session) -> Result<(), StoreError> {
			Err(StoreError::Backend { message: "read-only volume".into() })
		}

		fn clear(&self) -> Result<(), StoreError> {
			Err(StoreError::Backend { message: "read-only volume".into() })
		}
	}

	fn session(access: &str, refresh: &str) -> Session {
		Session::new(serde_json::json!({ "id": "u-1" }), CredentialPair::new(access, refresh))
	}

	#[test]
	fn bootstrap_restores_persisted_session() {
		let backend = Arc::new(MemoryStore::default());

		backend.save(&session("T1", "R1")).expect("Seeding the memory store should succeed.");

		let tokens = TokenStore::bootstrap(backend).expect("Bootstrap should succeed.");

		assert!(tokens.is_authenticated());
		assert_eq!(tokens.access_token().map(|t| t.expose().to_owned()), Some("T1".into()));
		assert_eq!(tokens.refresh_token().map(|t| t.expose().to_owned()), Some("R1".into()));
	}

	#[test]
	fn set_credentials_rotates_memory_and_backend() {
		let backend = Arc::new(MemoryStore::default());
		let tokens = TokenStore::bootstrap(backend.clone()).expect("Bootstrap should succeed.");

		tokens.login(session("T1", "R1")).expect("Login should persist the session.");
		tokens
			.set_credentials(CredentialPair::new("T2", "R2"))
			.expect("Rotation should persist the new pair.");

		assert_eq!(tokens.credentials(), Some(CredentialPair::new("T2", "R2")));

		let persisted = backend.snapshot().expect("Backend should hold the rotated snapshot.");

		assert_eq!(persisted.access_token.as_deref(), Some("T2"));
		assert_eq!(persisted.refresh_token.as_deref(), Some("R2"));
		assert!(tokens.session().and_then(|s| s.refreshed_at).is_some());
	}

	#[test]
	fn set_credentials_without_session_fails() {
		let tokens =
			TokenStore::bootstrap(Arc::new(MemoryStore::default())).expect("Bootstrap should succeed.");
		let err = tokens
			.set_credentials(CredentialPair::new("T2", "R2"))
			.expect_err("Rotation without a session should fail.");

		assert_eq!(err, StoreError::NoSession);
		assert!(!tokens.is_authenticated());
	}

	#[test]
	fn compare_and_swap_only_rotates_the_matching_session() {
		let backend = Arc::new(MemoryStore::default());
		let tokens = TokenStore::bootstrap(backend.clone()).expect("Bootstrap should succeed.");
		let stale = TokenSecret::new("R1");

		assert_eq!(
			tokens.compare_and_swap_refresh(&stale, CredentialPair::new("T2", "R2")),
			Ok(CompareAndSwapOutcome::Missing)
		);

		tokens
			.login(Session::new(serde_json::json!({ "id": "u-2" }), CredentialPair::new("T9", "R9")))
			.expect("Login should persist the session.");

		assert_eq!(
			tokens.compare_and_swap_refresh(&stale, CredentialPair::new("T2", "R2")),
			Ok(CompareAndSwapOutcome::RefreshMismatch)
		);
		assert_eq!(tokens.credentials(), Some(CredentialPair::new("T9", "R9")));
		assert_eq!(backend.snapshot().and_then(|s| s.access_token).as_deref(), Some("T9"));
		assert_eq!(
			tokens.compare_and_swap_refresh(&TokenSecret::new("R9"), CredentialPair::new("T10", "R10")),
			Ok(CompareAndSwapOutcome::Updated)
		);
		assert_eq!(tokens.credentials(), Some(CredentialPair::new("T10", "R10")));
		assert_eq!(tokens.session().map(|s| s.user["id"].clone()), Some(serde_json::json!("u-2")));
	}

	#[test]
	fn failed_persistence_keeps_previous_pair() {
		let tokens = TokenStore {
			session: RwLock::new(Some(session("T1", "R1"))),
			backend: Arc::new(FailingStore),
		};

		tokens
			.set_credentials(CredentialPair::new("T2", "R2"))
			.expect_err("Rotation should surface the backend failure.");

		assert_eq!(tokens.credentials(), Some(CredentialPair::new("T1", "R1")));

		tokens.clear().expect_err("Clear should surface the backend failure.");

		assert!(!tokens.is_authenticated());
	}

	#[test]
	fn blank_refresh_token_reads_as_missing() {
		let tokens = TokenStore {
			session: RwLock::new(Some(session("T1", ""))),
			backend: Arc::new(MemoryStore::default()),
		};

		assert!(tokens.refresh_token().is_none());
		assert!(tokens.access_token().is_some());
	}
}
