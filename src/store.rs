//! Durable session storage contracts, built-in backends, and the in-process [`TokenStore`].

pub mod file;
pub mod memory;
pub mod tokens;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use tokens::TokenStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, Session},
};

/// Durable storage backend for the signed-in session.
///
/// Implementations persist the three storage keys (`accessToken`, `refreshToken`, `user`) together
/// and remove them together. Calls are synchronous and expected to be short.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads the persisted session, returning `None` when any key is missing.
	fn load(&self) -> Result<Option<Session>, StoreError>;

	/// Persists (or replaces) all keys for `session`.
	fn save(&self, session: &Session) -> Result<(), StoreError>;

	/// Removes every key.
	fn clear(&self) -> Result<(), StoreError>;
}

/// Result of a refresh-token compare-and-swap on the [`TokenStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareAndSwapOutcome {
	/// The held refresh token matched and the pair was rotated.
	Updated,
	/// A session is held but its refresh token differs; it was left untouched.
	RefreshMismatch,
	/// No session is held.
	Missing,
}

/// Error type produced by [`SessionStore`] implementations and the [`TokenStore`].
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
	/// Credentials were rotated while no session was signed in.
	#[error("No session is signed in.")]
	NoSession,
}

/// On-disk layout of a persisted session, keyed exactly as the storage contract names them.
///
/// Every field is optional so partially written snapshots can be detected and discarded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
	/// Persisted `accessToken` key.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<String>,
	/// Persisted `refreshToken` key.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	/// Persisted `user` key.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<serde_json::Value>,
}
impl StoredSession {
	/// Returns the session when all three keys are present and non-empty.
	pub fn restore(&self) -> Option<Session> {
		let access = self.access_token.as_deref().filter(|v| !v.trim().is_empty())?;
		let refresh = self.refresh_token.as_deref().filter(|v| !v.trim().is_empty())?;
		let user = self.user.clone().filter(|v| !v.is_null())?;

		Some(Session::new(user, CredentialPair::new(access, refresh)))
	}
}
impl From<&Session> for StoredSession {
	fn from(session: &Session) -> Self {
		Self {
			access_token: Some(session.credentials.access_token.expose().to_owned()),
			refresh_token: Some(session.credentials.refresh_token.expose().to_owned()),
			user: Some(session.user.clone()),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_renders_message() {
		let err = StoreError::Backend { message: "database unreachable".into() };

		assert_eq!(err.to_string(), "Backend failure: database unreachable.");
	}

	#[test]
	fn stored_session_uses_storage_key_names() {
		let session = Session::new(serde_json::json!({ "id": "u-1" }), CredentialPair::new("T1", "R1"));
		let payload = serde_json::to_value(StoredSession::from(&session))
			.expect("StoredSession should serialize to JSON.");

		assert_eq!(payload["accessToken"], "T1");
		assert_eq!(payload["refreshToken"], "R1");
		assert_eq!(payload["user"]["id"], "u-1");
	}

	#[test]
	fn partial_snapshots_restore_to_nothing() {
		let partial = StoredSession {
			access_token: Some("T1".into()),
			refresh_token: None,
			user: Some(serde_json::json!({ "id": "u-1" })),
		};

		assert!(partial.restore().is_none());

		let blank = StoredSession { refresh_token: Some(String::new()), ..partial.clone() };

		assert!(blank.restore().is_none());

		let complete = StoredSession { refresh_token: Some("R1".into()), ..partial };
		let restored = complete.restore().expect("Complete snapshot should restore.");

		assert_eq!(restored.credentials, CredentialPair::new("T1", "R1"));
	}
}
