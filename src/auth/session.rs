//! Authenticated session model.

// self
use crate::{_prelude::*, auth::CredentialPair};

/// Authenticated session created on login.
///
/// The credential pair is replaced in place on every successful refresh; the user payload is
/// whatever the backend's login endpoint returned and is treated as opaque.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
	/// Signed-in user as returned by the backend.
	pub user: serde_json::Value,
	/// Current credential pair.
	pub credentials: CredentialPair,
	/// Instant the session was established (or restored from durable storage).
	pub authenticated_at: OffsetDateTime,
	/// Instant of the most recent successful refresh, if any.
	pub refreshed_at: Option<OffsetDateTime>,
}
impl Session {
	/// Creates a session for `user` holding `credentials`.
	pub fn new(user: serde_json::Value, credentials: CredentialPair) -> Self {
		Self { user, credentials, authenticated_at: OffsetDateTime::now_utc(), refreshed_at: None }
	}

	/// Replaces the credential pair after a successful refresh.
	pub fn rotate(&mut self, credentials: CredentialPair, instant: OffsetDateTime) {
		self.credentials = credentials;
		self.refreshed_at = Some(instant);
	}
}
