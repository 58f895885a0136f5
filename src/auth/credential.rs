//! Access/refresh credential pair.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access and refresh tokens issued together by login or refresh.
///
/// The pair is always handled as a unit: absence is modelled as `Option<CredentialPair>`, so a
/// half-populated pair cannot be represented.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived credential stamped onto outgoing requests.
	pub access_token: TokenSecret,
	/// Longer-lived credential used only against the refresh endpoint.
	pub refresh_token: TokenSecret,
}
impl CredentialPair {
	/// Creates a pair from raw token strings.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
	}

	/// Returns `true` when both tokens carry a value.
	pub fn is_complete(&self) -> bool {
		!self.access_token.is_blank() && !self.refresh_token.is_blank()
	}
}
