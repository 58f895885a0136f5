// self
use crate::{_prelude::*, auth::TokenSecret, http::ApiRequest};

/// An in-flight call as seen by the refresh pipeline.
///
/// Keeps the unstamped original so it can be replayed with a different token. `retried` flips to
/// `true` before any refresh or replay happens and never flips back.
#[derive(Clone, Debug)]
pub struct PendingRequest {
	request: ApiRequest,
	sent_with: Option<TokenSecret>,
	retried: bool,
}
impl PendingRequest {
	/// Wraps a request that has not been dispatched yet.
	pub fn new(request: ApiRequest) -> Self {
		Self { request, sent_with: None, retried: false }
	}

	/// The original, unstamped request.
	pub fn request(&self) -> &ApiRequest {
		&self.request
	}

	/// Access token attached to the most recent dispatch.
	pub fn sent_with(&self) -> Option<&TokenSecret> {
		self.sent_with.as_ref()
	}

	/// Whether the request has already entered the refresh path.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	/// Marks the request as retried.
	pub fn mark_retried(&mut self) {
		self.retried = true;
	}

	pub(crate) fn record_dispatch(&mut self, token: Option<TokenSecret>) {
		self.sent_with = token;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retried_flag_is_sticky() {
		let mut pending = PendingRequest::new(ApiRequest::get(
			Url::parse("https://api.example.com/teams").expect("Fixture URL should parse."),
		));

		assert!(!pending.is_retried());

		pending.mark_retried();
		pending.mark_retried();

		assert!(pending.is_retried());
		assert!(pending.request().headers.is_empty());
	}
}
