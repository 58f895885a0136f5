//! Outcome classification for dispatched requests.

// self
use crate::{
	_prelude::*,
	client::PendingRequest,
	error::TransportError,
	http::ApiResponse,
};

/// Failure taxonomy applied to every dispatched request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// No response was obtained.
	NetworkFailure,
	/// A non-auth error status was returned.
	ApplicationFailure,
	/// First unauthorized response for the request.
	AuthExpired,
	/// Unauthorized response on a request that was already retried.
	AuthTerminal,
}

/// Classified outcome, carrying the payload each branch needs.
#[derive(Debug)]
pub enum Classified {
	/// Non-failure response.
	Success(ApiResponse),
	/// Transport failure, propagated unchanged.
	NetworkFailure(TransportError),
	/// Non-auth error response, propagated unchanged.
	ApplicationFailure(ApiResponse),
	/// First 401; hand off to the refresh coordinator.
	AuthExpired(ApiResponse),
	/// 401 after a retry; terminate the session.
	AuthTerminal(ApiResponse),
}
impl Classified {
	/// Returns the failure kind, or `None` for successes.
	pub fn kind(&self) -> Option<FailureKind> {
		match self {
			Self::Success(_) => None,
			Self::NetworkFailure(_) => Some(FailureKind::NetworkFailure),
			Self::ApplicationFailure(_) => Some(FailureKind::ApplicationFailure),
			Self::AuthExpired(_) => Some(FailureKind::AuthExpired),
			Self::AuthTerminal(_) => Some(FailureKind::AuthTerminal),
		}
	}
}

/// Classifies a transport outcome for `pending`.
pub fn classify(outcome: Result<ApiResponse, TransportError>, pending: &PendingRequest) -> Classified {
	match outcome {
		Err(e) => Classified::NetworkFailure(e),
		Ok(response) if response.is_unauthorized() =>
			if pending.is_retried() {
				Classified::AuthTerminal(response)
			} else {
				Classified::AuthExpired(response)
			},
		Ok(response) if response.is_success() => Classified::Success(response),
		Ok(response) => Classified::ApplicationFailure(response),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::{ApiRequest, StatusCode};

	fn pending(retried: bool) -> PendingRequest {
		let mut pending = PendingRequest::new(ApiRequest::get(
			Url::parse("https://api.example.com/standings").expect("Fixture URL should parse."),
		));

		if retried {
			pending.mark_retried();
		}

		pending
	}

	fn respond(status: StatusCode) -> Result<ApiResponse, TransportError> {
		Ok(ApiResponse::new(status, Vec::new()))
	}

	#[test]
	fn missing_response_is_network_failure() {
		let classified = classify(Err(TransportError::Timeout), &pending(false));

		assert_eq!(classified.kind(), Some(FailureKind::NetworkFailure));

		let classified = classify(Err(TransportError::Timeout), &pending(true));

		assert_eq!(classified.kind(), Some(FailureKind::NetworkFailure));
	}

	#[test]
	fn unauthorized_depends_on_retry_flag() {
		assert_eq!(
			classify(respond(StatusCode::UNAUTHORIZED), &pending(false)).kind(),
			Some(FailureKind::AuthExpired)
		);
		assert_eq!(
			classify(respond(StatusCode::UNAUTHORIZED), &pending(true)).kind(),
			Some(FailureKind::AuthTerminal)
		);
	}

	#[test]
	fn other_statuses_are_success_or_application_failures() {
		assert_eq!(classify(respond(StatusCode::OK), &pending(false)).kind(), None);
		assert_eq!(
			classify(respond(StatusCode::FORBIDDEN), &pending(false)).kind(),
			Some(FailureKind::ApplicationFailure)
		);
		assert_eq!(
			classify(respond(StatusCode::INTERNAL_SERVER_ERROR), &pending(true)).kind(),
			Some(FailureKind::ApplicationFailure)
		);
	}
}
