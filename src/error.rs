//! Client-level error types shared across the request pipeline, refresh cycle, and stores.

// self
use crate::{_prelude::*, http::ApiResponse};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// No response was obtained (connectivity failure, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The credential refresh cycle failed; the session has been terminated.
	#[error(transparent)]
	Refresh(#[from] RefreshError),

	/// Backend answered with a non-auth error status.
	#[error("Request failed with HTTP status {status}.")]
	Application {
		/// HTTP status code returned by the backend.
		status: u16,
		/// Full response, left untouched for the caller.
		response: Box<ApiResponse>,
	},
	/// Backend rejected a request that was already replayed with refreshed credentials.
	#[error("Request remained unauthorized after a credential refresh.")]
	Unauthorized {
		/// The second unauthorized response.
		response: Box<ApiResponse>,
	},
}
impl Error {
	/// Returns the HTTP status attached to the error, when a response was obtained.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Application { status, .. } => Some(*status),
			Self::Unauthorized { response } => Some(response.status.as_u16()),
			Self::Refresh(RefreshError::Rejected { status }) => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL or endpoint path cannot be parsed.
	#[error("Endpoint URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http or https.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Configured path is not absolute.
	#[error("The {name} path must start with `/`: {path}.")]
	RelativePath {
		/// Which path failed validation.
		name: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// Timeout must be strictly positive.
	#[error("Request timeout must be greater than zero.")]
	ZeroTimeout,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<url::ParseError> for ConfigError {
	fn from(e: url::ParseError) -> Self {
		Self::InvalidUrl { source: e }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures where no response was obtained.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request did not complete within the configured timeout.
	#[error("Request timed out before a response was received.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Failure of a credential refresh cycle.
///
/// The value is cloned once per queued waiter, so every variant carries owned, cheap payloads.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh token was stored, so no refresh call was attempted.
	#[error("No refresh token is available.")]
	MissingRefreshToken,
	/// The refresh request could not be assembled.
	#[error("Refresh request could not be built: {message}.")]
	InvalidRequest {
		/// Builder-supplied message.
		message: String,
	},
	/// The refresh call produced no response.
	#[error("Network error occurred while refreshing credentials: {message}.")]
	Network {
		/// Human-readable transport failure.
		message: String,
	},
	/// The refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the request with HTTP status {status}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
	},
	/// The refresh endpoint answered with an unusable body.
	#[error("Refresh endpoint returned a malformed response: {message}.")]
	MalformedResponse {
		/// Parser- or validation-supplied message.
		message: String,
	},
	/// Refreshed credentials could not be persisted.
	#[error("Refreshed credentials could not be persisted: {0}")]
	Storage(#[from] crate::store::StoreError),
	/// The session changed while the refresh call was in flight; its result was discarded.
	#[error("Session changed while credentials were being refreshed.")]
	Superseded,
	/// The call driving the refresh was dropped before it completed.
	#[error("Credential refresh was abandoned before completing.")]
	Cancelled,
	/// The coordinator has been shut down.
	#[error("Refresh coordinator has been shut down.")]
	Shutdown,
}
impl From<TransportError> for RefreshError {
	fn from(e: TransportError) -> Self {
		Self::Network { message: e.to_string() }
	}
}
