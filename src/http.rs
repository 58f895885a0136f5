//! Transport primitives for backend calls.
//!
//! The module exposes [`ApiRequest`]/[`ApiResponse`] value types and the [`HttpTransport`] trait so
//! downstream crates can plug in any HTTP stack. A transport reports `Err` only when no response
//! was obtained at all; every HTTP status, including 401, comes back as `Ok` and is classified by
//! the client pipeline.

// crates.io
pub use ::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing backend calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by the client,
/// the refresh endpoint, and every replay. They are expected to enforce the configured timeout
/// and surface it as [`TransportError::Timeout`].
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches `request` and resolves once a response (of any status) is available.
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Outbound request descriptor; cheap to clone so it can be replayed after a refresh.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a bodiless request.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(url: Url) -> Self {
		Self::new(Method::DELETE, url)
	}

	/// Sets (or replaces) a header.
	pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `body` as JSON and sets the matching content type.
	pub fn with_json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body)?);
		self.headers
			.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Returns the bearer token carried by the `Authorization` header, if any.
	pub fn bearer_token(&self) -> Option<&str> {
		self.headers.get(header::AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
	}
}

/// Response returned by a transport.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response with an empty header map.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Returns `true` for 401 Unauthorized.
	pub fn is_unauthorized(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}

	/// Returns `true` for statuses that do not denote a failure (below 400).
	pub fn is_success(&self) -> bool {
		!(self.status.is_client_error() || self.status.is_server_error())
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
	}

	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are not followed: a redirect to a sign-in page must surface as-is instead of
/// being replayed with the caller's bearer credential.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that enforces `timeout` on every call and never follows redirects.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let ApiRequest { method, url, headers, body } = request;
			let mut builder = client.request(method, url).headers(headers);

			if let Some(body) = body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}
