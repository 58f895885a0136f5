//! Client for the backend's refresh endpoint.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	error::RefreshError,
	http::{ApiRequest, HttpTransport},
};

/// Boxed future returned by [`Refresher::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<CredentialPair, RefreshError>> + 'a + Send>>;

/// Exchanges a refresh token for a new credential pair.
pub trait Refresher
where
	Self: Send + Sync,
{
	/// Performs exactly one refresh round trip.
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequestBody<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshEnvelope {
	data: RefreshedTokens,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshedTokens {
	access_token: String,
	refresh_token: String,
}

/// [`Refresher`] that calls `POST <refresh endpoint>` with `{ "refreshToken": ... }` and expects
/// `{ "data": { "accessToken": ..., "refreshToken": ... } }` back.
///
/// The call is not stamped with the expired bearer credential.
pub struct EndpointRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	endpoint: Url,
}
impl<T> EndpointRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a refresher targeting `endpoint` over `transport`.
	pub fn new(transport: impl Into<Arc<T>>, endpoint: Url) -> Self {
		Self { transport: transport.into(), endpoint }
	}

	/// The refresh endpoint URL.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}
}
impl<T> Refresher for EndpointRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		Box::pin(async move {
			let request = ApiRequest::post(self.endpoint.clone())
				.with_json(&RefreshRequestBody { refresh_token: refresh_token.expose() })
				.map_err(|e| RefreshError::InvalidRequest { message: e.to_string() })?;
			let response = self.transport.execute(request).await?;

			if !response.status.is_success() {
				return Err(RefreshError::Rejected { status: response.status.as_u16() });
			}

			let envelope = response
				.json::<RefreshEnvelope>()
				.map_err(|e| RefreshError::MalformedResponse { message: e.to_string() })?;
			let credentials =
				CredentialPair::new(envelope.data.access_token, envelope.data.refresh_token);

			if !credentials.is_complete() {
				return Err(RefreshError::MalformedResponse {
					message: "refresh response carried an empty token".into(),
				});
			}

			Ok(credentials)
		})
	}
}
impl<T> Debug for EndpointRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EndpointRefresher").field("endpoint", &self.endpoint.as_str()).finish()
	}
}
