//! Outbound request stamping.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	http::{ApiRequest, HeaderValue, header::AUTHORIZATION},
	obs::{self, FlowKind},
};

/// Describes how to attach the current access token to an outbound request.
///
/// Interceptors are stateless with respect to refresh coordination and never fail: when a token
/// cannot be attached the request passes through unchanged.
pub trait RequestInterceptor
where
	Self: Send + Sync,
{
	/// Returns `request` stamped with `access_token`, if one is available.
	fn intercept(&self, request: ApiRequest, access_token: Option<&TokenSecret>) -> ApiRequest;
}

/// Default interceptor that sets `Authorization: Bearer <token>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerInterceptor;
impl RequestInterceptor for BearerInterceptor {
	fn intercept(&self, mut request: ApiRequest, access_token: Option<&TokenSecret>) -> ApiRequest {
		let Some(token) = access_token.filter(|token| !token.is_blank()) else {
			return request;
		};

		match HeaderValue::try_from(format!("Bearer {}", token.expose())) {
			Ok(mut value) => {
				value.set_sensitive(true);
				// Replays overwrite the stale credential.
				request.headers.insert(AUTHORIZATION, value);
			},
			Err(e) => obs::warn_swallowed(
				FlowKind::Request,
				"Access token cannot be encoded as a header value; sending without it.",
				&e,
			),
		}

		request
	}
}
