//! Authenticated client facade and the request pipeline behind it.
//!
//! Every call runs through the same stages: the [`RequestInterceptor`] stamps the current access
//! token, the transport dispatches, [`classify()`] sorts the outcome, and a first-time 401 is handed
//! to the [`RefreshCoordinator`] before a single replay. A 401 on the replay tears the session
//! down through the [`SessionTerminator`].

pub mod classify;
pub mod interceptor;
pub mod refresh;
pub mod terminate;

mod pending;

pub use classify::*;
pub use interceptor::*;
pub use pending::PendingRequest;
pub use refresh::*;
pub use terminate::*;

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenSecret},
	config::ClientConfig,
	error::TransportError,
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{FlowKind, FlowOutcome, FlowSpan},
	store::{SessionStore, TokenStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Authenticated HTTP client with transparent credential refresh.
///
/// Cloning is cheap and every clone shares the same token store, coordinator, and terminator,
/// so a burst of expired requests across clones still triggers a single refresh call.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	config: Arc<ClientConfig>,
	transport: Arc<T>,
	interceptor: Arc<dyn RequestInterceptor>,
	tokens: Arc<TokenStore>,
	terminator: Arc<SessionTerminator>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over a caller-provided transport, restoring any persisted session.
	///
	/// The transport is also used for refresh calls and must enforce `config.timeout` itself.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn SessionStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self> {
		let transport = transport.into();
		let tokens = Arc::new(TokenStore::bootstrap(store)?);
		let terminator = Arc::new(SessionTerminator::new(tokens.clone(), config.sign_in_path.clone()));
		let refresher = Arc::new(EndpointRefresher::<T>::new(transport.clone(), config.refresh_url()?));
		let coordinator =
			Arc::new(RefreshCoordinator::new(tokens.clone(), terminator.clone(), refresher));

		Ok(Self {
			config: Arc::new(config),
			transport,
			interceptor: Arc::new(BearerInterceptor),
			tokens,
			terminator,
			coordinator,
		})
	}

	/// Replaces the request interceptor.
	pub fn with_interceptor(mut self, interceptor: impl 'static + RequestInterceptor) -> Self {
		self.interceptor = Arc::new(interceptor);

		self
	}

	/// Client configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Current session, if signed in.
	pub fn session(&self) -> Option<Session> {
		self.tokens.session()
	}

	/// Whether a session is held.
	pub fn is_authenticated(&self) -> bool {
		self.tokens.is_authenticated()
	}

	/// Refresh coordinator phase.
	pub fn refresh_state(&self) -> RefreshState {
		self.coordinator.state()
	}

	/// Shared refresh counters.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		self.coordinator.metrics()
	}

	/// Installs the session returned by the application's login flow.
	pub fn login(&self, session: Session) -> Result<()> {
		self.tokens.login(session)?;
		self.terminator.rearm();

		Ok(())
	}

	/// Signs out; returns `false` when no session was active.
	pub fn logout(&self) -> bool {
		self.terminator.terminate(TerminationReason::Logout)
	}

	/// Registers a listener for session teardowns.
	pub fn on_session_terminated(&self, listener: impl 'static + SessionListener) {
		self.terminator.subscribe(Arc::new(listener));
	}

	/// Rejects every caller parked behind an in-flight refresh and disables further refreshes.
	pub fn shutdown(&self) {
		self.coordinator.shutdown();
	}

	/// Resolves `path` against the configured base URL.
	pub fn url(&self, path: &str) -> Result<Url> {
		Ok(self.config.url(path)?)
	}

	/// Sends `GET {base}{path}`.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::get(self.url(path)?)).await
	}

	/// Sends `POST {base}{path}` with a JSON body.
	pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::post(self.url(path)?).with_json(body)?).await
	}

	/// Sends `DELETE {base}{path}`.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(self.url(path)?)).await
	}

	/// Sends `request` through the authenticated pipeline.
	///
	/// A single 401 is invisible to the caller when refresh and replay succeed. A failed refresh
	/// surfaces as [`Error::Refresh`]; a 401 on the replay surfaces as [`Error::Unauthorized`].
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		let span = FlowSpan::new(FlowKind::Request, "send");

		span.record(FlowOutcome::Attempt);

		let result = span.instrument(self.run(request)).await;

		span.record(if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure });

		result
	}

	async fn run(&self, request: ApiRequest) -> Result<ApiResponse> {
		let mut pending = PendingRequest::new(request);
		let outcome = self.dispatch(&mut pending, self.tokens.access_token()).await;

		match classify(outcome, &pending) {
			Classified::AuthExpired(_) => {
				let token = self.coordinator.handle_expired(&mut pending).await?;
				let outcome = self.dispatch(&mut pending, Some(token)).await;

				self.settle(classify(outcome, &pending))
			},
			classified => self.settle(classified),
		}
	}

	async fn dispatch(
		&self,
		pending: &mut PendingRequest,
		token: Option<TokenSecret>,
	) -> Result<ApiResponse, TransportError> {
		let request = self.interceptor.intercept(pending.request().clone(), token.as_ref());

		pending.record_dispatch(token);

		self.transport.execute(request).await
	}

	fn settle(&self, classified: Classified) -> Result<ApiResponse> {
		match classified {
			Classified::Success(response) => Ok(response),
			Classified::NetworkFailure(e) => Err(e.into()),
			Classified::ApplicationFailure(response) =>
				Err(Error::Application { status: response.status.as_u16(), response: Box::new(response) }),
			// Only reachable after a replay, where every 401 is terminal.
			Classified::AuthExpired(response) | Classified::AuthTerminal(response) => {
				self.terminator.terminate(TerminationReason::Unauthorized);

				Err(Error::Unauthorized { response: Box::new(response) })
			},
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client with its own reqwest transport honoring `config.timeout`.
	pub fn new(config: ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
		let transport = ReqwestTransport::with_timeout(config.timeout)?;

		Self::with_transport(config, store, transport)
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			interceptor: self.interceptor.clone(),
			tokens: self.tokens.clone(),
			terminator: self.terminator.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("authenticated", &self.tokens.is_authenticated())
			.field("refresh_state", &self.coordinator.state())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::CredentialPair,
		error::RefreshError,
		http::{StatusCode, TransportFuture},
		store::MemoryStore,
	};

	/// Scripted backend: `/auth/refresh` answers from `refresh`, everything else accepts only the
	/// bearer token listed in `valid_token`.
	struct ScriptedTransport {
		valid_token: &'static str,
		refresh: Option<(StatusCode, &'static str)>,
		refresh_calls: AtomicUsize,
		seen: Mutex<Vec<ApiRequest>>,
	}
	impl ScriptedTransport {
		fn new(valid_token: &'static str, refresh: Option<(StatusCode, &'static str)>) -> Self {
			Self { valid_token, refresh, refresh_calls: AtomicUsize::new(0), seen: Default::default() }
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
			self.seen.lock().push(request.clone());

			Box::pin(async move {
				if request.url.path() == "/auth/refresh" {
					self.refresh_calls.fetch_add(1, Ordering::SeqCst);

					return match self.refresh {
						Some((status, body)) => Ok(ApiResponse::new(status, body.as_bytes().to_vec())),
						None => Err(TransportError::Timeout),
					};
				}
				if request.url.path() == "/offline" {
					return Err(TransportError::Timeout);
				}
				if request.url.path() == "/forbidden" {
					return Ok(ApiResponse::new(StatusCode::FORBIDDEN, b"nope".to_vec()));
				}

				match request.bearer_token() {
					Some(token) if token == self.valid_token =>
						Ok(ApiResponse::new(StatusCode::OK, b"[]".to_vec())),
					_ => Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, Vec::new())),
				}
			})
		}
	}

	const ROTATED: &str = r#"{ "data": { "accessToken": "T2", "refreshToken": "R2" } }"#;

	fn client(transport: ScriptedTransport, session: Option<(&str, &str)>) -> ApiClient<ScriptedTransport> {
		let store = Arc::new(MemoryStore::default());

		if let Some((access, refresh)) = session {
			store
				.save(&Session::new(
					serde_json::json!({ "id": "u-1" }),
					CredentialPair::new(access, refresh),
				))
				.expect("Seeding the memory store should succeed.");
		}

		let config = ClientConfig::builder(
			Url::parse("https://api.example.com").expect("Fixture URL should parse."),
		)
		.build()
		.expect("Fixture configuration should validate.");

		ApiClient::with_transport(config, store, transport).expect("Client should build.")
	}

	#[tokio::test]
	async fn expired_token_is_refreshed_and_replayed() {
		let client = client(ScriptedTransport::new("T2", Some((StatusCode::OK, ROTATED))), Some(("T1", "R1")));
		let response = client.get("/teams").await.expect("Replay with T2 should succeed.");

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(client.transport.refresh_calls.load(Ordering::SeqCst), 1);
		assert_eq!(
			client.session().map(|session| session.credentials),
			Some(CredentialPair::new("T2", "R2"))
		);

		let seen = client.transport.seen.lock();
		let bearers: Vec<_> = seen.iter().map(ApiRequest::bearer_token).collect();

		assert_eq!(bearers, vec![Some("T1"), None, Some("T2")]);
	}

	#[tokio::test]
	async fn second_unauthorized_is_terminal() {
		let client =
			client(ScriptedTransport::new("never", Some((StatusCode::OK, ROTATED))), Some(("T1", "R1")));
		let events = Arc::new(AtomicUsize::new(0));
		let counter = events.clone();

		client.on_session_terminated(move |event: &SessionTerminated| {
			assert_eq!(event.reason, TerminationReason::Unauthorized);
			counter.fetch_add(1, Ordering::SeqCst);
		});

		let err = client.get("/teams").await.expect_err("A 401 after replay should fail.");

		assert!(matches!(err, Error::Unauthorized { .. }));
		assert_eq!(client.transport.refresh_calls.load(Ordering::SeqCst), 1);
		assert_eq!(events.load(Ordering::SeqCst), 1);
		assert!(!client.is_authenticated());
	}

	#[tokio::test]
	async fn refresh_network_failure_surfaces_refresh_error() {
		let client = client(ScriptedTransport::new("T2", None), Some(("T1", "R1")));
		let err = client.get("/teams").await.expect_err("A failed refresh should fail the call.");

		assert!(matches!(err, Error::Refresh(RefreshError::Network { .. })));
		assert!(!client.is_authenticated());
	}

	#[tokio::test]
	async fn non_auth_failures_leave_the_session_alone() {
		let client = client(ScriptedTransport::new("T1", Some((StatusCode::OK, ROTATED))), Some(("T1", "R1")));
		let err = client.get("/offline").await.expect_err("Timeouts should propagate.");

		assert!(matches!(err, Error::Transport(TransportError::Timeout)));

		let err = client.get("/forbidden").await.expect_err("403 should propagate.");

		match err {
			Error::Application { status, response } => {
				assert_eq!(status, 403);
				assert_eq!(response.text(), "nope");
			},
			other => panic!("Unexpected error: {other:?}."),
		}

		assert!(client.is_authenticated());
		assert_eq!(client.transport.refresh_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn login_and_logout_drive_the_session() {
		let client = client(ScriptedTransport::new("T5", None), None);

		assert!(!client.is_authenticated());
		assert!(!client.logout());

		client
			.login(Session::new(serde_json::json!({ "id": "u-5" }), CredentialPair::new("T5", "R5")))
			.expect("Login should persist the session.");

		let response = client.get("/teams").await.expect("Fresh login token should be accepted.");

		assert_eq!(response.status, StatusCode::OK);
		assert!(client.logout());
		assert!(!client.logout());
		assert!(!client.is_authenticated());
	}
}
