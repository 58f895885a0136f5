//! Demonstrates plugging an in-process backend into [`ApiClient`] through [`HttpTransport`].
//!
//! 1. Implement [`HttpTransport`] so every call is answered by an in-memory backend that only
//!    accepts the most recently issued access token.
//! 2. Sign in, let the backend rotate its token, and watch three concurrent calls share one refresh.
//! 3. Revoke the refresh token and observe the session teardown through a listener.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use parking_lot::Mutex;
use url::Url;
// self
use auth_relay::{
	auth::{CredentialPair, Session},
	client::{ApiClient, SessionTerminated},
	config::ClientConfig,
	error::Error,
	http::{ApiRequest, ApiResponse, HttpTransport, StatusCode, TransportFuture},
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let backend = Arc::new(InProcessBackend::new("access-1", "refresh-1"));
	let config = ClientConfig::builder(Url::parse("https://league.example.com/api")?).build()?;
	let client: ApiClient<InProcessBackend> =
		ApiClient::with_transport(config, Arc::new(MemoryStore::default()), backend.clone())?;

	client.on_session_terminated(|event: &SessionTerminated| {
		println!("Session ended ({:?}); navigate to {}.", event.reason, event.redirect_to);
	});
	client.login(Session::new(
		serde_json::json!({ "id": "organizer-7", "name": "Dana" }),
		CredentialPair::new("access-1", "refresh-1"),
	))?;

	let response = client.get("/tournaments").await?;

	println!("First call answered with HTTP {}.", response.status);

	backend.expire_access_token();

	let (a, b, c) =
		tokio::join!(client.get("/tournaments"), client.get("/teams"), client.get("/standings"));

	for response in [a, b, c] {
		println!("Replayed call answered with HTTP {}.", response?.status);
	}

	println!(
		"Refresh calls: {}; queued callers: {}.",
		backend.refresh_calls.load(Ordering::SeqCst),
		client.refresh_metrics().queued()
	);

	backend.expire_access_token();
	backend.revoke_refresh_token();

	match client.get("/tournaments").await {
		Err(Error::Refresh(e)) => println!("Refresh failed as expected: {e}"),
		other => println!("Unexpected outcome: {other:?}."),
	}

	println!("Still signed in: {}.", client.is_authenticated());

	Ok(())
}

struct Issued {
	access: String,
	refresh: Option<String>,
	generation: usize,
}

struct InProcessBackend {
	issued: Mutex<Issued>,
	refresh_calls: AtomicUsize,
}
impl InProcessBackend {
	fn new(access: &str, refresh: &str) -> Self {
		Self {
			issued: Mutex::new(Issued {
				access: access.into(),
				refresh: Some(refresh.into()),
				generation: 1,
			}),
			refresh_calls: AtomicUsize::new(0),
		}
	}

	fn expire_access_token(&self) {
		self.issued.lock().access = "expired".into();
	}

	fn revoke_refresh_token(&self) {
		self.issued.lock().refresh = None;
	}

	fn rotate(&self, request: &ApiRequest) -> ApiResponse {
		self.refresh_calls.fetch_add(1, Ordering::SeqCst);

		let presented = request
			.body
			.as_deref()
			.and_then(|body| serde_json::from_slice::<serde_json::Value>(body).ok())
			.and_then(|body| body["refreshToken"].as_str().map(str::to_owned));
		let mut issued = self.issued.lock();

		if presented.is_none() || presented != issued.refresh {
			return ApiResponse::new(StatusCode::UNAUTHORIZED, b"refresh token revoked".to_vec());
		}

		issued.generation += 1;
		issued.access = format!("access-{}", issued.generation);
		issued.refresh = Some(format!("refresh-{}", issued.generation));

		let body = serde_json::json!({
			"data": { "accessToken": issued.access, "refreshToken": issued.refresh }
		});

		ApiResponse::new(StatusCode::OK, body.to_string())
	}
}
impl HttpTransport for InProcessBackend {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if request.url.path().ends_with("/auth/refresh") {
				// Gives concurrent callers time to queue behind the refresh.
				tokio::time::sleep(std::time::Duration::from_millis(20)).await;

				return Ok(self.rotate(&request));
			}

			let accepted = request.bearer_token() == Some(self.issued.lock().access.as_str());

			if accepted {
				Ok(ApiResponse::new(StatusCode::OK, b"[]".to_vec()))
			} else {
				Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, Vec::new()))
			}
		})
	}
}
