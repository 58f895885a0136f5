//! Authenticated HTTP client that stamps bearer credentials, collapses bursts of expired-token
//! responses into a single refresh round trip, and replays every affected request transparently.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{CredentialPair, Session},
		client::ApiClient,
		config::ClientConfig,
		http::ReqwestTransport,
		store::{MemoryStore, SessionStore},
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = ApiClient<ReqwestTransport>;

	/// Builds a client configuration pointing at a mock server base URL.
	pub fn test_config(base_url: &str) -> ClientConfig {
		let base_url = Url::parse(base_url).expect("Mock server base URL should parse.");

		ClientConfig::builder(base_url).build().expect("Test client configuration should be valid.")
	}

	/// Builds a session for a fixture user holding the provided credential pair.
	pub fn test_session(access: &str, refresh: &str) -> Session {
		Session::new(
			serde_json::json!({ "id": "user-1", "name": "Referee", "role": "organizer" }),
			CredentialPair::new(access, refresh),
		)
	}

	/// Constructs an [`ApiClient`] backed by an in-memory store that is pre-seeded with `session`.
	pub fn build_reqwest_test_client(
		base_url: &str,
		session: Option<Session>,
	) -> (ReqwestTestClient, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());

		if let Some(session) = session.as_ref() {
			store_backend.save(session).expect("Seeding the memory store should succeed.");
		}

		let store: Arc<dyn SessionStore> = store_backend.clone();
		let client = ApiClient::new(test_config(base_url), store)
			.expect("Reqwest test client should build successfully.");

		(client, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::VecDeque,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
