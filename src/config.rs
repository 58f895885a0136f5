//! Client configuration and its validating builder.

// self
use crate::{_prelude::*, error::ConfigError};

/// Validated settings shared by every component of an [`ApiClient`](crate::client::ApiClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL every relative request path is joined onto.
	pub base_url: Url,
	/// Path of the refresh endpoint, relative to the base URL.
	pub refresh_path: String,
	/// Sign-in boundary path reported when a session is terminated.
	pub sign_in_path: String,
	/// Timeout applied to every outbound call, the refresh call included.
	pub timeout: StdDuration,
}
impl ClientConfig {
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
	/// Default sign-in boundary path.
	pub const DEFAULT_SIGN_IN_PATH: &'static str = "/sign-in";
	/// Default per-request timeout.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

	/// Returns a builder seeded with defaults for `base_url`.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves `path` against the base URL, keeping any base path prefix.
	pub fn url(&self, path: &str) -> Result<Url, ConfigError> {
		let mut base = self.base_url.clone();

		if !base.path().ends_with('/') {
			let prefixed = format!("{}/", base.path());

			base.set_path(&prefixed);
		}

		Ok(base.join(path.trim_start_matches('/'))?)
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.url(&self.refresh_path)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}

		validate_path("refresh", &self.refresh_path)?;
		validate_path("sign-in", &self.sign_in_path)?;

		self.refresh_url().map(|_| ())
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for the backend.
	pub base_url: Url,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Sign-in boundary path.
	pub sign_in_path: String,
	/// Per-request timeout.
	pub timeout: StdDuration,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
			sign_in_path: ClientConfig::DEFAULT_SIGN_IN_PATH.into(),
			timeout: ClientConfig::DEFAULT_TIMEOUT,
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the sign-in boundary path.
	pub fn sign_in_path(mut self, path: impl Into<String>) -> Self {
		self.sign_in_path = path.into();

		self
	}

	/// Overrides the per-request timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			refresh_path: self.refresh_path,
			sign_in_path: self.sign_in_path,
			timeout: self.timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_path(name: &'static str, path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::RelativePath { name, path: path.into() })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse fixture URL.")
	}

	#[test]
	fn defaults_match_backend_contract() {
		let config = ClientConfig::builder(url("https://api.example.com"))
			.build()
			.expect("Default configuration should validate.");

		assert_eq!(config.timeout, StdDuration::from_secs(10));
		assert_eq!(config.sign_in_path, "/sign-in");
		assert_eq!(
			config.refresh_url().expect("Refresh URL should resolve.").as_str(),
			"https://api.example.com/auth/refresh"
		);
	}

	#[test]
	fn url_keeps_base_path_prefix() {
		let config = ClientConfig::builder(url("https://api.example.com/v1"))
			.build()
			.expect("Prefixed base URL should validate.");

		assert_eq!(
			config.url("/tournaments?page=2").expect("Path should resolve.").as_str(),
			"https://api.example.com/v1/tournaments?page=2"
		);
		assert_eq!(
			config.refresh_url().expect("Refresh URL should resolve.").as_str(),
			"https://api.example.com/v1/auth/refresh"
		);
	}

	#[test]
	fn builder_rejects_invalid_settings() {
		let err = ClientConfig::builder(url("ftp://files.example.com"))
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));

		let err = ClientConfig::builder(url("https://api.example.com"))
			.refresh_path("auth/refresh")
			.build()
			.expect_err("Relative refresh paths should be rejected.");

		assert!(matches!(err, ConfigError::RelativePath { name: "refresh", .. }));

		let err = ClientConfig::builder(url("https://api.example.com"))
			.timeout(StdDuration::ZERO)
			.build()
			.expect_err("A zero timeout should be rejected.");

		assert!(matches!(err, ConfigError::ZeroTimeout));
	}
}
