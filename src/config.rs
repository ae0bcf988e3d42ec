//! Client configuration: base URL, renewal endpoint, and optional logout endpoint.

// self
use crate::{_prelude::*, error::ConfigError};

/// Static endpoint layout for an [`ApiClient`](crate::client::ApiClient).
///
/// Endpoint paths are appended to the base URL verbatim, so a base of `https://host/api` and a
/// path of `/products?page=2` resolve to `https://host/api/products?page=2`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClientConfig", into = "RawClientConfig")]
pub struct ClientConfig {
	base_url: Url,
	refresh_path: String,
	logout_path: Option<String>,
}
impl ClientConfig {
	/// Default renewal endpoint, relative to the base URL.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh-token";

	/// Validates `base_url` and builds a config with the default renewal endpoint.
	pub fn new(base_url: &str) -> Result<Self, ConfigError> {
		let base_url =
			Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { scheme: base_url.scheme().into() });
		}
		if base_url.query().is_some() || base_url.fragment().is_some() {
			return Err(ConfigError::BaseUrlHasQuery);
		}

		Ok(Self { base_url, refresh_path: Self::DEFAULT_REFRESH_PATH.into(), logout_path: None })
	}

	/// Overrides the renewal endpoint path.
	pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Sets the endpoint called (best effort) by
	/// [`ApiClient::sign_out`](crate::client::ApiClient::sign_out).
	pub fn with_logout_path(mut self, path: impl Into<String>) -> Self {
		self.logout_path = Some(path.into());

		self
	}

	/// Base URL every endpoint path is appended to.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Renewal endpoint path.
	pub fn refresh_path(&self) -> &str {
		&self.refresh_path
	}

	/// Logout endpoint path, when configured.
	pub fn logout_path(&self) -> Option<&str> {
		self.logout_path.as_deref()
	}

	/// Resolves an endpoint path against the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let base = self.base_url.as_str().trim_end_matches('/');
		let joined = if path.is_empty() || path.starts_with(['/', '?']) {
			format!("{base}{path}")
		} else {
			format!("{base}/{path}")
		};

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidEndpoint { path: path.into(), source })
	}
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClientConfig {
	base_url: String,
	#[serde(default)]
	refresh_path: Option<String>,
	#[serde(default)]
	logout_path: Option<String>,
}
impl TryFrom<RawClientConfig> for ClientConfig {
	type Error = ConfigError;

	fn try_from(raw: RawClientConfig) -> Result<Self, Self::Error> {
		let mut config = Self::new(&raw.base_url)?;

		if let Some(path) = raw.refresh_path {
			config.refresh_path = path;
		}

		config.logout_path = raw.logout_path;

		Ok(config)
	}
}
impl From<ClientConfig> for RawClientConfig {
	fn from(config: ClientConfig) -> Self {
		Self {
			base_url: config.base_url.into(),
			refresh_path: Some(config.refresh_path),
			logout_path: config.logout_path,
		}
	}
}
