//! The bearer credential attached to outgoing requests and the grant payload that mints it.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access token plus the token-type label that prefixes it in the `Authorization` header.
///
/// Persisted under the keys `accessToken` and `tokenType`; at most one credential is active per
/// store at a time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
	/// Opaque access token value.
	pub access_token: TokenSecret,
	/// Token-type label, typically `Bearer`.
	pub token_type: String,
}
impl Credential {
	/// Builds a credential from its raw parts.
	pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::new(access_token), token_type: token_type.into() }
	}

	/// Shorthand for a `Bearer` credential.
	pub fn bearer(access_token: impl Into<String>) -> Self {
		Self::new(access_token, "Bearer")
	}

	/// Renders the `Authorization` header value: `"<token_type> <access_token>"`.
	pub fn authorization(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}

	/// Returns true when both credentials carry the same access token.
	pub fn same_token(&self, other: &Self) -> bool {
		self.access_token == other.access_token
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &self.access_token)
			.field("token_type", &self.token_type)
			.finish()
	}
}
impl From<TokenGrant> for Credential {
	fn from(grant: TokenGrant) -> Self {
		Self { access_token: grant.access_token, token_type: grant.token_type }
	}
}

/// `data` payload returned by login, registration, and refresh endpoints.
///
/// Unknown fields (user profile, roles, ...) are ignored.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
	/// Newly minted access token.
	pub access_token: TokenSecret,
	/// Token-type label for the new access token.
	pub token_type: String,
}
impl TokenGrant {
	/// Extracts a grant from an envelope `data` value.
	pub fn from_data(data: &Value) -> Result<Self> {
		serde_path_to_error::deserialize(data)
			.map_err(|source| Error::Decode { source, status: None })
	}
}
