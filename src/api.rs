//! Response envelope decoding and the tagged result every call resolves to.
//!
//! The backend wraps every payload in `{ success, data?, message?, errorCode? }`. The envelope
//! is validated at the boundary: a body that is not JSON, or lacks the `success` flag, becomes a
//! [`FailureKind::MalformedResponse`] instead of leaking half-decoded values to callers. Any other
//! top-level field (`errors`, `pagination`, ...) is kept verbatim and rendered back by
//! [`ApiResult::to_value`].

// self
use crate::{_prelude::*, http::RawResponse};

/// Error code the backend uses to signal an expired access token.
pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
/// Message returned when the transport itself fails.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again later.";
/// Message returned when renewal fails and the session is dropped.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please login again.";
/// Status attached to the synthesized session-expired result.
pub const SESSION_EXPIRED_STATUS: u16 = 401;

/// Top-level envelope fields outside the well-known four.
pub type ExtraFields = serde_json::Map<String, Value>;

/// Wire envelope shared by every API response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
	/// Whether the backend considers the call successful.
	pub success: bool,
	/// Endpoint-specific payload; `Some(Value::Null)` when the backend sent an explicit `null`.
	#[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	/// Human-readable message for the user.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// Machine-readable failure code.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_code: Option<String>,
	/// Every other top-level field, untouched.
	#[serde(flatten)]
	pub extra: ExtraFields,
}
impl Envelope {
	/// Decodes an envelope from raw response bytes.
	pub fn decode(raw: &RawResponse) -> Result<Self> {
		let mut de = serde_json::Deserializer::from_slice(&raw.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source, status: Some(raw.status) })
	}

	/// Returns true when the backend reports an expired access token.
	pub fn is_token_expired(&self) -> bool {
		!self.success && self.error_code.as_deref() == Some(TOKEN_EXPIRED)
	}

	/// Payload, with an absent `data` read as `null`.
	pub fn data_or_null(&self) -> &Value {
		self.data.as_ref().unwrap_or(&Value::Null)
	}
}

// Distinguishes an explicit `null` from a missing field; `#[serde(default)]` covers the latter.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Value::deserialize(deserializer).map(Some)
}

/// Failure categories surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// The exchange never completed (offline, DNS, refused connection).
	Transport,
	/// The backend answered `success: false` with its own message and code.
	Application,
	/// The backend still reports `TOKEN_EXPIRED` after the single renewal-and-retry cycle.
	CredentialExpired,
	/// Renewal failed; the credential store was cleared and the user must sign in again.
	SessionInvalidated,
	/// The body was not a valid envelope, or `data` did not match the requested type.
	MalformedResponse,
}
impl FailureKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FailureKind::Transport => "transport",
			FailureKind::Application => "application",
			FailureKind::CredentialExpired => "credential_expired",
			FailureKind::SessionInvalidated => "session_invalidated",
			FailureKind::MalformedResponse => "malformed_response",
		}
	}
}
impl Display for FailureKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Successful call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiSuccess<T = Value> {
	/// Decoded payload; `None` when the backend sent no `data` field.
	pub data: Option<T>,
	/// Optional message supplied by the backend.
	pub message: Option<String>,
	/// Other top-level fields of the envelope.
	pub extra: ExtraFields,
	/// HTTP status code.
	pub status: u16,
}

/// Failed call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiFailure {
	/// Failure category.
	pub kind: FailureKind,
	/// Human-readable message, passed through from the backend or synthesized locally.
	pub message: Option<String>,
	/// Machine-readable failure code, when the backend supplied one.
	pub error_code: Option<String>,
	/// Payload the backend attached to the failure.
	pub data: Option<Value>,
	/// Other top-level fields of the envelope (`errors`, ...).
	pub extra: ExtraFields,
	/// HTTP status code; absent when the transport failed.
	pub status: Option<u16>,
}
impl ApiFailure {
	/// Failure for an exchange that never completed.
	pub fn network() -> Self {
		Self {
			kind: FailureKind::Transport,
			message: Some(NETWORK_ERROR_MESSAGE.into()),
			error_code: None,
			data: None,
			extra: ExtraFields::new(),
			status: None,
		}
	}

	/// Failure returned after a renewal attempt was rejected.
	pub fn session_expired() -> Self {
		Self {
			kind: FailureKind::SessionInvalidated,
			message: Some(SESSION_EXPIRED_MESSAGE.into()),
			error_code: Some(TOKEN_EXPIRED.into()),
			data: None,
			extra: ExtraFields::new(),
			status: Some(SESSION_EXPIRED_STATUS),
		}
	}

	/// Failure for a body that could not be decoded.
	pub fn malformed(err: &Error, status: Option<u16>) -> Self {
		Self {
			kind: FailureKind::MalformedResponse,
			message: Some(err.to_string()),
			error_code: None,
			data: None,
			extra: ExtraFields::new(),
			status,
		}
	}

	/// Maps an internal error from a single exchange onto the failure callers see.
	pub fn from_error(err: &Error) -> Self {
		match err {
			Error::Decode { status, .. } => Self::malformed(err, *status),
			_ => Self::network(),
		}
	}

	/// Returns true when the caller should route the user back to sign-in.
	pub fn requires_sign_in(&self) -> bool {
		matches!(self.kind, FailureKind::SessionInvalidated | FailureKind::CredentialExpired)
	}
}
impl Display for ApiFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match (&self.message, self.status) {
			(Some(message), Some(status)) => write!(f, "{} ({status}): {message}", self.kind),
			(Some(message), None) => write!(f, "{}: {message}", self.kind),
			(None, Some(status)) => write!(f, "{} ({status})", self.kind),
			(None, None) => Display::fmt(&self.kind, f),
		}
	}
}
impl StdError for ApiFailure {}

/// Outcome of a logical API call. Every call resolves to one of these; none panic or error out.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiResult<T = Value> {
	/// `success: true`.
	Ok(ApiSuccess<T>),
	/// Any failure, local or remote.
	Failure(ApiFailure),
}
impl ApiResult {
	/// Builds the result for a decoded envelope and its transport status.
	pub fn from_envelope(envelope: Envelope, status: u16) -> Self {
		let Envelope { success, data, message, error_code, extra } = envelope;

		if success {
			return Self::Ok(ApiSuccess { data, message, extra, status });
		}

		let kind = if error_code.as_deref() == Some(TOKEN_EXPIRED) {
			FailureKind::CredentialExpired
		} else {
			FailureKind::Application
		};

		Self::Failure(ApiFailure {
			kind,
			message,
			error_code,
			data,
			extra,
			status: Some(status),
		})
	}

	/// Decodes `data` into `T`, turning schema mismatches into [`FailureKind::MalformedResponse`].
	pub fn into_typed<T>(self) -> ApiResult<T>
	where
		T: DeserializeOwned,
	{
		match self {
			Self::Ok(ApiSuccess { data, message, extra, status }) =>
				match data.map(serde_path_to_error::deserialize).transpose() {
					Ok(data) => ApiResult::Ok(ApiSuccess { data, message, extra, status }),
					Err(source) => {
						let err = Error::Decode { source, status: Some(status) };

						ApiResult::Failure(ApiFailure::malformed(&err, Some(status)))
					},
				},
			Self::Failure(failure) => ApiResult::Failure(failure),
		}
	}

	/// Renders the `{ success, data?, message?, errorCode?, ..., httpStatus? }` object consumed by
	/// existing front-end callers: the decoded body as the backend sent it, plus `httpStatus`.
	pub fn to_value(&self) -> Value {
		let mut object = ExtraFields::new();

		match self {
			Self::Ok(ok) => {
				object.extend(ok.extra.clone());
				object.insert("success".into(), Value::Bool(true));

				if let Some(data) = &ok.data {
					object.insert("data".into(), data.clone());
				}
				if let Some(message) = &ok.message {
					object.insert("message".into(), Value::String(message.clone()));
				}

				object.insert("httpStatus".into(), Value::from(ok.status));
			},
			Self::Failure(failure) => {
				object.extend(failure.extra.clone());
				object.insert("success".into(), Value::Bool(false));

				if let Some(data) = &failure.data {
					object.insert("data".into(), data.clone());
				}
				if let Some(message) = &failure.message {
					object.insert("message".into(), Value::String(message.clone()));
				}
				if let Some(code) = &failure.error_code {
					object.insert("errorCode".into(), Value::String(code.clone()));
				}
				if let Some(status) = failure.status {
					object.insert("httpStatus".into(), Value::from(status));
				}
			},
		}

		Value::Object(object)
	}
}
impl<T> ApiResult<T> {
	/// Returns true for [`ApiResult::Ok`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Ok(_))
	}

	/// HTTP status code, absent only for transport failures.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Ok(ok) => Some(ok.status),
			Self::Failure(failure) => failure.status,
		}
	}

	/// Message supplied by the backend or synthesized locally.
	pub fn message(&self) -> Option<&str> {
		match self {
			Self::Ok(ok) => ok.message.as_deref(),
			Self::Failure(failure) => failure.message.as_deref(),
		}
	}

	/// Machine-readable failure code, if any.
	pub fn error_code(&self) -> Option<&str> {
		match self {
			Self::Ok(_) => None,
			Self::Failure(failure) => failure.error_code.as_deref(),
		}
	}

	/// Failure category, if the call failed.
	pub fn failure_kind(&self) -> Option<FailureKind> {
		match self {
			Self::Ok(_) => None,
			Self::Failure(failure) => Some(failure.kind),
		}
	}

	/// Converts into a standard [`Result`], for callers that prefer `?`.
	pub fn into_result(self) -> Result<ApiSuccess<T>, ApiFailure> {
		match self {
			Self::Ok(ok) => Ok(ok),
			Self::Failure(failure) => Err(failure),
		}
	}
}
impl<T> From<ApiFailure> for ApiResult<T> {
	fn from(failure: ApiFailure) -> Self {
		Self::Failure(failure)
	}
}
