//! Request model and transport primitives.
//!
//! Callers describe a logical call with [`ApiRequest`]; the client turns it into an
//! [`OutboundRequest`] (absolute URL, headers, encoded body) and hands that to an
//! [`ApiTransport`]. The transport is the crate's only dependency on an HTTP stack, so custom
//! stacks and test doubles plug in at this seam. [`ReqwestTransport`] is the default
//! implementation and keeps a cookie jar so the server's HTTP-only refresh cookie rides along on
//! every call.

// self
use crate::_prelude::*;

/// `Content-Type` value attached to every non-multipart request.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to deliver an [`OutboundRequest`].
///
/// Implementations must include cookies on every exchange (the refresh credential lives in an
/// HTTP-only cookie) and must report only transport-level failures as errors: any HTTP status,
/// including 4xx and 5xx, is a successful exchange.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and collects the full response body.
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// HTTP methods accepted by the API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	#[default]
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the wire name of the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One part of a multipart form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultipartPart {
	/// Plain text field.
	Text {
		/// Field name.
		name: String,
		/// Field value.
		value: String,
	},
	/// File upload.
	File {
		/// Field name.
		name: String,
		/// File name reported to the server.
		file_name: String,
		/// MIME type of the content, when known.
		mime: Option<String>,
		/// Raw file bytes.
		bytes: Vec<u8>,
	},
}

/// Multipart form payload. Cloneable so the same form can be re-sent after a renewal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartBody {
	/// Parts in submission order.
	pub parts: Vec<MultipartPart>,
}
impl MultipartBody {
	/// Creates an empty form.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push(MultipartPart::Text { name: name.into(), value: value.into() });

		self
	}

	/// Appends a file field.
	pub fn file(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		mime: Option<&str>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		self.parts.push(MultipartPart::File {
			name: name.into(),
			file_name: file_name.into(),
			mime: mime.map(str::to_owned),
			bytes: bytes.into(),
		});

		self
	}
}

/// Request payload, chosen explicitly by the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body is sent.
	#[default]
	Empty,
	/// JSON document; sent with `Content-Type: application/json`.
	Json(Value),
	/// Multipart form; the transport supplies the boundary-bearing content type.
	Multipart(MultipartBody),
}
impl RequestBody {
	/// Serializes `value` into a JSON body.
	pub fn json<T>(value: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		serde_json::to_value(value).map(Self::Json).map_err(Error::Encode)
	}

	/// Returns true for multipart payloads.
	pub fn is_multipart(&self) -> bool {
		matches!(self, Self::Multipart(_))
	}
}
impl From<MultipartBody> for RequestBody {
	fn from(form: MultipartBody) -> Self {
		Self::Multipart(form)
	}
}
impl From<Value> for RequestBody {
	fn from(value: Value) -> Self {
		Self::Json(value)
	}
}

/// A logical API call: endpoint path relative to the base URL, method, and body.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// Endpoint path relative to the base URL, optionally with a query string.
	pub path: String,
	/// HTTP method.
	pub method: Method,
	/// Request payload.
	pub body: RequestBody,
}
impl ApiRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { path: path.into(), method, body: RequestBody::Empty }
	}

	/// `GET path`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// `POST path`.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// `PUT path`.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// `PATCH path`.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// `DELETE path`.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Replaces the body.
	pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
		self.body = body.into();

		self
	}

	/// Serializes `value` as the JSON body.
	pub fn with_json<T>(self, value: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		Ok(self.with_body(RequestBody::json(value)?))
	}

	/// Attaches a multipart form as the body.
	pub fn with_multipart(self, form: MultipartBody) -> Self {
		self.with_body(RequestBody::Multipart(form))
	}
}

/// Encoded body of an [`OutboundRequest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundBody {
	/// No body.
	Empty,
	/// Pre-encoded bytes (JSON).
	Bytes(Vec<u8>),
	/// Multipart form, encoded by the transport.
	Multipart(MultipartBody),
}

/// Fully resolved request handed to an [`ApiTransport`].
#[derive(Clone, PartialEq, Eq)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute endpoint URL.
	pub url: Url,
	/// `Content-Type` header; `None` for multipart and lets the transport pick the boundary.
	pub content_type: Option<&'static str>,
	/// `Authorization` header value, when a credential is present.
	pub authorization: Option<String>,
	/// Encoded body.
	pub body: OutboundBody,
}
impl OutboundRequest {
	/// Decodes a JSON body back into a [`Value`]; `None` for empty or multipart bodies.
	pub fn json_body(&self) -> Option<Value> {
		match &self.body {
			OutboundBody::Bytes(bytes) => serde_json::from_slice(bytes).ok(),
			_ => None,
		}
	}
}
impl Debug for OutboundRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OutboundRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("content_type", &self.content_type)
			.field("authorization_set", &self.authorization.is_some())
			.field("body", &self.body)
			.finish()
	}
}

/// Status code and body bytes of a completed exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw body bytes.
	pub body: Vec<u8>,
}

/// Default [`ApiTransport`] built on reqwest with a persistent cookie store.
///
/// Redirects follow reqwest's defaults; timeouts are whatever the wrapped client is configured
/// with. Build a custom [`ReqwestClient`] and pass it to [`ReqwestTransport::with_client`] to
/// change either, but keep `cookie_store(true)` or the refresh endpoint will never see its
/// cookie.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with an in-memory cookie jar.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().cookie_store(true).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn build(&self, request: OutboundRequest) -> Result<reqwest::RequestBuilder, TransportError> {
		use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		};
		let mut builder = self.0.request(method, request.url);

		if let Some(content_type) = request.content_type {
			builder = builder.header(CONTENT_TYPE, content_type);
		}
		if let Some(authorization) = request.authorization {
			builder = builder.header(AUTHORIZATION, authorization);
		}

		let builder = match request.body {
			OutboundBody::Empty => builder,
			OutboundBody::Bytes(bytes) => builder.body(bytes),
			OutboundBody::Multipart(form) => builder.multipart(multipart_form(form)?),
		};

		Ok(builder)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let response = self.build(request)?.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(RawResponse { status, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn multipart_form(form: MultipartBody) -> Result<reqwest::multipart::Form, TransportError> {
	use reqwest::multipart::{Form, Part};

	form.parts.into_iter().try_fold(Form::new(), |acc, part| {
		Ok(match part {
			MultipartPart::Text { name, value } => acc.text(name, value),
			MultipartPart::File { name, file_name, mime, bytes } => {
				let mut file = Part::bytes(bytes).file_name(file_name);

				if let Some(mime) = mime {
					file = file.mime_str(&mime)?;
				}

				acc.part(name, file)
			},
		})
	})
}
