//! The authenticated client: header construction, response decoding, and silent renewal.

pub mod renewal;

mod session;

pub use renewal::*;

// self
use crate::{
	_prelude::*,
	api::{ApiFailure, ApiResult, Envelope},
	auth::Credential,
	config::ClientConfig,
	http::{
		ApiRequest, ApiTransport, JSON_CONTENT_TYPE, OutboundBody, OutboundRequest, RequestBody,
	},
	obs::{self, Exchange, ExchangeOutcome, ExchangeSpan, obs_warn},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Issues API calls with the stored credential and renews it transparently on expiry.
///
/// Every call resolves to an [`ApiResult`]. A `TOKEN_EXPIRED` answer triggers one call to the
/// renewal endpoint and one retry of the original request; a rejected renewal clears the store
/// and yields the session-expired failure. Renewals are serialized through a singleflight guard
/// so concurrent expired calls share one renewal instead of racing each other.
#[derive(Clone)]
pub struct ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Transport used for every outbound exchange.
	pub transport: Arc<T>,
	/// Store holding the active credential.
	pub store: Arc<dyn CredentialStore>,
	/// Endpoint layout.
	pub config: ClientConfig,
	/// Shared counters for renewal outcomes.
	pub renewal_metrics: Arc<RenewalMetrics>,
	renewal_guard: Arc<AsyncMutex<()>>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client over the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			config,
			renewal_metrics: Default::default(),
			renewal_guard: Default::default(),
		}
	}

	/// Performs one logical API call.
	///
	/// Never fails: transport errors, backend failures, and rejected renewals all come back as
	/// [`ApiResult::Failure`].
	pub async fn issue_request(&self, request: ApiRequest) -> ApiResult {
		let sent_with = self.load_credential().await;
		let (status, envelope) =
			match self.exchange(Exchange::Original, &request, sent_with.as_ref()).await {
				Ok(answer) => answer,
				Err(err) => return ApiFailure::from_error(&err).into(),
			};

		if !envelope.is_token_expired() {
			return ApiResult::from_envelope(envelope, status);
		}

		match self.renew(sent_with.as_ref()).await {
			Renewal::Renewed(credential) =>
				match self.exchange(Exchange::Retry, &request, Some(&credential)).await {
					Ok((status, envelope)) => ApiResult::from_envelope(envelope, status),
					Err(err) => ApiFailure::from_error(&err).into(),
				},
			Renewal::Rejected => ApiFailure::session_expired().into(),
			Renewal::Unreachable(failure) => failure.into(),
		}
	}

	/// Performs one logical API call and decodes `data` into `D`.
	pub async fn issue_typed<D>(&self, request: ApiRequest) -> ApiResult<D>
	where
		D: DeserializeOwned,
	{
		self.issue_request(request).await.into_typed()
	}

	/// Sends one request and decodes its envelope.
	async fn exchange(
		&self,
		exchange: Exchange,
		request: &ApiRequest,
		credential: Option<&Credential>,
	) -> Result<(u16, Envelope)> {
		let span = ExchangeSpan::new(exchange, request.method);

		obs::record_exchange(exchange, ExchangeOutcome::Attempt);

		let result: Result<(u16, Envelope)> = span
			.instrument(async {
				let outbound = self.outbound(request, credential)?;
				let raw = self.transport.send(outbound).await?;
				let envelope = Envelope::decode(&raw)?;

				Ok((raw.status, envelope))
			})
			.await;

		match &result {
			Ok((_, envelope)) if envelope.success =>
				obs::record_exchange(exchange, ExchangeOutcome::Success),
			Ok(_) => obs::record_exchange(exchange, ExchangeOutcome::Failure),
			Err(err) => {
				obs_warn!(exchange = exchange.as_str(), error = %err, "API exchange failed");
				obs::record_exchange(exchange, ExchangeOutcome::Failure);
			},
		}

		result
	}

	fn outbound(
		&self,
		request: &ApiRequest,
		credential: Option<&Credential>,
	) -> Result<OutboundRequest> {
		let url = self.config.endpoint(&request.path)?;
		let (content_type, body) = match &request.body {
			RequestBody::Empty => (Some(JSON_CONTENT_TYPE), OutboundBody::Empty),
			RequestBody::Json(value) => (
				Some(JSON_CONTENT_TYPE),
				OutboundBody::Bytes(serde_json::to_vec(value).map_err(Error::Encode)?),
			),
			RequestBody::Multipart(form) => (None, OutboundBody::Multipart(form.clone())),
		};

		Ok(OutboundRequest {
			method: request.method,
			url,
			content_type,
			authorization: credential.map(Credential::authorization),
			body,
		})
	}

	/// Reads the store; a failing store is treated as holding no credential.
	async fn load_credential(&self) -> Option<Credential> {
		match self.store.get().await {
			Ok(credential) => credential,
			Err(err) => {
				obs_warn!(error = %err, "Credential store read failed; sending anonymously");

				None
			},
		}
	}

	/// Clears the store; failures are logged and otherwise ignored.
	async fn invalidate_session(&self) {
		if let Err(err) = self.store.clear().await {
			obs_warn!(error = %err, "Credential store clear failed");
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client that provisions its own cookie-aware reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
		Ok(Self::with_transport(config, store, ReqwestTransport::new()?))
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url().as_str())
			.field("refresh_path", &self.config.refresh_path())
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
		_preludet::{RecordingTransport, ScriptedReply, TEST_BASE_URL, build_recording_client},
		http::{Method, MultipartBody},
		store::{StoreError, StoreFuture},
	};

	#[test]
	fn outbound_sets_json_content_type_and_authorization() {
		let (client, _) = build_recording_client(RecordingTransport::default());
		let request = ApiRequest::post("/bookings")
			.with_json(&serde_json::json!({ "serviceId": 2 }))
			.expect("Body should encode.");
		let credential = Credential::bearer("T1");
		let outbound =
			client.outbound(&request, Some(&credential)).expect("Request should resolve.");

		assert_eq!(outbound.method, Method::Post);
		assert_eq!(outbound.url.as_str(), "https://shop.example.com/api/bookings");
		assert_eq!(outbound.content_type, Some("application/json"));
		assert_eq!(outbound.authorization.as_deref(), Some("Bearer T1"));
		assert_eq!(outbound.json_body(), Some(serde_json::json!({ "serviceId": 2 })));
	}

	#[test]
	fn outbound_leaves_multipart_content_type_to_transport() {
		let (client, _) = build_recording_client(RecordingTransport::default());
		let request = ApiRequest::post("/products")
			.with_multipart(MultipartBody::new().text("name", "Argan oil"));
		let outbound = client.outbound(&request, None).expect("Request should resolve.");

		assert_eq!(outbound.content_type, None);
		assert_eq!(outbound.authorization, None);
		assert!(matches!(outbound.body, OutboundBody::Multipart(_)));
	}

	struct BrokenStore;
	impl CredentialStore for BrokenStore {
		fn get(&self) -> StoreFuture<'_, Option<Credential>> {
			Box::pin(async { Err(StoreError::Backend { message: "keychain locked".into() }) })
		}

		fn set(&self, _: Credential) -> StoreFuture<'_, ()> {
			Box::pin(async { Err(StoreError::Backend { message: "keychain locked".into() }) })
		}

		fn clear(&self) -> StoreFuture<'_, ()> {
			Box::pin(async { Err(StoreError::Backend { message: "keychain locked".into() }) })
		}
	}

	#[tokio::test]
	async fn unreadable_store_sends_anonymously() {
		let transport = RecordingTransport::scripted([ScriptedReply::Json(
			200,
			serde_json::json!({ "success": true, "data": [] }),
		)]);
		let config = ClientConfig::new(TEST_BASE_URL).expect("Test base URL should be valid.");
		let client: ApiClient<RecordingTransport> =
			ApiClient::with_transport(config, Arc::new(BrokenStore), transport.clone());
		let result = client.issue_request(ApiRequest::get("/services")).await;

		assert!(result.is_success());
		assert_eq!(transport.sent()[0].authorization, None);
	}

	#[tokio::test]
	async fn unreadable_store_during_renewal_still_refreshes() {
		let transport = RecordingTransport::scripted([ScriptedReply::Json(
			200,
			serde_json::json!({
				"success": true,
				"data": { "accessToken": "T2", "tokenType": "Bearer" }
			}),
		)]);
		let config = ClientConfig::new(TEST_BASE_URL).expect("Test base URL should be valid.");
		let client: ApiClient<RecordingTransport> =
			ApiClient::with_transport(config, Arc::new(BrokenStore), transport.clone());

		assert_eq!(
			client.renew(Some(&Credential::bearer("T1"))).await,
			Renewal::Renewed(Credential::bearer("T2"))
		);
		assert_eq!(transport.calls(), 1);
		assert_eq!(client.renewal_metrics.coalesced(), 0);
	}

	/// Serves the stored credential once, then fails every later read.
	#[derive(Default)]
	struct FirstReadOnlyStore {
		reads: AtomicUsize,
		slot: Mutex<Option<Credential>>,
	}
	impl CredentialStore for FirstReadOnlyStore {
		fn get(&self) -> StoreFuture<'_, Option<Credential>> {
			Box::pin(async {
				if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
					Ok(self.slot.lock().clone())
				} else {
					Err(StoreError::Backend { message: "keychain locked".into() })
				}
			})
		}

		fn set(&self, credential: Credential) -> StoreFuture<'_, ()> {
			Box::pin(async move {
				*self.slot.lock() = Some(credential);

				Ok(())
			})
		}

		fn clear(&self) -> StoreFuture<'_, ()> {
			Box::pin(async {
				*self.slot.lock() = None;

				Ok(())
			})
		}
	}

	#[tokio::test]
	async fn store_read_failure_mid_call_does_not_end_session() {
		let transport = RecordingTransport::scripted([
			ScriptedReply::Json(
				401,
				serde_json::json!({ "success": false, "errorCode": "TOKEN_EXPIRED" }),
			),
			ScriptedReply::Json(
				200,
				serde_json::json!({
					"success": true,
					"data": { "accessToken": "T2", "tokenType": "Bearer" }
				}),
			),
			ScriptedReply::Json(200, serde_json::json!({ "success": true, "data": [] })),
		]);
		let store = Arc::new(FirstReadOnlyStore::default());

		*store.slot.lock() = Some(Credential::bearer("T1"));

		let config = ClientConfig::new(TEST_BASE_URL).expect("Test base URL should be valid.");
		let client: ApiClient<RecordingTransport> =
			ApiClient::with_transport(config, store.clone(), transport.clone());
		let result = client.issue_request(ApiRequest::get("/bookings")).await;

		assert!(result.is_success());

		let sent = transport.sent();

		assert_eq!(sent.len(), 3);
		assert_eq!(sent[0].authorization.as_deref(), Some("Bearer T1"));
		assert_eq!(sent[1].url.path(), "/api/auth/refresh-token");
		assert_eq!(sent[2].authorization.as_deref(), Some("Bearer T2"));
		assert_eq!(*store.slot.lock(), Some(Credential::bearer("T2")));
	}
}
