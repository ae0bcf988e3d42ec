//! Authenticated JSON API client with bearer credentials, silent token renewal, and pluggable
//! credential stores.

#![deny(clippy::all, missing_docs)]
#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by unit and integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::Credential,
		client::ApiClient,
		config::ClientConfig,
		http::{ApiTransport, OutboundRequest, RawResponse, TransportFuture},
		store::{CredentialStore, MemoryStore},
	};
	#[cfg(feature = "reqwest")]
	use crate::http::ReqwestTransport;

	/// Scripted reply served by [`RecordingTransport`].
	#[derive(Clone, Debug)]
	pub enum ScriptedReply {
		/// Responds with the given status and JSON body.
		Json(u16, serde_json::Value),
		/// Responds with the given status and raw body bytes.
		Raw(u16, Vec<u8>),
		/// Fails the exchange at the transport level.
		Unreachable,
	}

	/// In-process transport that replays scripted replies and records every outbound request.
	///
	/// Replies are consumed in order; once the script runs dry every further exchange fails at
	/// the transport level so unexpected calls surface in assertions.
	#[derive(Clone, Debug, Default)]
	pub struct RecordingTransport {
		script: Arc<Mutex<VecDeque<ScriptedReply>>>,
		sent: Arc<Mutex<Vec<OutboundRequest>>>,
	}
	impl RecordingTransport {
		/// Creates a transport that serves `replies` in order.
		pub fn scripted(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
			Self {
				script: Arc::new(Mutex::new(replies.into_iter().collect())),
				sent: Default::default(),
			}
		}

		/// Appends another reply to the script.
		pub fn push(&self, reply: ScriptedReply) {
			self.script.lock().push_back(reply);
		}

		/// Returns a snapshot of every request sent so far.
		pub fn sent(&self) -> Vec<OutboundRequest> {
			self.sent.lock().clone()
		}

		/// Number of requests sent so far.
		pub fn calls(&self) -> usize {
			self.sent.lock().len()
		}
	}
	impl ApiTransport for RecordingTransport {
		fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
			let reply = {
				self.sent.lock().push(request);
				self.script.lock().pop_front()
			};

			Box::pin(async move {
				match reply {
					Some(ScriptedReply::Json(status, body)) => Ok(RawResponse {
						status,
						body: serde_json::to_vec(&body)
							.expect("Scripted JSON reply should serialize."),
					}),
					Some(ScriptedReply::Raw(status, body)) => Ok(RawResponse { status, body }),
					Some(ScriptedReply::Unreachable) | None => Err(TransportError::network(
						std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "unreachable"),
					)),
				}
			})
		}
	}

	/// Base URL used by tests that never touch a real socket.
	pub const TEST_BASE_URL: &str = "https://shop.example.com/api";

	/// Builds a client over a [`RecordingTransport`] and a fresh [`MemoryStore`].
	pub fn build_recording_client(
		transport: RecordingTransport,
	) -> (ApiClient<RecordingTransport>, Arc<MemoryStore>) {
		let config = ClientConfig::new(TEST_BASE_URL).expect("Test base URL should be valid.");
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();

		(ApiClient::with_transport(config, store, transport), store_backend)
	}

	/// Builds a client over a [`RecordingTransport`] whose store already holds `credential`.
	pub fn build_recording_client_with(
		transport: RecordingTransport,
		credential: Credential,
	) -> (ApiClient<RecordingTransport>, Arc<MemoryStore>) {
		let (client, store) = build_recording_client(transport);

		store.replace(Some(credential));

		(client, store)
	}

	/// Builds a reqwest-backed client pointed at `base_url` with an in-memory store.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_client(
		base_url: &str,
	) -> (ApiClient<ReqwestTransport>, Arc<MemoryStore>) {
		let config = ClientConfig::new(base_url).expect("Mock server base URL should be valid.");
		let transport =
			ReqwestTransport::new().expect("Failed to build cookie-aware reqwest transport.");
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();

		(ApiClient::with_transport(config, store, transport), store_backend)
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
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result, TransportError};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
