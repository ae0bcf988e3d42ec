//! Silent credential renewal after a `TOKEN_EXPIRED` response.
//!
//! [`ApiClient::issue_request`] calls into this module once per logical call at most. The
//! renewal acquires the client-wide singleflight guard and then compares the credential the
//! expired request carried with the one currently stored:
//!
//! - unchanged: this call performs the `POST` to the renewal endpoint, persists the new
//!   credential on success, and clears the store on rejection;
//! - rotated by another call: the stored credential is reused without a second renewal;
//! - cleared by another call: the session is already gone and the caller gets the
//!   session-expired failure.
//!
//! An unreadable store proves nothing about other calls, so the renewal goes ahead. A renewal
//! answer that is not JSON at all is reported like a transport failure and keeps the session.

mod metrics;

pub use metrics::RenewalMetrics;

// self
use crate::{
	_prelude::*,
	api::ApiFailure,
	auth::{Credential, TokenGrant},
	client::ApiClient,
	http::{ApiRequest, ApiTransport},
	obs::{Exchange, obs_debug, obs_warn},
};

/// Outcome of a renewal attempt as seen by the expired call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Renewal {
	/// A fresh credential is stored; retry the original request with it.
	Renewed(Credential),
	/// The renewal endpoint refused; the store has been cleared.
	Rejected,
	/// The renewal exchange never completed; the store is untouched.
	Unreachable(ApiFailure),
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	pub(crate) async fn renew(&self, sent_with: Option<&Credential>) -> Renewal {
		let _singleflight = self.renewal_guard.lock().await;
		let current = match self.store.get().await {
			Ok(current) => current,
			Err(err) => {
				obs_warn!(error = %err, "Credential store read failed; renewing anyway");

				sent_with.cloned()
			},
		};

		if !same_token(sent_with, current.as_ref()) {
			self.renewal_metrics.record_coalesced();
			obs_debug!(rotated = current.is_some(), "Credential changed while waiting to renew");

			return match current {
				Some(credential) => Renewal::Renewed(credential),
				None => Renewal::Rejected,
			};
		}

		self.renewal_metrics.record_attempt();

		let request = ApiRequest::post(self.config.refresh_path());
		let grant = match self.exchange(Exchange::Renewal, &request, None).await {
			Ok((_, envelope)) if envelope.success => TokenGrant::from_data(envelope.data_or_null()),
			Ok((status, _)) => {
				obs_debug!(status, "Renewal endpoint rejected the session");

				return self.reject().await;
			},
			Err(_) => {
				self.renewal_metrics.record_failure();

				return Renewal::Unreachable(ApiFailure::network());
			},
		};
		let credential = match grant {
			Ok(grant) => Credential::from(grant),
			Err(err) => {
				obs_warn!(error = %err, "Renewal response is not a usable token grant");

				return self.reject().await;
			},
		};

		if let Err(err) = self.store.set(credential.clone()).await {
			obs_warn!(error = %err, "Renewed credential could not be persisted");
		}

		self.renewal_metrics.record_success();

		Renewal::Renewed(credential)
	}

	async fn reject(&self) -> Renewal {
		self.invalidate_session().await;
		self.renewal_metrics.record_failure();

		Renewal::Rejected
	}
}

fn same_token(sent_with: Option<&Credential>, current: Option<&Credential>) -> bool {
	match (sent_with, current) {
		(None, None) => true,
		(Some(sent), Some(current)) => sent.same_token(current),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::_preludet::{RecordingTransport, ScriptedReply, build_recording_client_with};

	#[test]
	fn same_token_compares_access_tokens_only() {
		let t1 = Credential::bearer("T1");

		assert!(same_token(None, None));
		assert!(same_token(Some(&t1), Some(&Credential::new("T1", "JWT"))));
		assert!(!same_token(Some(&t1), Some(&Credential::bearer("T2"))));
		assert!(!same_token(Some(&t1), None));
		assert!(!same_token(None, Some(&t1)));
	}

	#[tokio::test]
	async fn renewal_sends_bare_post_to_refresh_endpoint() {
		let transport = RecordingTransport::scripted([ScriptedReply::Json(
			200,
			json!({ "success": true, "data": { "accessToken": "T2", "tokenType": "Bearer" } }),
		)]);
		let (client, store) =
			build_recording_client_with(transport.clone(), Credential::bearer("T1"));
		let outcome = client.renew(Some(&Credential::bearer("T1"))).await;

		assert_eq!(outcome, Renewal::Renewed(Credential::bearer("T2")));
		assert_eq!(store.snapshot(), Some(Credential::bearer("T2")));

		let sent = transport.sent();

		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].url.as_str(), "https://shop.example.com/api/auth/refresh-token");
		assert_eq!(sent[0].method, crate::http::Method::Post);
		assert_eq!(sent[0].content_type, Some("application/json"));
		assert_eq!(sent[0].authorization, None);
		assert_eq!(sent[0].body, crate::http::OutboundBody::Empty);
		assert_eq!(client.renewal_metrics.successes(), 1);
	}

	#[tokio::test]
	async fn rotated_credential_skips_renewal_call() {
		let transport = RecordingTransport::default();
		let (client, _) = build_recording_client_with(transport.clone(), Credential::bearer("T2"));
		let outcome = client.renew(Some(&Credential::bearer("T1"))).await;

		assert_eq!(outcome, Renewal::Renewed(Credential::bearer("T2")));
		assert_eq!(transport.calls(), 0);
		assert_eq!(client.renewal_metrics.coalesced(), 1);
		assert_eq!(client.renewal_metrics.attempts(), 0);
	}

	#[tokio::test]
	async fn grant_without_token_rejects_and_clears() {
		let transport =
			RecordingTransport::scripted([ScriptedReply::Json(200, json!({ "success": true }))]);
		let (client, store) = build_recording_client_with(transport, Credential::bearer("T1"));

		assert_eq!(client.renew(Some(&Credential::bearer("T1"))).await, Renewal::Rejected);
		assert_eq!(store.snapshot(), None);
		assert_eq!(client.renewal_metrics.failures(), 1);
	}

	#[tokio::test]
	async fn non_json_renewal_answer_keeps_store() {
		let bad_gateway = ScriptedReply::Raw(502, b"<h1>Bad Gateway</h1>".to_vec());
		let transport = RecordingTransport::scripted([bad_gateway]);
		let (client, store) = build_recording_client_with(transport, Credential::bearer("T1"));

		assert_eq!(
			client.renew(Some(&Credential::bearer("T1"))).await,
			Renewal::Unreachable(ApiFailure::network())
		);
		assert_eq!(store.snapshot(), Some(Credential::bearer("T1")));
		assert_eq!(client.renewal_metrics.failures(), 1);
	}

	#[tokio::test]
	async fn unreachable_renewal_keeps_store() {
		let transport = RecordingTransport::scripted([ScriptedReply::Unreachable]);
		let (client, store) = build_recording_client_with(transport, Credential::bearer("T1"));

		assert_eq!(
			client.renew(Some(&Credential::bearer("T1"))).await,
			Renewal::Unreachable(ApiFailure::network())
		);
		assert_eq!(store.snapshot(), Some(Credential::bearer("T1")));
	}
}
