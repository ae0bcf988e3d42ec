//! Sign-in and sign-out helpers that manage the stored credential.

// self
use crate::{
	_prelude::*,
	api::ApiResult,
	auth::{Credential, TokenGrant},
	client::ApiClient,
	http::{ApiRequest, ApiTransport},
	obs::obs_warn,
};

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Issues a login or registration request and stores the credential it returns.
	///
	/// The result is handed back unchanged. A successful answer without an
	/// `accessToken`/`tokenType` pair leaves the store as it was.
	pub async fn sign_in(&self, request: ApiRequest) -> ApiResult {
		let result = self.issue_request(request).await;

		if let ApiResult::Ok(ok) = &result {
			match TokenGrant::from_data(ok.data.as_ref().unwrap_or(&Value::Null)) {
				Ok(grant) =>
					if let Err(err) = self.store.set(Credential::from(grant)).await {
						obs_warn!(error = %err, "Signed-in credential could not be persisted");
					},
				Err(err) => {
					obs_warn!(error = %err, "Sign-in response carried no token grant");
				},
			}
		}

		result
	}

	/// Ends the session: calls the configured logout endpoint (if any) and clears the store.
	///
	/// The store is cleared even when the logout call fails. Returns the logout call's result
	/// when one was made.
	pub async fn sign_out(&self) -> Option<ApiResult> {
		let outcome = match self.config.logout_path() {
			Some(path) => Some(self.issue_request(ApiRequest::post(path)).await),
			None => None,
		};

		self.invalidate_session().await;

		outcome
	}

	/// Returns the stored credential, if any.
	pub async fn credential(&self) -> Option<Credential> {
		self.load_credential().await
	}
}
