#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use api_session::{
	_preludet::*,
	api::FailureKind,
	auth::Credential,
	http::{ApiRequest, MultipartBody},
};

fn api_base(server: &MockServer) -> String {
	format!("{}/api", server.base_url())
}

#[tokio::test]
async fn bearer_request_round_trips_through_reqwest() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&api_base(&server));

	store.replace(Some(Credential::bearer("T1")));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/cart/items")
				.header("authorization", "Bearer T1")
				.header("content-type", "application/json")
				.json_body(json!({ "productId": 17, "quantity": 2 }));
			then.status(201)
				.header("content-type", "application/json")
				.json_body(json!({
					"success": true,
					"data": { "cartSize": 3 },
					"message": "Added"
				}));
		})
		.await;
	let request = ApiRequest::post("/cart/items")
		.with_json(&json!({ "productId": 17, "quantity": 2 }))
		.expect("Cart body should encode.");
	let result = client.issue_request(request).await;

	mock.assert_async().await;

	assert_eq!(
		result.to_value(),
		json!({ "success": true, "data": { "cartSize": 3 }, "message": "Added", "httpStatus": 201 })
	);
}

#[tokio::test]
async fn expired_token_renews_with_refresh_cookie() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&api_base(&server));
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.header("set-cookie", "refreshToken=r1; Path=/; HttpOnly")
				.json_body(json!({
					"success": true,
					"data": { "accessToken": "T1", "tokenType": "Bearer", "user": { "id": 9 } }
				}));
		})
		.await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/staff/appointments").header("authorization", "Bearer T1");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "success": false, "errorCode": "TOKEN_EXPIRED" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/refresh-token")
				.header("cookie", "refreshToken=r1")
				.header("content-type", "application/json");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"success": true,
				"data": { "accessToken": "T2", "tokenType": "Bearer" }
			}));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/staff/appointments").header("authorization", "Bearer T2");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "success": true, "data": [{ "id": 4 }] }));
		})
		.await;
	let signed_in = client
		.sign_in(
			ApiRequest::post("/auth/login")
				.with_json(&json!({ "email": "ana@example.com", "password": "hunter2" }))
				.expect("Login body should encode."),
		)
		.await;

	assert!(signed_in.is_success());
	assert_eq!(store.snapshot(), Some(Credential::bearer("T1")));

	let result = client.issue_request(ApiRequest::get("/staff/appointments")).await;

	login.assert_async().await;
	stale.assert_async().await;
	refresh.assert_async().await;
	fresh.assert_async().await;

	assert_eq!(
		result.to_value(),
		json!({ "success": true, "data": [{ "id": 4 }], "httpStatus": 200 })
	);
	assert_eq!(store.snapshot(), Some(Credential::bearer("T2")));
}

#[tokio::test]
async fn rejected_refresh_reports_session_expired() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&api_base(&server));

	store.replace(Some(Credential::bearer("T1")));

	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/reports");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "success": false, "errorCode": "TOKEN_EXPIRED" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh-token");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "success": false, "message": "Refresh token missing" }));
		})
		.await;
	let result = client.issue_request(ApiRequest::get("/admin/reports")).await;

	stale.assert_async().await;
	refresh.assert_async().await;

	assert_eq!(result.failure_kind(), Some(FailureKind::SessionInvalidated));
	assert_eq!(result.status(), Some(401));
	assert_eq!(result.error_code(), Some("TOKEN_EXPIRED"));
	assert_eq!(store.snapshot(), None);
}

#[tokio::test]
async fn server_errors_still_decode_as_envelopes() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(&api_base(&server));
	let mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/api/products/5");
			then.status(409).header("content-type", "application/json").json_body(json!({
				"success": false,
				"message": "Product has open orders",
				"errorCode": "CONFLICT"
			}));
		})
		.await;
	let result = client.issue_request(ApiRequest::delete("/products/5")).await;

	mock.assert_async().await;

	assert_eq!(result.failure_kind(), Some(FailureKind::Application));
	assert_eq!(result.status(), Some(409));
	assert_eq!(result.message(), Some("Product has open orders"));
}

#[tokio::test]
async fn multipart_upload_reaches_server() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(&api_base(&server));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/products/5/images");
			then.status(201)
				.header("content-type", "application/json")
				.json_body(json!({ "success": true, "data": { "imageId": 12 } }));
		})
		.await;
	let form = MultipartBody::new().text("alt", "Front view").file(
		"image",
		"front.png",
		Some("image/png"),
		vec![0x89_u8, 0x50, 0x4E, 0x47],
	);
	let result =
		client.issue_request(ApiRequest::post("/products/5/images").with_multipart(form)).await;

	mock.assert_async().await;

	assert_eq!(result.status(), Some(201));
}

#[tokio::test]
async fn unreachable_host_yields_network_error() {
	let (client, store) = build_reqwest_test_client("http://127.0.0.1:9/api");

	store.replace(Some(Credential::bearer("T1")));

	let result = client.issue_request(ApiRequest::get("/products")).await;

	assert_eq!(
		result.to_value(),
		json!({ "success": false, "message": "Network error. Please try again later." })
	);
	assert_eq!(store.snapshot(), Some(Credential::bearer("T1")));
}
