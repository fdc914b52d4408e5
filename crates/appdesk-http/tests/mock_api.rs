//! Mock API tests for the appdesk HTTP client.
//!
//! These tests use wiremock to simulate the API server and exercise token
//! refresh, replay and error normalization end to end.

use std::sync::Arc;
use std::time::Duration;

use appdesk_core::{
    AccessToken, ApiUrl, Credentials, ErrorKind, MemoryTokenStore, Resource, TokenStore,
};
use appdesk_http::{ApiClient, RefreshPhase, endpoints};
use futures_util::future::join_all;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to build a client against a mock server with a pre-set token.
fn client_for(server: &MockServer, token: Option<&str>) -> (ApiClient, Arc<MemoryTokenStore>) {
    let api = ApiUrl::new(format!("{}/api", server.uri())).unwrap();
    let store = Arc::new(match token {
        Some(token) => MemoryTokenStore::with_token(AccessToken::new(token)),
        None => MemoryTokenStore::new(),
    });
    let client = ApiClient::connect(api, Arc::clone(&store) as Arc<dyn TokenStore>).unwrap();
    (client, store)
}

async fn mount_applications(server: &MockServer, token: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path("/api/applications/"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(if status == 200 {
            json!([{ "id": 1, "identifier": "A-1" }])
        } else {
            json!({ "detail": "Given token not valid for any token type" })
        }))
        .mount(server)
        .await;
}

fn bearer_requests(requests: &[wiremock::Request], url_path: &str, token: &str) -> usize {
    let expected = format!("Bearer {}", token);
    requests
        .iter()
        .filter(|r| r.url.path() == url_path)
        .filter(|r| {
            r.headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some(expected.as_str())
        })
        .count()
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_login_stores_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login/"))
        .and(body_json(json!({
            "username": "alice",
            "password": "secret123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1"
        })))
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, None);
    assert!(!client.is_authenticated());

    let output = client
        .login(&Credentials::new("alice", "secret123"))
        .await
        .unwrap();

    assert_eq!(output.access_token, AccessToken::new("access-1"));
    assert_eq!(store.get(), Some(AccessToken::new("access-1")));
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn test_login_failure_is_not_refreshed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Invalid credentials."
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "never"
        })))
        .expect(0)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, Some("stale"));
    let err = client
        .login(&Credentials::new("alice", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), 401);
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(err.message(), "Invalid credentials.");

    // A failed login does not end the existing session.
    assert_eq!(store.get(), Some(AccessToken::new("stale")));
}

#[tokio::test]
async fn test_register_stores_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/register/"))
        .and(body_json(json!({
            "username": "bob",
            "password": "pw",
            "password2": "pw"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "User registered",
            "access_token": "access-bob"
        })))
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, None);
    let output = client
        .register(&appdesk_core::Registration::new("bob", None, "pw", "pw"))
        .await
        .unwrap();

    assert_eq!(output.message.as_deref(), Some("User registered"));
    assert_eq!(store.get(), Some(AccessToken::new("access-bob")));
}

#[tokio::test]
async fn test_logout_clears_token_even_on_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/logout/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "detail": "Internal server error."
        })))
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, Some("access-1"));
    let err = client.logout().await.unwrap_err();

    assert_eq!(err.status(), 500);
    assert!(store.get().is_none());
}

// ============================================================================
// Refresh Tests
// ============================================================================

#[tokio::test]
async fn test_expired_token_is_refreshed_and_replayed() {
    let server = MockServer::start().await;

    mount_applications(&server, "old", 401).await;
    mount_applications(&server, "new", 200).await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, Some("old"));
    let items = client.list(Resource::Applications).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(store.get(), Some(AccessToken::new("new")));
    assert_eq!(client.coordinator().phase(), RefreshPhase::Idle);
}

#[tokio::test]
async fn test_concurrent_failures_trigger_one_refresh() {
    let server = MockServer::start().await;

    mount_applications(&server, "old", 401).await;
    mount_applications(&server, "new", 200).await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "new" }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, Some("old"));

    let calls = (0..5).map(|_| client.list(Resource::Applications));
    let results = join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap().len(), 1);
    }
    assert_eq!(store.get(), Some(AccessToken::new("new")));
    assert_eq!(client.coordinator().queued(), 0);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(bearer_requests(&requests, "/api/applications/", "old"), 5);
    assert_eq!(bearer_requests(&requests, "/api/applications/", "new"), 5);

    let refresh: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/token/refresh/")
        .collect();
    assert_eq!(refresh.len(), 1);
    assert!(refresh[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_refresh_failure_rejects_all_and_clears_token() {
    let server = MockServer::start().await;

    mount_applications(&server, "old", 401).await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "Refresh token missing." }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, Some("old"));

    let calls = (0..3).map(|_| client.list(Resource::Applications));
    let results = join_all(calls).await;

    for result in results {
        let err = result.unwrap_err();
        assert_eq!(err.status(), 401);
        assert_eq!(err.message(), "Refresh token missing.");
    }
    assert!(store.get().is_none());
    assert_eq!(client.coordinator().phase(), RefreshPhase::Idle);
}

#[tokio::test]
async fn test_replayed_request_rejected_again_is_returned() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/applications/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "detail": "You do not have permission to perform this action."
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, Some("old"));
    let err = client.list(Resource::Applications).await.unwrap_err();

    assert_eq!(err.status(), 403);
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(store.get(), Some(AccessToken::new("new")));
}

#[tokio::test]
async fn test_refresh_sends_cookie_from_login() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "old" }))
                .insert_header("set-cookie", "refresh_token=r1; HttpOnly; Path=/"),
        )
        .mount(&server)
        .await;

    mount_applications(&server, "old", 401).await;
    mount_applications(&server, "new", 200).await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .and(header("cookie", "refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, None);
    client
        .login(&Credentials::new("alice", "secret"))
        .await
        .unwrap();

    let items = client.list(Resource::Applications).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_explicit_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/api{}", endpoints::REFRESH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "manual"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, Some("old"));
    let token = client.refresh().await.unwrap();

    assert_eq!(token, AccessToken::new("manual"));
    assert_eq!(store.get(), Some(token));
}

// ============================================================================
// Resource & Error Handling Tests
// ============================================================================

#[tokio::test]
async fn test_crud_requests_carry_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/brigades/"))
        .and(header("authorization", "Bearer t"))
        .and(body_json(json!({ "brigade": 7 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 3, "brigade": 7 })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/brigades/3/"))
        .and(header("authorization", "Bearer t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 3, "brigade": 8 })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/brigades/3/"))
        .and(header("authorization", "Bearer t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 3, "brigade": 8 })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/brigades/3/"))
        .and(header("authorization", "Bearer t"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, Some("t"));

    let created = client
        .create(Resource::Brigades, &json!({ "brigade": 7 }))
        .await
        .unwrap();
    assert_eq!(created["id"], 3);

    let updated = client
        .update(Resource::Brigades, 3, &json!({ "brigade": 8 }))
        .await
        .unwrap();
    assert_eq!(updated["brigade"], 8);

    let fetched = client.get(Resource::Brigades, 3).await.unwrap();
    assert_eq!(fetched, updated);

    client.delete(Resource::Brigades, 3).await.unwrap();
}

#[tokio::test]
async fn test_typed_applications() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/applications/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 5,
            "brigade": 2,
            "brigade_number": 14,
            "location": 1,
            "location_name": "North depot",
            "identifier": "A-0005",
            "correction": "Checked twice",
            "object_instance": 4,
            "object_name": "Pump 4",
            "status": 2,
            "status_name": "Closed",
            "start_time": "2024-03-01T08:30:00Z",
            "end_time": "2024-03-01T12:00:00Z"
        }])))
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, Some("t"));
    let apps = client.list_applications().await.unwrap();

    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].identifier, "A-0005");
    assert_eq!(apps[0].brigade_number, Some(14));
    assert!(apps[0].end_time.is_some());
}

#[tokio::test]
async fn test_validation_error_is_normalized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/applications/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "Request validation failed.",
            "errors": {
                "identifier": ["application with this identifier already exists."],
                "status": ["This field is required."]
            }
        })))
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, Some("t"));
    let err = client
        .create(Resource::Applications, &json!({ "identifier": "A-1" }))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.status(), 400);
    assert_eq!(
        err.message(),
        "Identifier: application with this identifier already exists.\nStatus: This field is required."
    );
    assert_eq!(err.field_errors().unwrap().len(), 2);
}

#[tokio::test]
async fn test_non_json_error_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/statuses/"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string("Internal Server Error")
                .insert_header("content-type", "text/plain"),
        )
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, Some("t"));
    let err = client.list(Resource::Statuses).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.status(), 500);
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let api = ApiUrl::new("http://127.0.0.1:1/api").unwrap();
    let client = ApiClient::connect(api, Arc::new(MemoryTokenStore::new())).unwrap();

    let err = client.list(Resource::Locations).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.status(), 0);
}
