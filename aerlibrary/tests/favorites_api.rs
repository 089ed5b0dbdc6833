//! Integration tests for the liked-tracks client

use aerlibrary::{Error, FavoritesClient, Session, StaticAuthProvider};
use chrono::{Duration, Utc};
use std::sync::Arc;
use wiremock::matchers::{bearer_token, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session() -> Session {
    Session {
        user_id: "u-1".into(),
        role: "listener".into(),
        expires_at: Utc::now() + Duration::hours(1),
        token: "secret-token".into(),
    }
}

fn signed_in_client(server: &MockServer) -> FavoritesClient {
    let auth = Arc::new(StaticAuthProvider::with_session(session()));
    FavoritesClient::new(&server.uri(), auth).unwrap()
}

#[tokio::test]
async fn list_works_anonymously() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"title": "Roygbiv", "artist": "Boards of Canada"},
            {"title": "Xtal", "artist": "Aphex Twin"}
        ])))
        .mount(&server)
        .await;

    let auth = Arc::new(StaticAuthProvider::anonymous());
    let client = FavoritesClient::new(&server.uri(), auth).unwrap();

    let tracks = client.list().await.unwrap();
    assert_eq!(tracks.len(), 2);
    assert!(client.contains("Xtal", "Aphex Twin").await.unwrap());
    assert!(!client.contains("Xtal", "Autechre").await.unwrap());
}

#[tokio::test]
async fn add_sends_the_bearer_token_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/favorites"))
        .and(bearer_token("secret-token"))
        .and(body_json(serde_json::json!({
            "title": "Roygbiv",
            "artist": "Boards of Canada"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    client.add("Roygbiv", "Boards of Canada").await.unwrap();
}

#[tokio::test]
async fn remove_sends_the_bearer_token_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/favorites"))
        .and(bearer_token("secret-token"))
        .and(body_json(serde_json::json!({
            "title": "Xtal",
            "artist": "Aphex Twin"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    client.remove("Xtal", "Aphex Twin").await.unwrap();
}

#[tokio::test]
async fn mutations_without_a_session_are_refused_locally() {
    let server = MockServer::start().await;
    // No mock mounted: the request must never leave the client.
    let auth = Arc::new(StaticAuthProvider::anonymous());
    let client = FavoritesClient::new(&server.uri(), auth).unwrap();

    assert!(matches!(
        client.add("Roygbiv", "Boards of Canada").await,
        Err(Error::NoSession)
    ));
    assert!(matches!(
        client.remove("Roygbiv", "Boards of Canada").await,
        Err(Error::NoSession)
    ));
}

#[tokio::test]
async fn expired_sessions_count_as_signed_out() {
    let server = MockServer::start().await;
    let expired = Session {
        expires_at: Utc::now() - Duration::seconds(5),
        ..session()
    };
    let auth = Arc::new(StaticAuthProvider::with_session(expired));
    let client = FavoritesClient::new(&server.uri(), auth).unwrap();

    assert!(matches!(
        client.add("Roygbiv", "Boards of Canada").await,
        Err(Error::NoSession)
    ));
}

#[tokio::test]
async fn service_rejections_surface_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/favorites"))
        .respond_with(ResponseTemplate::new(409).set_body_string("already liked"))
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    match client.add("Roygbiv", "Boards of Canada").await {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 409);
            assert_eq!(message, "already liked");
        }
        other => panic!("expected Api error, got {:?}", other.err()),
    }
}
