//! Integration tests for the admin sync client

use aeradmin::{Error, SyncStreamClient, SyncTarget};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &str = concat!(
    r#"{"pub":{"message":"Sync Started"}}"#,
    "\n",
    r#"{"message":"Skipping track 1 of 3"}"#,
    "\n",
    r#"{"message":"Processing query batch"}"#,
    "\n",
    r#"{"message":"Imported 2 new tracks"}"#,
    "\n",
    r#"{"pub":{"message":"Sync Finished"}}"#,
    "\n",
);

#[tokio::test]
async fn sync_returns_filtered_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/sync"))
        .and(bearer_token("admin-token"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(BODY, "application/x-ndjson"))
        .expect(1)
        .mount(&server)
        .await;

    let client = SyncStreamClient::new(&server.uri(), Some("admin-token".into())).unwrap();
    let lines = client.run(SyncTarget::All).await.unwrap();

    assert_eq!(
        lines,
        vec![
            "Sync Started".to_string(),
            "Imported 2 new tracks".to_string(),
            "Sync Finished".to_string(),
        ]
    );
}

#[tokio::test]
async fn playlist_sync_hits_the_scoped_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/sync/playlist/morning-mix"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("Playlist refresh Complete\n", "application/x-ndjson"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = SyncStreamClient::new(&server.uri(), None).unwrap();
    let lines = client
        .run(SyncTarget::Playlist("morning-mix".into()))
        .await
        .unwrap();
    assert_eq!(lines, vec!["Playlist refresh Complete".to_string()]);
}

#[tokio::test]
async fn client_errors_are_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/sync"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let client = SyncStreamClient::new(&server.uri(), None).unwrap();
    match client.run(SyncTarget::All).await {
        Err(Error::Rejected { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "forbidden");
        }
        other => panic!("expected Rejected, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn too_many_requests_is_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/sync"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = SyncStreamClient::new(&server.uri(), None).unwrap();
    assert!(matches!(
        client.run(SyncTarget::All).await,
        Err(Error::RateLimited)
    ));
}

#[tokio::test]
async fn starting_a_new_sync_aborts_the_running_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/sync"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(BODY, "application/x-ndjson")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/sync/playlist/p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("Playlist refresh Complete\n", "application/x-ndjson"),
        )
        .mount(&server)
        .await;

    let client = Arc::new(SyncStreamClient::new(&server.uri(), None).unwrap());

    let slow = {
        let client = client.clone();
        tokio::spawn(async move { client.run(SyncTarget::All).await })
    };
    // Let the slow sync get its request in flight first.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let fast = client.run(SyncTarget::Playlist("p1".into())).await.unwrap();
    assert_eq!(fast, vec!["Playlist refresh Complete".to_string()]);

    assert!(matches!(slow.await.unwrap(), Err(Error::Aborted)));
}

#[tokio::test]
async fn abort_is_idempotent() {
    let client = SyncStreamClient::new("https://radio.example/", None).unwrap();
    client.abort();
    client.abort();
}
