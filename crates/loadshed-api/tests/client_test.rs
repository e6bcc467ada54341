// Integration tests for `ApiClient` using wiremock.

use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use loadshed_api::{
    ApiClient, Error, Operation, PackedTime, ReconnectPolicy, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

async fn mount_json(server: &MockServer, at: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_stage() {
    let (server, client) = setup().await;
    mount_json(&server, "/api/stage", json!({ "stage": 6 })).await;

    let reading = client.stage().await.unwrap();
    assert_eq!(reading.stage, 6);
}

#[tokio::test]
async fn test_stage_null_reads_as_zero() {
    let (server, client) = setup().await;
    mount_json(&server, "/api/stage", json!({ "stage": null })).await;

    assert_eq!(client.stage().await.unwrap().stage, 0);
}

#[tokio::test]
async fn test_provinces_keep_server_order() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/provinces",
        json!(["Western Cape", "Gauteng", "Free State"]),
    )
    .await;

    let provinces = client.provinces().await.unwrap();
    assert_eq!(provinces, vec!["Western Cape", "Gauteng", "Free State"]);
}

#[tokio::test]
async fn test_towns_for_province_with_space() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/towns/North%20West",
        json!([
            { "name": "Rustenburg", "province": "North West" },
            { "name": "Mahikeng" }
        ]),
    )
    .await;

    let towns = client.towns("North West").await.unwrap();
    assert_eq!(towns.len(), 2);
    assert_eq!(towns[0].name, "Rustenburg");
    assert_eq!(towns[0].extra["province"], "North West");
    assert_eq!(towns[1].name, "Mahikeng");
}

#[tokio::test]
async fn test_schedule_path_encodes_each_segment() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/schedule/Gauteng/Soweto%2FEast",
        json!({
            "startDate": "2024-05-01",
            "days": [
                { "slots": [ { "start": [2], "end": [4, 30] } ] },
                { "slots": [] }
            ]
        }),
    )
    .await;

    let schedule = client.schedule("Gauteng", "Soweto/East").await.unwrap();
    assert_eq!(schedule.start_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    assert_eq!(schedule.days.len(), 2);
    assert_eq!(
        schedule.days[0].slots[0].end,
        Some(PackedTime::Parts(vec![4, 30]))
    );
    assert!(schedule.days[1].slots.is_empty());
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_not_found_maps_to_status_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/schedule/Gauteng/Nowhere"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.schedule("Gauteng", "Nowhere").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Status {
            operation: Operation::Schedule,
            status: 404
        }
    ));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/provinces"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.provinces().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_keeps_raw_text() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/towns/Limpopo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.towns("Limpopo").await.unwrap_err();
    match err {
        Error::Deserialization {
            operation, body, ..
        } => {
            assert_eq!(operation, Operation::Towns);
            assert_eq!(body, "<html>oops</html>");
        }
        other => panic!("expected Deserialization, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_identifiers_never_hit_the_network() {
    let (server, client) = setup().await;

    let err = client.schedule("Gauteng", "").await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidArgument {
            operation: Operation::Schedule,
            field: "town"
        }
    ));

    let err = client.towns("").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { field: "province", .. }));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Bind then drop a server so the port is closed.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let client = ApiClient::from_reqwest(&uri, reqwest::Client::new()).unwrap();

    let err = client.stage().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport {
            operation: Operation::Stage,
            ..
        }
    ));
    assert_eq!(err.status(), None);
}

// ── Event stream tests ──────────────────────────────────────────────

#[tokio::test]
async fn test_stage_updates_broadcasts_events() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/stage-updates"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(
                    ": hello\n\nevent: stage-update\ndata: {\"stage\":3}\n\nretry: 50\n\n",
                ),
        )
        .mount(&server)
        .await;

    let policy = ReconnectPolicy {
        retry: Duration::from_millis(50),
        max_retries: None,
    };
    let handle = client
        .stage_updates(&TransportConfig::default(), policy, CancellationToken::new())
        .unwrap();
    let mut rx = handle.subscribe();

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.event, "stage-update");
    assert_eq!(event.data, "{\"stage\":3}");

    // The body ends, so the stream reconnects and delivers it again.
    let again = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.data, "{\"stage\":3}");

    handle.shutdown();
    assert!(handle.is_shut_down());
}
