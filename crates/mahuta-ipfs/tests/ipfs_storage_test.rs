//! Contract tests for `IpfsStorage` and `IpfsNativePinning` against a
//! wiremock IPFS node.
//!
//! | Path | Test |
//! |------|------|
//! | `/api/v0/version` | `connect_*`, `check_*` |
//! | `/api/v0/add` | `write_*` |
//! | `/api/v0/cat` | `read_*` |
//! | `/api/v0/pin/*` | `pin_*`, `unpin_*`, `list_*` |

use std::time::Duration;

use mahuta_core::{MahutaError, StorageService};
use mahuta_ipfs::{IpfsConfig, IpfsStorage};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> IpfsConfig {
    IpfsConfig {
        endpoint: server.uri().parse().unwrap(),
        timeout: Duration::from_secs(2),
        pool_size: 4,
        replicas: vec![],
        cluster_replicas: vec![],
        pinata: None,
    }
}

async fn mount_version(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v0/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Version": "0.24.0",
            "Commit": "e70db65",
            "Repo": "15"
        })))
        .mount(server)
        .await;
}

async fn connected(server: &MockServer) -> IpfsStorage {
    mount_version(server).await;
    IpfsStorage::connect(&config_for(server)).await.unwrap()
}

fn rpc_error(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(500).set_body_json(json!({
        "Message": message,
        "Code": 0,
        "Type": "error"
    }))
}

// ── connect ──────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_puts_native_pinning_first() {
    let server = MockServer::start().await;
    let storage = connected(&server).await;
    let address = server.address();
    let expected = format!("ipfs node [{}:{}]", address.ip(), address.port());

    assert_eq!(storage.name(), expected);
    assert_eq!(storage.replica_set().names(), vec![expected]);
}

#[tokio::test]
async fn connect_fails_with_connection_error_when_unreachable() {
    let config = IpfsConfig::local_mock(1).unwrap();
    let err = IpfsStorage::connect(&config).await.unwrap_err();
    assert!(matches!(err, MahutaError::Connection { .. }), "got {err:?}");
}

#[tokio::test]
async fn connect_adds_configured_cluster_replica() {
    let node = MockServer::start().await;
    let cluster = MockServer::start().await;
    mount_version(&node).await;
    Mock::given(method("GET"))
        .and(path("/id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "12D3KooW"})))
        .expect(1)
        .mount(&cluster)
        .await;

    let mut config = config_for(&node);
    config.cluster_replicas = vec![cluster.uri().parse().unwrap()];
    let storage = IpfsStorage::connect(&config).await.unwrap();

    let names = storage.replica_set().names();
    assert_eq!(names.len(), 2);
    assert!(names[0].starts_with("ipfs node ["));
    assert!(names[1].starts_with("ipfs cluster ["));
}

// ── add ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn write_adds_without_pinning_and_returns_hash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .and(query_param("pin", "false"))
        .and(query_param("stream-channels", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\"Name\":\"file\",\"Hash\":\"QmWATWQ7fVPP2EFGu71UkfnqhYXDYH566qy47CnJDgvs8u\",\"Size\":\"19\"}\n",
        ))
        .expect(1)
        .mount(&server)
        .await;
    let storage = connected(&server).await;

    let cid = storage.write(b"hello world".to_vec()).await.unwrap();
    assert_eq!(cid, "QmWATWQ7fVPP2EFGu71UkfnqhYXDYH566qy47CnJDgvs8u");
}

#[tokio::test]
async fn write_stream_consumes_the_whole_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Name": "file", "Hash": "QmStream", "Size": "4104"
        })))
        .mount(&server)
        .await;
    let storage = connected(&server).await;

    let stream = Box::new(std::io::Cursor::new(vec![7u8; 4096]));
    assert_eq!(storage.write_stream(stream).await.unwrap(), "QmStream");

    let requests = server.received_requests().await.unwrap();
    let add = requests
        .iter()
        .find(|r| r.url.path() == "/api/v0/add")
        .unwrap();
    assert!(add.body.len() >= 4096);
}

// ── cat ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn read_returns_content_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/cat"))
        .and(query_param("arg", "QmHello"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
        .mount(&server)
        .await;
    let storage = connected(&server).await;

    assert_eq!(storage.read("QmHello").await.unwrap(), b"hello world");
}

#[tokio::test]
async fn read_of_unknown_path_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/cat"))
        .respond_with(rpc_error("no link named \"missing\" under QmRoot"))
        .mount(&server)
        .await;
    let storage = connected(&server).await;

    let err = storage.read("QmRoot/missing").await.unwrap_err();
    assert!(matches!(err, MahutaError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn read_with_timeout_reports_timeout_at_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/cat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;
    let storage = connected(&server).await;

    let started = std::time::Instant::now();
    let err = storage
        .read_with_timeout("QmSlow", Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, MahutaError::Timeout(_)), "got {err:?}");
    assert!(started.elapsed() < Duration::from_millis(700));
}

// ── pin ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn pin_calls_pin_add() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/add"))
        .and(query_param("arg", "QmA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Pins": ["QmA"]})))
        .expect(1)
        .mount(&server)
        .await;
    let storage = connected(&server).await;

    storage.pin("QmA").await.unwrap();
}

#[tokio::test]
async fn unpin_of_unpinned_content_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/rm"))
        .respond_with(rpc_error("not pinned or pinned indirectly"))
        .mount(&server)
        .await;
    let storage = connected(&server).await;

    storage.unpin("QmA").await.unwrap();
    for replica in storage.replica_set().iter() {
        replica.unpin("QmA").await.unwrap();
    }
}

#[tokio::test]
async fn unpin_propagates_other_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/rm"))
        .respond_with(rpc_error("repo locked"))
        .mount(&server)
        .await;
    let storage = connected(&server).await;

    let err = storage.unpin("QmA").await.unwrap_err();
    assert!(matches!(err, MahutaError::Technical { .. }), "got {err:?}");
}

#[tokio::test]
async fn list_pinned_reads_recursive_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/ls"))
        .and(query_param("type", "recursive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Keys": {
                "QmA": {"Type": "recursive"},
                "QmB": {"Type": "recursive"}
            }
        })))
        .mount(&server)
        .await;
    let storage = connected(&server).await;

    let mut pinned = storage.list_pinned().await.unwrap();
    pinned.sort();
    assert_eq!(pinned, vec!["QmA", "QmB"]);
}

// ── health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn check_reports_unhealthy_when_node_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Version": "0.24.0"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v0/version"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let storage = IpfsStorage::connect(&config_for(&server)).await.unwrap();
    let health = storage.check().await;
    assert!(!health.healthy);
    assert!(health.message.unwrap().contains("is unreachable"));
}
