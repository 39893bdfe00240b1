//! Integration tests for CacheMiddleware using wiremock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use http::Method;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use webui_api_cache::{
    Backend, BackendError, CacheEntry, CacheKey, CacheMiddleware, CachePolicy, DeleteStatus,
};
use webui_api_moka::MokaBackend;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(backend: Arc<MokaBackend>, policy: CachePolicy) -> ClientWithMiddleware {
    let middleware = CacheMiddleware::builder()
        .backend(backend)
        .policy(policy)
        .build();
    ClientBuilder::new(Client::new()).with(middleware).build()
}

fn backend() -> Arc<MokaBackend> {
    Arc::new(MokaBackend::builder().max_entries(100).build())
}

fn cache_status(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get("x-cache-status")
        .and_then(|value| value.to_str().ok())
}

/// Backend whose storage is unreachable.
struct FailingBackend;

fn unreachable_storage() -> BackendError {
    BackendError::ConnectionError(Box::new(std::io::Error::other("storage down")))
}

#[async_trait]
impl Backend for FailingBackend {
    async fn read(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, BackendError> {
        Err(unreachable_storage())
    }

    async fn write(&self, _key: &CacheKey, _entry: CacheEntry) -> Result<(), BackendError> {
        Err(unreachable_storage())
    }

    async fn remove(&self, _key: &CacheKey) -> Result<DeleteStatus, BackendError> {
        Err(unreachable_storage())
    }
}

/// Default policy: nothing is fresh, ETag responses are revalidated.
#[tokio::test]
async fn test_etag_revalidation_with_default_policy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Managers/bmc"))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Managers/bmc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .set_body_json(serde_json::json!({ "Id": "bmc" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(backend(), CachePolicy::default());
    let url = format!("{}/redfish/v1/Managers/bmc", mock_server.uri());

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(cache_status(&first), Some("MISS"));
    let body: serde_json::Value = first.json().await.unwrap();
    assert_eq!(body["Id"], "bmc");

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(cache_status(&second), Some("REVALIDATED"));
    assert_eq!(second.headers().get("etag").unwrap(), "\"v1\"");
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["Id"], "bmc");
}

#[tokio::test]
async fn test_fresh_entry_is_served_without_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("root"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let policy = CachePolicy {
        ttl: Duration::from_secs(60),
        ..Default::default()
    };
    let client = client(backend(), policy);
    let url = format!("{}/redfish/v1", mock_server.uri());

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(cache_status(&first), Some("MISS"));
    assert_eq!(first.text().await.unwrap(), "root");

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(cache_status(&second), Some("HIT"));
    assert_eq!(second.text().await.unwrap(), "root");
}

#[tokio::test]
async fn test_zero_ttl_without_validator_is_not_stored() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Systems"))
        .respond_with(ResponseTemplate::new(200).set_body_string("systems"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let backend = backend();
    let client = client(backend.clone(), CachePolicy::default());
    let url = format!("{}/redfish/v1/Systems", mock_server.uri());

    for _ in 0..2 {
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(cache_status(&response), Some("MISS"));
    }

    let key = CacheKey::new("webui-vue-cache:", &Method::GET, &url);
    assert!(backend.read(&key).await.unwrap().is_none());

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|request| request.headers.get("if-none-match").is_none()));
}

#[tokio::test]
async fn test_uncached_methods_pass_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/redfish/v1/SessionService/Sessions"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"s\""))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client(backend(), CachePolicy::default());
    let url = format!("{}/redfish/v1/SessionService/Sessions", mock_server.uri());

    for _ in 0..2 {
        let response = client.post(&url).send().await.unwrap();
        assert_eq!(response.status(), 201);
        assert_eq!(cache_status(&response), None);
    }
}

#[tokio::test]
async fn test_stale_entry_served_on_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Chassis"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"c1\"")
                .set_body_string("chassis"),
        )
        .with_priority(1)
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Chassis"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let policy = CachePolicy {
        stale_if_error: true,
        ..Default::default()
    };
    let client = client(backend(), policy);
    let url = format!("{}/redfish/v1/Chassis", mock_server.uri());

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(cache_status(&first), Some("MISS"));
    assert_eq!(first.text().await.unwrap(), "chassis");

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(cache_status(&second), Some("STALE"));
    assert_eq!(second.text().await.unwrap(), "chassis");
}

#[tokio::test]
async fn test_server_error_passes_through_by_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Chassis"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"c1\"")
                .set_body_string("chassis"),
        )
        .with_priority(1)
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Chassis"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = client(backend(), CachePolicy::default());
    let url = format!("{}/redfish/v1/Chassis", mock_server.uri());

    client.get(&url).send().await.unwrap();
    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.status(), 503);
    assert_eq!(cache_status(&second), Some("MISS"));
}

#[tokio::test]
async fn test_no_store_header_is_honored_when_interpreted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/TaskService"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Cache-Control", "no-store")
                .insert_header("ETag", "\"t\""),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let policy = CachePolicy {
        interpret_header: true,
        ttl: Duration::from_secs(60),
        ..Default::default()
    };
    let client = client(backend(), policy);
    let url = format!("{}/redfish/v1/TaskService", mock_server.uri());

    for _ in 0..2 {
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(cache_status(&response), Some("MISS"));
    }
}

#[tokio::test]
async fn test_unstorable_response_evicts_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/UpdateService"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"u1\"")
                .set_body_string("old"),
        )
        .with_priority(1)
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/UpdateService"))
        .respond_with(ResponseTemplate::new(200).set_body_string("new"))
        .mount(&mock_server)
        .await;

    let backend = backend();
    let client = client(backend.clone(), CachePolicy::default());
    let url = format!("{}/redfish/v1/UpdateService", mock_server.uri());
    let key = CacheKey::new("webui-vue-cache:", &Method::GET, &url);

    client.get(&url).send().await.unwrap();
    assert!(backend.read(&key).await.unwrap().is_some());

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.text().await.unwrap(), "new");
    assert!(backend.read(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_last_modified_revalidation() {
    let mock_server = MockServer::start().await;
    let last_modified = "Wed, 21 Oct 2015 07:28:00 GMT";

    Mock::given(method("GET"))
        .and(path("/redfish/v1/AccountService"))
        .and(header("if-modified-since", last_modified))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/AccountService"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified", last_modified)
                .set_body_string("accounts"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let policy = CachePolicy {
        etag: false,
        modified_since: true,
        ..Default::default()
    };
    let client = client(backend(), policy);
    let url = format!("{}/redfish/v1/AccountService", mock_server.uri());

    client.get(&url).send().await.unwrap();
    let second = client.get(&url).send().await.unwrap();
    assert_eq!(cache_status(&second), Some("REVALIDATED"));
    assert_eq!(second.text().await.unwrap(), "accounts");
}

#[tokio::test]
async fn test_query_string_is_part_of_the_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Systems/system/LogServices/EventLog/Entries"))
        .respond_with(ResponseTemplate::new(200).set_body_string("page"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let policy = CachePolicy {
        ttl: Duration::from_secs(60),
        ..Default::default()
    };
    let client = client(backend(), policy);
    let base = format!(
        "{}/redfish/v1/Systems/system/LogServices/EventLog/Entries",
        mock_server.uri()
    );

    let first = client.get(format!("{base}?$skip=0")).send().await.unwrap();
    let second = client.get(format!("{base}?$skip=50")).send().await.unwrap();
    assert_eq!(cache_status(&first), Some("MISS"));
    assert_eq!(cache_status(&second), Some("MISS"));
}

#[tokio::test]
async fn test_policy_from_yaml() {
    let policy: CachePolicy = serde_saphyr::from_str(
        r#"
        methods: [GET]
        ttl: 60s
        prefix: "yaml:"
        "#,
    )
    .unwrap();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("data"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = backend();
    let client = client(backend.clone(), policy);
    let url = format!("{}/data", mock_server.uri());

    client.get(&url).send().await.unwrap();
    let key = CacheKey::new("yaml:", &Method::GET, &url);
    assert!(backend.read(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_revalidation_adopts_new_etag() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Managers/bmc/NetworkProtocol"))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304).insert_header("ETag", "\"v2\""))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Managers/bmc/NetworkProtocol"))
        .and(header("if-none-match", "\"v2\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/Managers/bmc/NetworkProtocol"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .set_body_string("protocols"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = backend();
    let client = client(backend.clone(), CachePolicy::default());
    let url = format!("{}/redfish/v1/Managers/bmc/NetworkProtocol", mock_server.uri());

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(cache_status(&first), Some("MISS"));

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(cache_status(&second), Some("REVALIDATED"));
    assert_eq!(second.headers().get("etag").unwrap(), "\"v2\"");

    let key = CacheKey::new("webui-vue-cache:", &Method::GET, &url);
    let stored = backend.read(&key).await.unwrap().unwrap();
    assert_eq!(stored.etag.as_deref(), Some("\"v2\""));

    let third = client.get(&url).send().await.unwrap();
    assert_eq!(cache_status(&third), Some("REVALIDATED"));
    assert_eq!(third.headers().get("etag").unwrap(), "\"v2\"");
    assert_eq!(third.text().await.unwrap(), "protocols");
}

#[tokio::test]
async fn test_no_store_on_not_modified_evicts_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/CertificateService"))
        .and(header("if-none-match", "\"c1\""))
        .respond_with(ResponseTemplate::new(304).insert_header("Cache-Control", "no-store"))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/CertificateService"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"c1\"")
                .set_body_string("certificates"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let policy = CachePolicy {
        interpret_header: true,
        ..Default::default()
    };
    let backend = backend();
    let client = client(backend.clone(), policy);
    let url = format!("{}/redfish/v1/CertificateService", mock_server.uri());
    let key = CacheKey::new("webui-vue-cache:", &Method::GET, &url);

    client.get(&url).send().await.unwrap();
    assert!(backend.read(&key).await.unwrap().is_some());

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(cache_status(&second), Some("REVALIDATED"));
    assert_eq!(second.text().await.unwrap(), "certificates");
    assert!(backend.read(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failing_backend_is_a_miss() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redfish/v1/EventService"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"e1\"")
                .set_body_string("events"),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let middleware = CacheMiddleware::builder()
        .backend(Arc::new(FailingBackend))
        .build();
    let client = ClientBuilder::new(Client::new()).with(middleware).build();
    let url = format!("{}/redfish/v1/EventService", mock_server.uri());

    for _ in 0..2 {
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(cache_status(&response), Some("MISS"));
        assert_eq!(response.text().await.unwrap(), "events");
    }

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|request| request.headers.get("if-none-match").is_none()));
}

#[tokio::test]
async fn test_stale_entry_served_when_server_unreachable() {
    // Nothing listens on a port once its listener is dropped.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let url = format!("http://127.0.0.1:{port}/redfish/v1/Systems/system");

    let backend = backend();
    let key = CacheKey::new("webui-vue-cache:", &Method::GET, &url);
    let entry = CacheEntry::new(
        200,
        vec![("content-type".into(), Bytes::from_static(b"text/plain"))],
        Bytes::from_static(b"system"),
        Utc::now(),
    )
    .with_validators(Some("\"s1\"".into()), None);
    backend.write(&key, entry).await.unwrap();

    let policy = CachePolicy {
        stale_if_error: true,
        ..Default::default()
    };
    let stale = client(backend.clone(), policy);
    let response = stale.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(cache_status(&response), Some("STALE"));
    assert_eq!(response.text().await.unwrap(), "system");

    let strict = client(backend, CachePolicy::default());
    assert!(strict.get(&url).send().await.is_err());
}
