//! End-to-end tests of `RegistryClient` against a mocked Confluent wire
//! protocol, covering context-aware URL composition, view-only enforcement,
//! and the status-code-to-`ClientError` mapping (spec §4.1, §7).

use std::sync::Arc;

use registry_client::RegistryClient;
use registry_core::{Context, Credentials, RegistryName, RegistryRecord, SchemaType, SsrfPolicy, TlsOptions};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record_for(server: &MockServer, viewonly: bool) -> Arc<RegistryRecord> {
    Arc::new(RegistryRecord {
        name: RegistryName::parse("dev").unwrap(),
        url: server.uri(),
        credentials: Credentials::None,
        viewonly,
        tls: TlsOptions::default(),
        ssrf_policy: SsrfPolicy { allow_localhost: true },
        default_compatibility: None,
    })
}

#[tokio::test]
async fn list_subjects_in_the_default_context_hits_the_bare_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(["orders-value", "users-value"]))
        .mount(&server)
        .await;

    let client = RegistryClient::new(record_for(&server, false)).unwrap();
    let subjects = client.list_subjects(&Context::default_context()).await.unwrap();
    assert_eq!(subjects, vec!["orders-value".to_string(), "users-value".to_string()]);
}

#[tokio::test]
async fn list_subjects_in_a_named_context_prefixes_the_contexts_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contexts/staging/subjects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(["orders-value"]))
        .mount(&server)
        .await;

    let client = RegistryClient::new(record_for(&server, false)).unwrap();
    let subjects = client.list_subjects(&Context::from_opt(Some("staging"))).await.unwrap();
    assert_eq!(subjects, vec!["orders-value".to_string()]);
}

#[tokio::test]
async fn list_contexts_hits_the_registry_wide_contexts_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contexts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(["staging", "prod"]))
        .mount(&server)
        .await;

    let client = RegistryClient::new(record_for(&server, false)).unwrap();
    let contexts = client.list_contexts().await.unwrap();
    assert_eq!(contexts, vec!["staging".to_string(), "prod".to_string()]);
}

#[tokio::test]
async fn get_schema_resolves_version_and_schema_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects/orders-value/versions/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "subject": "orders-value",
            "id": 7,
            "version": 3,
            "schema": "{\"type\":\"record\",\"name\":\"Order\",\"fields\":[]}",
            "schemaType": "AVRO",
        })))
        .mount(&server)
        .await;

    let client = RegistryClient::new(record_for(&server, false)).unwrap();
    let schema = client
        .get_schema("orders-value", "latest", &Context::default_context())
        .await
        .unwrap();
    assert_eq!(schema.id, 7);
    assert_eq!(schema.version, 3);
    assert_eq!(schema.schema_type, SchemaType::Avro);
}

#[tokio::test]
async fn register_schema_on_a_viewonly_registry_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    // No mock mounted: a network call here would panic the mock server on an
    // unexpected request, which is exactly the point.
    let client = RegistryClient::new(record_for(&server, true)).unwrap();
    let err = client
        .register_schema("orders-value", "{}", SchemaType::Avro, &[], &Context::default_context(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, registry_client::ClientError::RegistryViewonly));
}

#[tokio::test]
async fn register_schema_resolves_the_assigned_version_via_a_followup_get() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/subjects/orders-value/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 11 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subjects/orders-value/versions/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "subject": "orders-value",
            "id": 11,
            "version": 4,
            "schema": "{}",
            "schemaType": "AVRO",
        })))
        .mount(&server)
        .await;

    let client = RegistryClient::new(record_for(&server, false)).unwrap();
    let registered = client
        .register_schema("orders-value", "{}", SchemaType::Avro, &[], &Context::default_context(), None)
        .await
        .unwrap();
    assert_eq!(registered.id, 11);
    assert_eq!(registered.version, 4);
}

#[tokio::test]
async fn a_404_subject_maps_to_subject_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects/missing/versions/latest"))
        .respond_with(ResponseTemplate::new(404).set_body_string("subject not found"))
        .mount(&server)
        .await;

    let client = RegistryClient::new(record_for(&server, false)).unwrap();
    let err = client
        .get_schema("missing", "latest", &Context::default_context())
        .await
        .unwrap_err();
    assert!(matches!(err, registry_client::ClientError::SubjectNotFound(_)));
}

#[tokio::test]
async fn a_401_maps_to_registry_auth_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = RegistryClient::new(record_for(&server, false)).unwrap();
    let err = client.list_subjects(&Context::default_context()).await.unwrap_err();
    assert!(matches!(err, registry_client::ClientError::RegistryAuthFailed));
}

#[tokio::test]
async fn a_409_on_register_maps_to_schema_incompatible() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/subjects/orders-value/versions"))
        .respond_with(ResponseTemplate::new(409).set_body_string("incompatible"))
        .mount(&server)
        .await;

    let client = RegistryClient::new(record_for(&server, false)).unwrap();
    let err = client
        .register_schema("orders-value", "{}", SchemaType::Avro, &[], &Context::default_context(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, registry_client::ClientError::SchemaIncompatible(_)));
}

#[tokio::test]
async fn test_connection_reports_latency_and_health_without_erroring() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<String>::new()))
        .mount(&server)
        .await;

    let client = RegistryClient::new(record_for(&server, false)).unwrap();
    let health = client.test_connection().await;
    assert!(health.healthy);
    assert!(health.error.is_none());
}

#[tokio::test]
async fn test_connection_against_an_unreachable_registry_reports_unhealthy() {
    let record = Arc::new(RegistryRecord {
        name: RegistryName::parse("dead").unwrap(),
        url: "http://127.0.0.1:1".to_string(),
        credentials: Credentials::None,
        viewonly: false,
        tls: TlsOptions::default(),
        ssrf_policy: SsrfPolicy { allow_localhost: true },
        default_compatibility: None,
    });
    let client = RegistryClient::new(record).unwrap();
    let health = client.test_connection().await;
    assert!(!health.healthy);
    assert!(health.error.is_some());
}

#[tokio::test]
async fn construction_rejects_a_loopback_url_unless_allow_localhost_is_set() {
    let record = Arc::new(RegistryRecord {
        name: RegistryName::parse("dev").unwrap(),
        url: "http://127.0.0.1:8081".to_string(),
        credentials: Credentials::None,
        viewonly: false,
        tls: TlsOptions::default(),
        ssrf_policy: SsrfPolicy { allow_localhost: false },
        default_compatibility: None,
    });
    assert!(RegistryClient::new(record).is_err());
}

#[tokio::test]
async fn get_mode_parses_the_wire_mode_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "mode": "READWRITE" })))
        .mount(&server)
        .await;

    let client = RegistryClient::new(record_for(&server, false)).unwrap();
    let mode = client.get_mode(None, &Context::default_context()).await.unwrap();
    assert_eq!(mode.to_string(), "READWRITE");
}
