//! End-to-end tests of the MCP surface dispatching through to a mocked
//! Schema Registry: tool lookup, scope enforcement, the response envelope,
//! and SLIM_MODE filtering (spec §4.8, §6, §7, §8).

use std::sync::Arc;

use mcp_surface::{build_tool_table, NoAuthValidator, RegistryServerHandler, ToolContext};
use registry_core::{Credentials, RegistryName, RegistryRecord, SsrfPolicy, TlsOptions};
use registry_service::elicitation::{ElicitationStore, SmartDefaultsStore};
use registry_service::{MigrationEngine, RegistryManager, SyncScheduler, TaskEngine};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn build_handler(server: &MockServer, slim_mode: bool) -> RegistryServerHandler {
    let record = RegistryRecord {
        name: RegistryName::parse("dev").unwrap(),
        url: server.uri(),
        credentials: Credentials::None,
        viewonly: false,
        tls: TlsOptions::default(),
        ssrf_policy: SsrfPolicy { allow_localhost: true },
        default_compatibility: None,
    };
    let manager = Arc::new(RegistryManager::from_records(vec![record]).unwrap());
    let ctx = Arc::new(ToolContext {
        task_engine: Arc::new(TaskEngine::new()),
        migration_engine: Arc::new(MigrationEngine::new(manager.clone())),
        sync_scheduler: Arc::new(SyncScheduler::new(manager.clone())),
        elicitation: Arc::new(ElicitationStore::new()),
        smart_defaults: Arc::new(SmartDefaultsStore::new(true)),
        enable_migration: true,
        manager,
    });
    RegistryServerHandler::new(build_tool_table(), ctx, Arc::new(NoAuthValidator), slim_mode)
}

#[tokio::test]
async fn list_registries_returns_an_enveloped_result() {
    let server = MockServer::start().await;
    let handler = build_handler(&server, false).await;

    let (body, is_error) = handler.dispatch("list_registries", serde_json::json!({}), None).await;
    assert!(!is_error);
    assert_eq!(body["mcp_protocol_version"], "2025-06-18");
    assert_eq!(body["registry_mode"], "single");
    assert_eq!(body["registries"][0]["name"], "dev");
}

#[tokio::test]
async fn get_schema_round_trips_through_the_mocked_registry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects/orders-value/versions/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "subject": "orders-value",
            "id": 1,
            "version": 1,
            "schema": "{\"type\":\"record\",\"name\":\"Order\",\"fields\":[]}",
            "schemaType": "AVRO",
        })))
        .mount(&server)
        .await;

    let handler = build_handler(&server, false).await;
    let (body, is_error) = handler
        .dispatch("get_schema", serde_json::json!({ "registry": "dev", "subject": "orders-value" }), None)
        .await;
    assert!(!is_error);
    assert_eq!(body["id"], 1);
    assert_eq!(body["schema_type"], "AVRO");
}

#[tokio::test]
async fn an_unknown_tool_name_returns_an_error_envelope() {
    let server = MockServer::start().await;
    let handler = build_handler(&server, false).await;

    let (body, is_error) = handler.dispatch("not_a_real_tool", serde_json::json!({}), None).await;
    assert!(is_error);
    assert_eq!(body["error_code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn register_schema_without_write_scope_is_rejected() {
    use registry_core::{Scope, ScopeSet};

    let server = MockServer::start().await;
    let record = RegistryRecord {
        name: RegistryName::parse("dev").unwrap(),
        url: server.uri(),
        credentials: Credentials::None,
        viewonly: false,
        tls: TlsOptions::default(),
        ssrf_policy: SsrfPolicy { allow_localhost: true },
        default_compatibility: None,
    };
    let manager = Arc::new(RegistryManager::from_records(vec![record]).unwrap());
    let ctx = Arc::new(ToolContext {
        task_engine: Arc::new(TaskEngine::new()),
        migration_engine: Arc::new(MigrationEngine::new(manager.clone())),
        sync_scheduler: Arc::new(SyncScheduler::new(manager.clone())),
        elicitation: Arc::new(ElicitationStore::new()),
        smart_defaults: Arc::new(SmartDefaultsStore::new(true)),
        enable_migration: true,
        manager,
    });
    let validator = mcp_surface::StaticScopeValidator::new().with_token("ro-token", ScopeSet::from_iter([Scope::Read]));
    let handler = RegistryServerHandler::new(build_tool_table(), ctx, Arc::new(validator), false);

    let (body, is_error) = handler
        .dispatch(
            "register_schema",
            serde_json::json!({ "registry": "dev", "subject": "orders-value", "schema": "{}" }),
            Some("ro-token"),
        )
        .await;
    assert!(is_error);
    assert_eq!(body["error_code"], "INSUFFICIENT_SCOPE");
}

#[tokio::test]
async fn migrate_context_without_on_conflict_elicits_then_resumes_to_a_task() {
    let server = MockServer::start().await;
    let handler = build_handler(&server, false).await;

    let (first, is_error) = handler
        .dispatch(
            "migrate_context",
            serde_json::json!({
                "source_registry": "dev",
                "target_registry": "dev",
                "dry_run": false,
            }),
            None,
        )
        .await;
    assert!(!is_error);
    assert_eq!(first["elicitation_required"], true);
    let token = first["continuation_token"].as_str().unwrap().to_string();
    assert!(first["next_question"].as_str().unwrap().contains("on_conflict"));

    let (second, is_error) = handler
        .dispatch(
            "migrate_context",
            serde_json::json!({
                "continuation_token": token,
                "on_conflict": "fail_subject",
            }),
            None,
        )
        .await;
    assert!(!is_error);
    assert!(second["task_id"].is_string());
}

#[tokio::test]
async fn slim_mode_hides_operator_only_tools_from_the_catalog() {
    let server = MockServer::start().await;
    let full = build_handler(&server, false).await;
    let slim = build_handler(&server, true).await;

    let full_names: Vec<String> = full.tool_catalog().iter().map(|t| t["name"].as_str().unwrap().to_string()).collect();
    let slim_names: Vec<String> = slim.tool_catalog().iter().map(|t| t["name"].as_str().unwrap().to_string()).collect();

    assert!(full_names.contains(&"register_schema".to_string()));
    assert!(slim_names.len() < full_names.len());
    assert!(slim_names.contains(&"get_schema".to_string()));
}
