//! The registry HTTP client (spec §4.1 "Registry Client (C1)").

use std::sync::Arc;
use std::time::Duration;

use registry_core::context::build_url;
use registry_core::{Context, Credentials, RegistryRecord, SchemaReference, SchemaType};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{ClientError, ClientResult};
use crate::retry::{is_retryable_status, retry_idempotent};
use crate::tls::{build_http_client, DEFAULT_TIMEOUT, PROBE_TIMEOUT};

const WRITE_CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

#[derive(Debug, Serialize, Deserialize)]
struct WireSchemaVersion {
    subject: String,
    id: i64,
    version: i32,
    schema: String,
    #[serde(default, rename = "schemaType")]
    schema_type: Option<String>,
    #[serde(default)]
    references: Vec<SchemaReference>,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    schema: &'a str,
    #[serde(skip_serializing_if = "Option::is_none", rename = "schemaType")]
    schema_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    references: &'a [SchemaReference],
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct SchemaByIdResponse {
    schema: String,
    #[serde(default, rename = "schemaType")]
    schema_type: Option<String>,
    #[serde(default)]
    references: Vec<SchemaReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RegisteredSchema {
    pub id: i64,
    pub version: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FetchedSchema {
    pub id: i64,
    pub version: i32,
    pub schema_type: SchemaType,
    pub schema: String,
    pub references: Vec<SchemaReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SchemaById {
    pub schema_type: SchemaType,
    pub schema: String,
    pub references: Vec<SchemaReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ConnectionHealth {
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigResponse {
    #[serde(rename = "compatibilityLevel")]
    compatibility_level: String,
}

#[derive(Debug, Deserialize)]
struct ModeResponse {
    mode: String,
}

fn parse_schema_type(raw: Option<&str>) -> SchemaType {
    raw.and_then(|s| match s {
        "AVRO" => Some(SchemaType::Avro),
        "JSON" => Some(SchemaType::Json),
        "PROTOBUF" => Some(SchemaType::Protobuf),
        _ => None,
    })
    .unwrap_or_default()
}

/// A client bound to one [`RegistryRecord`] for the lifetime of the process.
///
/// Constructed once by the Registry Manager; cheap to clone (the
/// underlying `reqwest::Client` is reference-counted internally).
#[derive(Clone)]
pub struct RegistryClient {
    record: Arc<RegistryRecord>,
    base_url: String,
    http: reqwest::Client,
}

impl RegistryClient {
    /// Build a client for `record`. Validates the base URL against the SSRF
    /// deny-list (spec §4.1 "SSRF safety") before constructing the
    /// underlying HTTP client.
    pub fn new(record: Arc<RegistryRecord>) -> ClientResult<Self> {
        let validated = registry_core::validate_base_url(&record.url, record.ssrf_policy)?;
        let http = build_http_client(&record.tls, DEFAULT_TIMEOUT)?;
        Ok(RegistryClient {
            base_url: validated.as_str().trim_end_matches('/').to_string(),
            record,
            http,
        })
    }

    pub fn name(&self) -> &str {
        self.record.name.as_str()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_viewonly(&self) -> bool {
        self.record.viewonly
    }

    fn require_mutable(&self) -> ClientResult<()> {
        if self.record.viewonly {
            return Err(ClientError::RegistryViewonly);
        }
        Ok(())
    }

    fn url(&self, context: &Context, path: &str) -> String {
        build_url(&self.base_url, context, path)
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.record.credentials {
            Credentials::None => builder,
            Credentials::Basic { username, password } => {
                builder.basic_auth(username, Some(password.expose_secret()))
            }
            Credentials::Bearer { token } => builder.bearer_auth(token.expose_secret()),
        }
    }

    fn write_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(WRITE_CONTENT_TYPE),
        );
        headers
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> ClientResult<T> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::RegistryTimeout(DEFAULT_TIMEOUT)
            } else {
                ClientError::RegistryUnreachable(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ClientError::RegistryAuthFailed);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::SubjectNotFound(
                response.text().await.unwrap_or_default(),
            ));
        }
        if is_retryable_status(status) {
            return Err(ClientError::RegistryUnreachable(format!(
                "upstream returned {status}"
            )));
        }
        if status == reqwest::StatusCode::CONFLICT {
            return Err(ClientError::SchemaIncompatible(
                response.text().await.unwrap_or_default(),
            ));
        }
        if !status.is_success() {
            return Err(ClientError::Internal(format!(
                "unexpected status {status}: {}",
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Internal(format!("decoding response: {e}")))
    }

    #[instrument(skip(self), fields(registry = %self.name()))]
    pub async fn list_subjects(&self, context: &Context) -> ClientResult<Vec<String>> {
        let url = self.url(context, "/subjects");
        retry_idempotent(|| async {
            self.send(self.apply_auth(self.http.get(&url))).await
        })
        .await
    }

    /// `GET /contexts` — the registry-wide list of named contexts, not
    /// including the default context.
    #[instrument(skip(self), fields(registry = %self.name()))]
    pub async fn list_contexts(&self) -> ClientResult<Vec<String>> {
        let url = format!("{}/contexts", self.base_url);
        retry_idempotent(|| async {
            self.send(self.apply_auth(self.http.get(&url))).await
        })
        .await
    }

    #[instrument(skip(self), fields(registry = %self.name(), subject))]
    pub async fn get_subject_versions(
        &self,
        subject: &str,
        context: &Context,
    ) -> ClientResult<Vec<i32>> {
        let url = self.url(context, &format!("/subjects/{subject}/versions"));
        retry_idempotent(|| async {
            self.send(self.apply_auth(self.http.get(&url))).await
        })
        .await
    }

    #[instrument(skip(self), fields(registry = %self.name(), subject, version))]
    pub async fn get_schema(
        &self,
        subject: &str,
        version: &str,
        context: &Context,
    ) -> ClientResult<FetchedSchema> {
        let url = self.url(context, &format!("/subjects/{subject}/versions/{version}"));
        let wire: WireSchemaVersion = retry_idempotent(|| async {
            self.send(self.apply_auth(self.http.get(&url))).await
        })
        .await?;
        Ok(FetchedSchema {
            id: wire.id,
            version: wire.version,
            schema_type: parse_schema_type(wire.schema_type.as_deref()),
            schema: wire.schema,
            references: wire.references,
        })
    }

    #[instrument(skip(self), fields(registry = %self.name(), id))]
    pub async fn get_schema_by_id(&self, id: i64) -> ClientResult<SchemaById> {
        let url = format!("{}/schemas/ids/{id}", self.base_url);
        let wire: SchemaByIdResponse = retry_idempotent(|| async {
            self.send(self.apply_auth(self.http.get(&url))).await
        })
        .await?;
        Ok(SchemaById {
            schema_type: parse_schema_type(wire.schema_type.as_deref()),
            schema: wire.schema,
            references: wire.references,
        })
    }

    /// Register a schema. When `id` is `Some`, the target registry must
    /// already be in IMPORT mode for this subject/registry, or the
    /// Confluent API will itself reject the write; callers are expected to
    /// have acquired the IMPORT-mode window first (spec §4.5).
    #[instrument(skip(self, payload), fields(registry = %self.name(), subject))]
    pub async fn register_schema(
        &self,
        subject: &str,
        payload: &str,
        schema_type: SchemaType,
        references: &[SchemaReference],
        context: &Context,
        id: Option<i64>,
    ) -> ClientResult<RegisteredSchema> {
        self.require_mutable()?;

        let url = self.url(context, &format!("/subjects/{subject}/versions"));
        let body = RegisterRequest {
            schema: payload,
            schema_type: Some(schema_type.to_string()),
            references,
            id,
        };
        let response: RegisterResponse = self
            .send(
                self.apply_auth(self.http.post(&url))
                    .headers(Self::write_headers())
                    .json(&body),
            )
            .await?;

        // Confluent's register endpoint returns only the id; resolve the
        // assigned version by re-reading the subject's latest version.
        let latest = self.get_schema(subject, "latest", context).await?;
        if latest.id != response.id {
            warn!(
                expected_id = response.id,
                actual_id = latest.id,
                "registered schema id does not match latest version's id"
            );
        }
        Ok(RegisteredSchema {
            id: response.id,
            version: latest.version,
        })
    }

    #[instrument(skip(self), fields(registry = %self.name(), subject, permanent))]
    pub async fn delete_subject(
        &self,
        subject: &str,
        context: &Context,
        permanent: bool,
    ) -> ClientResult<Vec<i32>> {
        self.require_mutable()?;
        let mut url = self.url(context, &format!("/subjects/{subject}"));
        if permanent {
            url.push_str("?permanent=true");
        }
        self.send(self.apply_auth(self.http.delete(&url))).await
    }

    #[instrument(skip(self), fields(registry = %self.name(), subject))]
    pub async fn get_config(
        &self,
        subject: Option<&str>,
        context: &Context,
    ) -> ClientResult<String> {
        let path = match subject {
            Some(s) => format!("/config/{s}"),
            None => "/config".to_string(),
        };
        let url = self.url(context, &path);
        let resp: ConfigResponse = retry_idempotent(|| async {
            self.send(self.apply_auth(self.http.get(&url))).await
        })
        .await?;
        Ok(resp.compatibility_level)
    }

    #[instrument(skip(self), fields(registry = %self.name(), subject))]
    pub async fn set_config(
        &self,
        subject: Option<&str>,
        context: &Context,
        compatibility: &str,
    ) -> ClientResult<()> {
        self.require_mutable()?;
        let path = match subject {
            Some(s) => format!("/config/{s}"),
            None => "/config".to_string(),
        };
        let url = self.url(context, &path);
        let _: serde_json::Value = self
            .send(
                self.apply_auth(self.http.put(&url))
                    .headers(Self::write_headers())
                    .json(&serde_json::json!({ "compatibility": compatibility })),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(registry = %self.name(), subject))]
    pub async fn get_mode(
        &self,
        subject: Option<&str>,
        context: &Context,
    ) -> ClientResult<registry_core::Mode> {
        let path = match subject {
            Some(s) => format!("/mode/{s}"),
            None => "/mode".to_string(),
        };
        let url = self.url(context, &path);
        let resp: ModeResponse = retry_idempotent(|| async {
            self.send(self.apply_auth(self.http.get(&url))).await
        })
        .await?;
        registry_core::Mode::parse(&resp.mode)
            .ok_or_else(|| ClientError::Internal(format!("unrecognized mode {:?}", resp.mode)))
    }

    /// Set the registry (or subject) mode. Used by the migration engine's
    /// scoped IMPORT-mode guard (spec §4.5) as well as by direct
    /// `set_mode` tool calls. Mutating, but deliberately does NOT go
    /// through `require_mutable` when `force` is set, since restoring the
    /// prior mode must succeed even on a view-only registry the guard
    /// itself temporarily unlocked.
    #[instrument(skip(self), fields(registry = %self.name(), subject, mode = %mode))]
    pub async fn set_mode(
        &self,
        subject: Option<&str>,
        context: &Context,
        mode: registry_core::Mode,
        force: bool,
    ) -> ClientResult<()> {
        if !force {
            self.require_mutable()?;
        }
        let path = match subject {
            Some(s) => format!("/mode/{s}"),
            None => "/mode".to_string(),
        };
        let url = self.url(context, &path);
        let _: serde_json::Value = self
            .send(
                self.apply_auth(self.http.put(&url))
                    .headers(Self::write_headers())
                    .json(&serde_json::json!({ "mode": mode.to_string() })),
            )
            .await?;
        Ok(())
    }

    /// Probe connectivity with a single `/subjects` call under a short
    /// timeout (spec §4.2 `test_connection`).
    #[instrument(skip(self), fields(registry = %self.name()))]
    pub async fn test_connection(&self) -> ConnectionHealth {
        let started = std::time::Instant::now();
        let url = format!("{}/subjects", self.base_url);
        let result = self
            .apply_auth(self.http.get(&url).timeout(PROBE_TIMEOUT))
            .send()
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!(latency_ms, "registry healthy");
                ConnectionHealth {
                    healthy: true,
                    latency_ms,
                    error: None,
                }
            }
            Ok(resp) => ConnectionHealth {
                healthy: false,
                latency_ms,
                error: Some(format!("unexpected status {}", resp.status())),
            },
            Err(e) => ConnectionHealth {
                healthy: false,
                latency_ms,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::{RegistryName, SsrfPolicy, TlsOptions};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(url: String, viewonly: bool) -> Arc<RegistryRecord> {
        Arc::new(RegistryRecord {
            name: RegistryName::parse("test").unwrap(),
            url,
            credentials: Credentials::None,
            viewonly,
            tls: TlsOptions::default(),
            ssrf_policy: SsrfPolicy { allow_localhost: true },
            default_compatibility: None,
        })
    }

    #[tokio::test]
    async fn list_subjects_parses_the_subject_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subjects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec!["orders-value"]))
            .mount(&server)
            .await;

        let client = RegistryClient::new(record(server.uri(), false)).unwrap();
        let subjects = client.list_subjects(&Context::default_context()).await.unwrap();
        assert_eq!(subjects, vec!["orders-value".to_string()]);
    }

    #[tokio::test]
    async fn named_context_routes_through_contexts_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contexts/prod/subjects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec!["orders-value"]))
            .mount(&server)
            .await;

        let client = RegistryClient::new(record(server.uri(), false)).unwrap();
        let subjects = client
            .list_subjects(&Context::from("prod"))
            .await
            .unwrap();
        assert_eq!(subjects, vec!["orders-value".to_string()]);
    }

    #[tokio::test]
    async fn viewonly_registry_rejects_register_without_any_network_call() {
        let server = MockServer::start().await;
        // No mock mounted for POST /subjects/.../versions: if the client
        // attempted the call, wiremock would 404 rather than our error.
        let client = RegistryClient::new(record(server.uri(), true)).unwrap();
        let err = client
            .register_schema(
                "orders-value",
                "{}",
                SchemaType::Avro,
                &[],
                &Context::default_context(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::RegistryViewonly));
    }

    #[tokio::test]
    async fn not_found_maps_to_subject_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subjects/missing/versions"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Subject not found"))
            .mount(&server)
            .await;

        let client = RegistryClient::new(record(server.uri(), false)).unwrap();
        let err = client
            .get_subject_versions("missing", &Context::default_context())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::SubjectNotFound(_)));
    }

    #[tokio::test]
    async fn auth_failure_maps_to_registry_auth_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subjects"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = RegistryClient::new(record(server.uri(), false)).unwrap();
        let err = client
            .list_subjects(&Context::default_context())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::RegistryAuthFailed));
    }

    #[tokio::test]
    async fn construction_rejects_private_base_url_by_default() {
        let record = Arc::new(RegistryRecord {
            name: RegistryName::parse("internal").unwrap(),
            url: "http://10.0.0.5:8081".to_string(),
            credentials: Credentials::None,
            viewonly: false,
            tls: TlsOptions::default(),
            ssrf_policy: SsrfPolicy::default(),
            default_compatibility: None,
        });
        let err = RegistryClient::new(record).unwrap_err();
        assert!(matches!(err, ClientError::SsrfBlocked(_)));
    }
}
