//! The `rmcp::ServerHandler` implementation: tool dispatch, SLIM_MODE
//! filtering, scope enforcement, structured-output validation, and the
//! resource surface (spec §4.8).

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, PaginatedRequestParams, ProtocolVersion,
    ReadResourceRequestParams, ReadResourceResult, ServerCapabilities, ServerInfo, Tool as McpTool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ErrorData;
use tracing::warn;

use crate::envelope::{envelope_error, envelope_success, RegistryMode};
use crate::error::McpError;
use crate::guard::TokenValidator;
use crate::resources;
use crate::tool_table::{ToolContext, ToolHandler};

/// Binds the tool table, the scope guard, and the shared [`ToolContext`]
/// into one `rmcp` service.
pub struct RegistryServerHandler {
    tools: Vec<Arc<dyn ToolHandler>>,
    ctx: Arc<ToolContext>,
    validator: Arc<dyn TokenValidator>,
    slim_mode: bool,
    registry_mode: RegistryMode,
    server_version: String,
}

impl RegistryServerHandler {
    pub fn new(
        tools: Vec<Arc<dyn ToolHandler>>,
        ctx: Arc<ToolContext>,
        validator: Arc<dyn TokenValidator>,
        slim_mode: bool,
    ) -> Self {
        let registry_mode = RegistryMode::from_count(ctx.manager.names().len());
        RegistryServerHandler {
            tools,
            ctx,
            validator,
            slim_mode,
            registry_mode,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn visible_tools(&self) -> impl Iterator<Item = &Arc<dyn ToolHandler>> {
        self.tools
            .iter()
            .filter(move |tool| !self.slim_mode || tool.slim_mode_visible())
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// `Authorization: Bearer <token>` lifted from the transport's request
    /// extensions. Populated by the SSE transport's axum middleware;
    /// absent over stdio, where auth is controlled purely by
    /// `ENABLE_AUTH`/the process's own trust boundary (spec §4.4).
    fn bearer_token(context: &RequestContext<RoleServer>) -> Option<String> {
        context
            .extensions
            .get::<axum::http::HeaderMap>()
            .and_then(|headers| headers.get(axum::http::header::AUTHORIZATION))
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.to_string())
    }

    async fn call_tool_checked(
        &self,
        tool: &Arc<dyn ToolHandler>,
        input: serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<serde_json::Value, McpError> {
        let scopes = self.validator.validate(bearer);
        if !scopes.contains(tool.required_scope()) {
            return Err(McpError::InsufficientScope {
                required: tool.required_scope(),
            });
        }

        let output = tool.call(&self.ctx, input).await?;
        if let Err(e) = validate_structured_output(&tool.output_schema(), &output) {
            warn!(tool = tool.name(), error = %e, "structured output failed schema validation");
            let mut output = output;
            if let serde_json::Value::Object(map) = &mut output {
                map.insert("structured_output_validation_failed".to_string(), serde_json::Value::Bool(true));
            }
            return Ok(output);
        }
        Ok(output)
    }

    /// Shared entry point for both transports: resolves the tool, enforces
    /// scope, runs it, and wraps the result (or error) in the response
    /// envelope. Used directly by the hand-rolled SSE route; `call_tool`
    /// below adapts it to `rmcp`'s `CallToolResult` shape for stdio.
    pub async fn dispatch(&self, tool_name: &str, input: serde_json::Value, bearer: Option<&str>) -> (serde_json::Value, bool) {
        let tool = match self.find_tool(tool_name) {
            Some(tool) => tool,
            None => {
                let err = McpError::UnknownTool(tool_name.to_string());
                return (serde_json::to_value(envelope_error(self.registry_mode, &err.to_payload())).unwrap(), true);
            }
        };
        match self.call_tool_checked(tool, input, bearer).await {
            Ok(result) => (envelope_success(self.registry_mode, result), false),
            Err(e) => (
                serde_json::to_value(envelope_error(self.registry_mode, &e.to_payload())).unwrap(),
                true,
            ),
        }
    }

    /// The tool table as `(name, description, input_schema)` triples,
    /// filtered by `SLIM_MODE`, for the SSE route's own `list_tools`
    /// endpoint.
    pub fn tool_catalog(&self) -> Vec<serde_json::Value> {
        self.visible_tools()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "input_schema": tool.input_schema(),
                    "output_schema": tool.output_schema(),
                    "required_scope": tool.required_scope().to_string(),
                })
            })
            .collect()
    }
}

/// Validates a tool's output against its own declared schema (spec §4.8,
/// §7 "structured_output_validation_failed"). A validation failure never
/// fails the call outright — it only flags the payload, since the result
/// itself already reached the caller successfully.
fn validate_structured_output(schema: &serde_json::Value, output: &serde_json::Value) -> Result<(), String> {
    let compiled = jsonschema::JSONSchema::compile(schema).map_err(|e| e.to_string())?;
    compiled
        .validate(output)
        .map_err(|mut errors| errors.next().map(|e| e.to_string()).unwrap_or_default())
}

impl rmcp::ServerHandler for RegistryServerHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "schema-registry-mcp".to_string(),
                version: self.server_version.clone(),
                ..Default::default()
            },
            instructions: Some(
                "Control plane for one or more Confluent-style Schema Registries: inventory, \
                 schema CRUD, cross-registry comparison, bulk context migration, and recurring \
                 sync jobs. Mutating tools default to dry-run where the tool description says so."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools: Vec<McpTool> = self
            .visible_tools()
            .map(|tool| {
                let schema = tool.input_schema().as_object().cloned().unwrap_or_default();
                McpTool {
                    name: Cow::Owned(tool.name().to_string()),
                    title: None,
                    description: Some(Cow::Owned(tool.description().to_string())),
                    input_schema: Arc::new(schema),
                    output_schema: tool.output_schema().as_object().cloned().map(Arc::new),
                    annotations: None,
                    execution: None,
                    icons: None,
                    meta: None,
                }
            })
            .collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let tool_name = request.name.to_string();
        let input = match request.arguments {
            Some(map) => serde_json::Value::Object(map),
            None => serde_json::Value::Object(serde_json::Map::new()),
        };

        let (body, is_error) = self.dispatch(&tool_name, input, Self::bearer_token(&context).as_deref()).await;
        let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
        if is_error {
            Ok(CallToolResult::error(vec![Content::text(text)]))
        } else {
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult {
            meta: None,
            next_cursor: None,
            resources: resources::list_resources(&self.ctx),
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(ListResourceTemplatesResult {
            meta: None,
            next_cursor: None,
            resource_templates: resources::list_resource_templates(),
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        match resources::read_resource(&request.uri, &self.ctx).await {
            Ok(contents) => Ok(ReadResourceResult {
                contents: vec![contents],
                meta: None,
            }),
            Err(e) => Err(ErrorData::invalid_params(e.to_string(), None)),
        }
    }
}
