//! Subject and schema lifecycle tools, fronting one registry client at a
//! time via the Registry Manager (spec §4.1, §4.8).

use async_trait::async_trait;
use registry_core::{Context, SchemaReference, SchemaType, Scope};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{McpError, McpResult};
use crate::schemas::schema_for;
use crate::tool_table::{ToolContext, ToolHandler};

#[derive(Debug, Deserialize, JsonSchema)]
struct ListSubjectsInput {
    registry: String,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ListSubjectsOutput {
    subjects: Vec<String>,
}

pub struct ListSubjects;

#[async_trait]
impl ToolHandler for ListSubjects {
    fn name(&self) -> &'static str {
        "list_subjects"
    }

    fn description(&self) -> &'static str {
        "List every subject registered in a registry, optionally scoped to a named context."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<ListSubjectsInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<ListSubjectsOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: ListSubjectsInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let client = ctx.manager.get(&input.registry)?;
        let context = Context::from_opt(input.context.as_deref());
        let subjects = client.list_subjects(&context).await.map_err(McpError::Client)?;
        Ok(serde_json::to_value(ListSubjectsOutput { subjects }).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GetSchemaInput {
    registry: String,
    subject: String,
    #[serde(default)]
    context: Option<String>,
    /// A version number, or `"latest"` (default).
    #[serde(default = "default_version")]
    version: String,
}

fn default_version() -> String {
    "latest".to_string()
}

pub struct GetSchema;

#[async_trait]
impl ToolHandler for GetSchema {
    fn name(&self) -> &'static str {
        "get_schema"
    }

    fn description(&self) -> &'static str {
        "Fetch one version (or the latest version) of a subject's schema."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<GetSchemaInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<registry_client::FetchedSchema>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: GetSchemaInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let client = ctx.manager.get(&input.registry)?;
        let context = Context::from_opt(input.context.as_deref());
        let schema = client
            .get_schema(&input.subject, &input.version, &context)
            .await
            .map_err(McpError::Client)?;
        Ok(serde_json::to_value(schema).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RegisterSchemaInput {
    registry: String,
    subject: String,
    schema: String,
    #[serde(default)]
    schema_type: SchemaType,
    #[serde(default)]
    references: Vec<SchemaReference>,
    #[serde(default)]
    context: Option<String>,
}

pub struct RegisterSchema;

#[async_trait]
impl ToolHandler for RegisterSchema {
    fn name(&self) -> &'static str {
        "register_schema"
    }

    fn description(&self) -> &'static str {
        "Register a new schema version for a subject. Rejected with REGISTRY_VIEWONLY on a read-only registry."
    }

    fn required_scope(&self) -> Scope {
        Scope::Write
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<RegisterSchemaInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<registry_client::RegisteredSchema>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: RegisterSchemaInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let client = ctx.manager.get(&input.registry)?;
        let context = Context::from_opt(input.context.as_deref());
        let registered = client
            .register_schema(
                &input.subject,
                &input.schema,
                input.schema_type,
                &input.references,
                &context,
                None,
            )
            .await
            .map_err(McpError::Client)?;
        Ok(serde_json::to_value(registered).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DeleteSubjectInput {
    registry: String,
    subject: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    permanent: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
struct DeleteSubjectOutput {
    deleted_versions: Vec<i32>,
}

pub struct DeleteSubject;

#[async_trait]
impl ToolHandler for DeleteSubject {
    fn name(&self) -> &'static str {
        "delete_subject"
    }

    fn description(&self) -> &'static str {
        "Soft- or hard-delete a subject and all its versions. Rejected with REGISTRY_VIEWONLY on a read-only registry."
    }

    fn required_scope(&self) -> Scope {
        Scope::Write
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<DeleteSubjectInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<DeleteSubjectOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: DeleteSubjectInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let client = ctx.manager.get(&input.registry)?;
        let context = Context::from_opt(input.context.as_deref());
        let deleted_versions = client
            .delete_subject(&input.subject, &context, input.permanent)
            .await
            .map_err(McpError::Client)?;
        Ok(serde_json::to_value(DeleteSubjectOutput { deleted_versions }).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GetConfigInput {
    registry: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct GetConfigOutput {
    compatibility_level: String,
}

pub struct GetConfig;

#[async_trait]
impl ToolHandler for GetConfig {
    fn name(&self) -> &'static str {
        "get_config"
    }

    fn description(&self) -> &'static str {
        "Read the compatibility level for a registry, or a single subject within it."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<GetConfigInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<GetConfigOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: GetConfigInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let client = ctx.manager.get(&input.registry)?;
        let context = Context::from_opt(input.context.as_deref());
        let compatibility_level = client
            .get_config(input.subject.as_deref(), &context)
            .await
            .map_err(McpError::Client)?;
        Ok(serde_json::to_value(GetConfigOutput { compatibility_level }).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SetConfigInput {
    registry: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    context: Option<String>,
    compatibility: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct SetConfigOutput {
    compatibility: String,
}

pub struct SetConfig;

#[async_trait]
impl ToolHandler for SetConfig {
    fn name(&self) -> &'static str {
        "set_config"
    }

    fn description(&self) -> &'static str {
        "Set the compatibility level for a registry, or a single subject within it. Rejected with REGISTRY_VIEWONLY on a read-only registry."
    }

    fn required_scope(&self) -> Scope {
        Scope::Write
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<SetConfigInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<SetConfigOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: SetConfigInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let client = ctx.manager.get(&input.registry)?;
        let context = Context::from_opt(input.context.as_deref());
        client
            .set_config(input.subject.as_deref(), &context, &input.compatibility)
            .await
            .map_err(McpError::Client)?;
        Ok(serde_json::to_value(SetConfigOutput {
            compatibility: input.compatibility,
        })
        .unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GetModeInput {
    registry: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct GetModeOutput {
    /// `READWRITE`, `READONLY`, or `IMPORT`.
    mode: String,
}

pub struct GetMode;

#[async_trait]
impl ToolHandler for GetMode {
    fn name(&self) -> &'static str {
        "get_mode"
    }

    fn description(&self) -> &'static str {
        "Read the current mode of a registry, or a single subject within it."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<GetModeInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<GetModeOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: GetModeInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let client = ctx.manager.get(&input.registry)?;
        let context = Context::from_opt(input.context.as_deref());
        let mode = client
            .get_mode(input.subject.as_deref(), &context)
            .await
            .map_err(McpError::Client)?;
        Ok(serde_json::to_value(GetModeOutput { mode: mode.to_string() }).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SetModeInput {
    registry: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    context: Option<String>,
    /// `READWRITE`, `READONLY`, or `IMPORT`.
    mode: String,
}

pub struct SetMode;

#[async_trait]
impl ToolHandler for SetMode {
    fn name(&self) -> &'static str {
        "set_mode"
    }

    fn description(&self) -> &'static str {
        "Set the mode of a registry, or a single subject within it. Prefer migrate_context over calling this directly for IMPORT windows."
    }

    fn required_scope(&self) -> Scope {
        Scope::Admin
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<SetModeInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<GetModeOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: SetModeInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let mode = registry_core::Mode::parse(&input.mode)
            .ok_or_else(|| McpError::InvalidArgument(format!("unrecognized mode: {}", input.mode)))?;
        let client = ctx.manager.get(&input.registry)?;
        let context = Context::from_opt(input.context.as_deref());
        client
            .set_mode(input.subject.as_deref(), &context, mode, false)
            .await
            .map_err(McpError::Client)?;
        Ok(serde_json::to_value(GetModeOutput { mode: mode.to_string() }).unwrap())
    }
}
