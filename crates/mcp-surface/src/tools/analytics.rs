//! Cross-registry comparison, drift, and statistics tools, fronting
//! `registry_service::analytics` (spec §4.6, §4.8).

use std::sync::Arc;

use async_trait::async_trait;
use registry_client::RegistryClient;
use registry_core::{Context, Scope, TaskType};
use registry_service::analytics::STATISTICS_TASK_THRESHOLD;
use registry_service::task_engine::{ProgressReporter, TaskWork};
use registry_service::ServiceResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{McpError, McpResult};
use crate::schemas::schema_for;
use crate::tool_table::{ToolContext, ToolHandler};

#[derive(Debug, Deserialize, JsonSchema)]
struct CompareRegistriesInput {
    source: String,
    target: String,
    #[serde(default)]
    context: Option<String>,
}

pub struct CompareRegistries;

#[async_trait]
impl ToolHandler for CompareRegistries {
    fn name(&self) -> &'static str {
        "compare_registries"
    }

    fn description(&self) -> &'static str {
        "Classify every subject between two registries as only-in-source, only-in-target, identical, or differing, with bounded concurrency."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<CompareRegistriesInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<registry_core::ComparisonResult>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: CompareRegistriesInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let source = ctx.manager.get(&input.source)?;
        let target = ctx.manager.get(&input.target)?;
        let context = Context::from_opt(input.context.as_deref());
        let result = registry_service::analytics::compare_registries(&source, &target, &context).await;
        Ok(serde_json::to_value(result).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GetRegistryStatisticsInput {
    registry: String,
}

/// Either the statistics themselves (registry at or under the task
/// threshold) or a task id to poll with `get_task_status` (spec §4.6).
#[derive(Debug, Serialize, JsonSchema)]
struct GetRegistryStatisticsOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<registry_core::RegistryStatistics>,
}

struct StatisticsWork {
    client: Arc<RegistryClient>,
}

#[async_trait]
impl TaskWork for StatisticsWork {
    async fn run(self: Box<Self>, _progress: ProgressReporter, _cancellation: CancellationToken) -> ServiceResult<Value> {
        let stats = registry_service::analytics::get_registry_statistics(&self.client).await?;
        Ok(serde_json::to_value(stats).unwrap())
    }
}

pub struct GetRegistryStatistics;

#[async_trait]
impl ToolHandler for GetRegistryStatistics {
    fn name(&self) -> &'static str {
        "get_registry_statistics"
    }

    fn description(&self) -> &'static str {
        "Count subjects, versions, and contexts in one registry. Runs as a background task above the statistics threshold for large registries."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<GetRegistryStatisticsInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<GetRegistryStatisticsOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: GetRegistryStatisticsInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let client = ctx.manager.get(&input.registry)?;

        // Subject count has to be known before we can decide whether this
        // runs as a task, which means one list call happens either way.
        let subject_count = client
            .list_subjects(&Context::default_context())
            .await
            .map_err(McpError::Client)?
            .len();

        if subject_count > STATISTICS_TASK_THRESHOLD {
            let task_id = ctx.task_engine.submit(
                TaskType::Statistics,
                Box::new(StatisticsWork { client: client.clone() }),
            );
            return Ok(serde_json::to_value(GetRegistryStatisticsOutput {
                task_id: Some(task_id.to_string()),
                statistics: None,
            })
            .unwrap());
        }

        let stats = registry_service::analytics::get_registry_statistics(&client)
            .await
            .map_err(McpError::Service)?;
        Ok(serde_json::to_value(GetRegistryStatisticsOutput {
            task_id: None,
            statistics: Some(stats),
        })
        .unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SchemaDriftInput {
    registries: Vec<String>,
    subject: String,
    #[serde(default)]
    context: Option<String>,
}

pub struct SchemaDrift;

#[async_trait]
impl ToolHandler for SchemaDrift {
    fn name(&self) -> &'static str {
        "schema_drift"
    }

    fn description(&self) -> &'static str {
        "Report which of a named set of registries carry a subject and whether its latest version diverges across them."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<SchemaDriftInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<registry_core::DriftEntry>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: SchemaDriftInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let mut clients = std::collections::HashMap::with_capacity(input.registries.len());
        for name in &input.registries {
            clients.insert(name.clone(), ctx.manager.get(name)?);
        }
        let context = Context::from_opt(input.context.as_deref());
        let entry = registry_service::analytics::schema_drift(&clients, &input.subject, &context).await;
        Ok(serde_json::to_value(entry).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DiffSchemaInput {
    source: String,
    target: String,
    subject: String,
    #[serde(default)]
    context: Option<String>,
}

pub struct DiffSchema;

#[async_trait]
impl ToolHandler for DiffSchema {
    fn name(&self) -> &'static str {
        "diff_schema"
    }

    fn description(&self) -> &'static str {
        "Per-version diff of one subject between two registries: source-only, target-only, and differing versions, plus a text diff of the latest."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<DiffSchemaInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<registry_core::SchemaDiff>()
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: DiffSchemaInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let source = ctx.manager.get(&input.source)?;
        let target = ctx.manager.get(&input.target)?;
        let context = Context::from_opt(input.context.as_deref());
        let diff = registry_service::analytics::diff_schema(&source, &target, &input.subject, &context)
            .await
            .map_err(McpError::Service)?;
        Ok(serde_json::to_value(diff).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TwoRegistryInput {
    source: String,
    target: String,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, serde::Serialize, JsonSchema)]
struct SubjectListOutput {
    subjects: Vec<String>,
}

pub struct FindMissingSchemas;

#[async_trait]
impl ToolHandler for FindMissingSchemas {
    fn name(&self) -> &'static str {
        "find_missing_schemas"
    }

    fn description(&self) -> &'static str {
        "List subjects present in the source registry but absent from the target, a derived view over compare_registries."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<TwoRegistryInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<SubjectListOutput>()
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: TwoRegistryInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let source = ctx.manager.get(&input.source)?;
        let target = ctx.manager.get(&input.target)?;
        let context = Context::from_opt(input.context.as_deref());
        let subjects = registry_service::analytics::find_missing_schemas(&source, &target, &context).await;
        Ok(serde_json::to_value(SubjectListOutput { subjects }).unwrap())
    }
}

pub struct FindSchemaConflicts;

#[async_trait]
impl ToolHandler for FindSchemaConflicts {
    fn name(&self) -> &'static str {
        "find_schema_conflicts"
    }

    fn description(&self) -> &'static str {
        "List subjects present in both registries whose latest versions diverge, a derived view over compare_registries."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<TwoRegistryInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<SubjectListOutput>()
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: TwoRegistryInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let source = ctx.manager.get(&input.source)?;
        let target = ctx.manager.get(&input.target)?;
        let context = Context::from_opt(input.context.as_deref());
        let subjects = registry_service::analytics::find_schema_conflicts(&source, &target, &context).await;
        Ok(serde_json::to_value(SubjectListOutput { subjects }).unwrap())
    }
}
