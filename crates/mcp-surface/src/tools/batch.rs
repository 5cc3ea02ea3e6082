//! Bulk deletion tools, fronting `registry_service::batch` (spec §4.7, §4.8).

use std::collections::HashMap;

use async_trait::async_trait;
use registry_core::{Context, Scope};
use registry_service::batch::{
    clear_context_across_registries_batch, clear_context_batch, clear_multiple_contexts_batch, BatchOutcome, DryRun,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{McpError, McpResult};
use crate::schemas::schema_for;
use crate::tool_table::{ToolContext, ToolHandler};

#[derive(Debug, Deserialize, JsonSchema)]
struct ClearContextInput {
    registry: String,
    #[serde(default)]
    context: Option<String>,
    /// Defaults to `true`: callers must explicitly set this to `false` to
    /// perform a real deletion (spec §4.7 "hard invariant").
    #[serde(default = "default_dry_run")]
    dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

pub struct ClearContext;

#[async_trait]
impl ToolHandler for ClearContext {
    fn name(&self) -> &'static str {
        "clear_context"
    }

    fn description(&self) -> &'static str {
        "Delete every subject in a context, with bounded concurrency. Defaults to a dry run; pass dry_run=false to execute."
    }

    fn required_scope(&self) -> Scope {
        Scope::Admin
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<ClearContextInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<BatchOutcome>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: ClearContextInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let client = ctx.manager.get(&input.registry)?;
        let context = Context::from_opt(input.context.as_deref());
        let outcome = clear_context_batch(&client, &context, DryRun::explicit(input.dry_run))
            .await
            .map_err(McpError::Client)?;
        Ok(serde_json::to_value(outcome).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ClearMultipleContextsInput {
    registry: String,
    contexts: Vec<String>,
    #[serde(default = "default_dry_run")]
    dry_run: bool,
}

pub struct ClearMultipleContexts;

#[async_trait]
impl ToolHandler for ClearMultipleContexts {
    fn name(&self) -> &'static str {
        "clear_multiple_contexts"
    }

    fn description(&self) -> &'static str {
        "Delete every subject across several contexts on one registry, one context at a time. Defaults to a dry run; pass dry_run=false to execute."
    }

    fn required_scope(&self) -> Scope {
        Scope::Admin
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<ClearMultipleContextsInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<BatchOutcome>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: ClearMultipleContextsInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let client = ctx.manager.get(&input.registry)?;
        let contexts: Vec<Context> = input.contexts.iter().map(|c| Context::from_opt(Some(c))).collect();
        let outcome = clear_multiple_contexts_batch(&client, &contexts, DryRun::explicit(input.dry_run))
            .await
            .map_err(McpError::Client)?;
        Ok(serde_json::to_value(outcome).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ClearContextAcrossRegistriesInput {
    registries: Vec<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default = "default_dry_run")]
    dry_run: bool,
}

#[derive(Debug, serde::Serialize, JsonSchema)]
struct ClearContextAcrossRegistriesOutput {
    rollup: HashMap<String, BatchOutcome>,
}

pub struct ClearContextAcrossRegistries;

#[async_trait]
impl ToolHandler for ClearContextAcrossRegistries {
    fn name(&self) -> &'static str {
        "clear_context_across_registries"
    }

    fn description(&self) -> &'static str {
        "Delete a context's subjects across several registries concurrently, returning a per-registry rollup. Blocked entirely if any target registry is view-only and dry_run=false."
    }

    fn required_scope(&self) -> Scope {
        Scope::Admin
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<ClearContextAcrossRegistriesInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<ClearContextAcrossRegistriesOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: ClearContextAcrossRegistriesInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let mut clients = HashMap::with_capacity(input.registries.len());
        for name in &input.registries {
            clients.insert(name.clone(), ctx.manager.get(name)?);
        }
        let context = Context::from_opt(input.context.as_deref());
        let rollup = clear_context_across_registries_batch(&clients, &context, DryRun::explicit(input.dry_run))
            .await
            .map_err(McpError::Client)?;
        Ok(serde_json::to_value(ClearContextAcrossRegistriesOutput { rollup }).unwrap())
    }
}
