//! Periodic sync job tools, fronting the Sync Scheduler (spec §3 "SyncJob",
//! §4.8).

use async_trait::async_trait;
use registry_core::{Scope, SyncDirection, SyncJob, SyncJobId, SyncScope};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{McpError, McpResult};
use crate::schemas::schema_for;
use crate::tool_table::{ToolContext, ToolHandler};

/// A JSON-Schema-friendly mirror of [`SyncJob`] — the core type's id and
/// timestamps don't derive `JsonSchema` (a ULID newtype and `chrono`
/// timestamps respectively), so they're rendered as plain strings here.
#[derive(Debug, Serialize, JsonSchema)]
struct SyncJobOutput {
    id: String,
    source_registry: String,
    target_registry: String,
    scope: SyncScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope_name: Option<String>,
    direction: SyncDirection,
    interval_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_run_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_run_at: Option<String>,
    running_count: u32,
}

impl From<SyncJob> for SyncJobOutput {
    fn from(job: SyncJob) -> Self {
        SyncJobOutput {
            id: job.id.to_string(),
            source_registry: job.source_registry,
            target_registry: job.target_registry,
            scope: job.scope,
            scope_name: job.scope_name,
            direction: job.direction,
            interval_seconds: job.interval_seconds,
            last_run_at: job.last_run_at.map(|t| t.to_rfc3339()),
            next_run_at: job.next_run_at.map(|t| t.to_rfc3339()),
            running_count: job.running_count,
        }
    }
}

fn parse_sync_job_id(raw: &str) -> McpResult<SyncJobId> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| McpError::InvalidArgument(format!("invalid sync job id: {raw}")))
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ScheduleSyncJobInput {
    source_registry: String,
    target_registry: String,
    scope: SyncScope,
    #[serde(default)]
    scope_name: Option<String>,
    direction: SyncDirection,
    interval_seconds: u64,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ScheduleSyncJobOutput {
    job_id: String,
}

pub struct ScheduleSyncJob;

#[async_trait]
impl ToolHandler for ScheduleSyncJob {
    fn name(&self) -> &'static str {
        "schedule_sync_job"
    }

    fn description(&self) -> &'static str {
        "Schedule a recurring sync between two registries. At most one run per job is ever in flight; a tick that fires while the previous run is still active is skipped."
    }

    fn required_scope(&self) -> Scope {
        Scope::Admin
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<ScheduleSyncJobInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<ScheduleSyncJobOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: ScheduleSyncJobInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let job_id = ctx
            .sync_scheduler
            .schedule(
                input.source_registry,
                input.target_registry,
                input.scope,
                input.scope_name,
                input.direction,
                input.interval_seconds,
            )
            .map_err(McpError::Service)?;
        Ok(serde_json::to_value(ScheduleSyncJobOutput {
            job_id: job_id.to_string(),
        })
        .unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct EmptyInput {}

#[derive(Debug, Serialize, JsonSchema)]
struct ListSyncJobsOutput {
    jobs: Vec<SyncJobOutput>,
}

pub struct ListSyncJobs;

#[async_trait]
impl ToolHandler for ListSyncJobs {
    fn name(&self) -> &'static str {
        "list_sync_jobs"
    }

    fn description(&self) -> &'static str {
        "List every currently scheduled sync job."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<EmptyInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<ListSyncJobsOutput>()
    }

    async fn call(&self, ctx: &ToolContext, _input: Value) -> McpResult<Value> {
        let jobs = ctx.sync_scheduler.list().into_iter().map(SyncJobOutput::from).collect();
        Ok(serde_json::to_value(ListSyncJobsOutput { jobs }).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SyncJobIdInput {
    job_id: String,
}

pub struct GetSyncJob;

#[async_trait]
impl ToolHandler for GetSyncJob {
    fn name(&self) -> &'static str {
        "get_sync_job"
    }

    fn description(&self) -> &'static str {
        "Fetch one scheduled sync job by id, including its last/next run times and whether a run is currently in flight."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<SyncJobIdInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<SyncJobOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: SyncJobIdInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let id = parse_sync_job_id(&input.job_id)?;
        let job = ctx.sync_scheduler.get(id).map_err(McpError::Service)?;
        Ok(serde_json::to_value(SyncJobOutput::from(job)).unwrap())
    }
}

#[derive(Debug, Serialize, JsonSchema)]
struct DeleteSyncJobOutput {
    deleted: bool,
}

pub struct DeleteSyncJob;

#[async_trait]
impl ToolHandler for DeleteSyncJob {
    fn name(&self) -> &'static str {
        "delete_sync_job"
    }

    fn description(&self) -> &'static str {
        "Cancel and remove a scheduled sync job."
    }

    fn required_scope(&self) -> Scope {
        Scope::Admin
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<SyncJobIdInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<DeleteSyncJobOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: SyncJobIdInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let id = parse_sync_job_id(&input.job_id)?;
        ctx.sync_scheduler.delete(id).map_err(McpError::Service)?;
        Ok(serde_json::to_value(DeleteSyncJobOutput { deleted: true }).unwrap())
    }
}
