//! Task status, cancellation, and listing tools, fronting the Task Engine
//! (spec §4.3, §4.8).

use async_trait::async_trait;
use registry_core::{Scope, TaskId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{McpError, McpResult};
use crate::schemas::schema_for;
use crate::tool_table::{ToolContext, ToolHandler};

/// A JSON-Schema-friendly mirror of [`registry_core::TaskRecord`] — the
/// core type carries a ULID-backed id and `chrono` timestamps that are
/// rendered as plain strings at the MCP boundary instead.
#[derive(Debug, Serialize, JsonSchema)]
struct TaskStatusOutput {
    id: String,
    task_type: registry_core::TaskType,
    state: registry_core::TaskState,
    created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ended_at: Option<String>,
    progress_percent: u8,
    progress_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<registry_core::ErrorPayload>,
}

impl From<registry_core::TaskRecord> for TaskStatusOutput {
    fn from(record: registry_core::TaskRecord) -> Self {
        TaskStatusOutput {
            id: record.id.to_string(),
            task_type: record.task_type,
            state: record.state,
            created_at: record.created_at.to_rfc3339(),
            started_at: record.started_at.map(|t| t.to_rfc3339()),
            ended_at: record.ended_at.map(|t| t.to_rfc3339()),
            progress_percent: record.progress_percent,
            progress_message: record.progress_message,
            result: record.result,
            error: record.error,
        }
    }
}

fn parse_task_id(raw: &str) -> McpResult<TaskId> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| McpError::InvalidArgument(format!("invalid task id: {raw}")))
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TaskIdInput {
    task_id: String,
}

pub struct GetTaskStatus;

#[async_trait]
impl ToolHandler for GetTaskStatus {
    fn name(&self) -> &'static str {
        "get_task_status"
    }

    fn description(&self) -> &'static str {
        "Fetch the current state, progress, and (if terminal) result or error of a task."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<TaskIdInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<TaskStatusOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: TaskIdInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let id = parse_task_id(&input.task_id)?;
        let record = ctx.task_engine.get_task_status(id).map_err(McpError::Service)?;
        Ok(serde_json::to_value(TaskStatusOutput::from(record)).unwrap())
    }
}

#[derive(Debug, Serialize, JsonSchema)]
struct CancelTaskOutput {
    cancelled: bool,
}

pub struct CancelTask;

#[async_trait]
impl ToolHandler for CancelTask {
    fn name(&self) -> &'static str {
        "cancel_task"
    }

    fn description(&self) -> &'static str {
        "Cooperatively cancel a running or pending task. A no-op error on an already-terminal task."
    }

    fn required_scope(&self) -> Scope {
        Scope::Write
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<TaskIdInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<CancelTaskOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: TaskIdInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let id = parse_task_id(&input.task_id)?;
        ctx.task_engine.cancel(id).map_err(McpError::Service)?;
        Ok(serde_json::to_value(CancelTaskOutput { cancelled: true }).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListTasksInput {
    /// When set, list only tasks of this type; otherwise list every
    /// non-terminal task.
    #[serde(default)]
    task_type: Option<registry_core::TaskType>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ListTasksOutput {
    tasks: Vec<TaskStatusOutput>,
}

pub struct ListTasks;

#[async_trait]
impl ToolHandler for ListTasks {
    fn name(&self) -> &'static str {
        "list_tasks"
    }

    fn description(&self) -> &'static str {
        "List active tasks, or every task of a given type regardless of state."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<ListTasksInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<ListTasksOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: ListTasksInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let records = match input.task_type {
            Some(task_type) => ctx.task_engine.list_by_type(task_type),
            None => ctx.task_engine.list_active(),
        };
        let tasks = records.into_iter().map(TaskStatusOutput::from).collect();
        Ok(serde_json::to_value(ListTasksOutput { tasks }).unwrap())
    }
}
