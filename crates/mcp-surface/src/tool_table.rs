//! The tool table (spec §4.8 "Tool Registry / MCP Surface (C8)"): the
//! `ToolHandler` trait every tool implements and the shared state handed to
//! each call.

use std::sync::Arc;

use async_trait::async_trait;
use registry_core::Scope;
use registry_service::{MigrationEngine, RegistryManager, TaskEngine};
use serde_json::Value;

use crate::error::McpResult;
use registry_service::elicitation::{ElicitationStore, SmartDefaultsStore};
use registry_service::sync_job::SyncScheduler;

/// Everything a tool handler needs to do its work. Held once per server
/// process and handed to every call by reference.
pub struct ToolContext {
    pub manager: Arc<RegistryManager>,
    pub task_engine: Arc<TaskEngine>,
    pub migration_engine: Arc<MigrationEngine>,
    pub sync_scheduler: Arc<SyncScheduler>,
    pub elicitation: Arc<ElicitationStore>,
    pub smart_defaults: Arc<SmartDefaultsStore>,
    /// `ENABLE_MIGRATION` (spec §4.5 part B): when false, `migrate_context`
    /// renders a migration bundle instead of executing directly, the same
    /// fallback used when a caller asks for a bundle explicitly. The tool
    /// stays in the table either way so a client that cached the tool list
    /// never sees it vanish.
    pub enable_migration: bool,
}

/// One callable MCP tool. Implementors own their own input/output types
/// internally and only expose JSON at this boundary, mirroring how a
/// dynamically-dispatched tool registry has to work once tools are stored
/// as `Arc<dyn ToolHandler>` (spec §4.8).
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn required_scope(&self) -> Scope;
    fn input_schema(&self) -> Value;
    fn output_schema(&self) -> Value;

    /// Whether this tool is advertised when `SLIM_MODE=true` (spec §4.8
    /// "Slim mode"). Destructive and operator-only tools default to
    /// hidden; read-only and common-path tools default to visible.
    fn slim_mode_visible(&self) -> bool {
        true
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value>;
}

/// Build the full, unfiltered tool table (spec §4.8). `SLIM_MODE` filtering
/// is applied by the caller (the `ServerHandler`'s `list_tools`), not here,
/// so `call_tool` can still serve a tool a client learned about before
/// slim mode was toggled on.
pub fn build_tool_table() -> Vec<Arc<dyn ToolHandler>> {
    use crate::tools::*;

    vec![
        Arc::new(registry::ListRegistries),
        Arc::new(registry::TestConnection),
        Arc::new(registry::TestAllConnections),
        Arc::new(schema::ListSubjects),
        Arc::new(schema::GetSchema),
        Arc::new(schema::RegisterSchema),
        Arc::new(schema::DeleteSubject),
        Arc::new(schema::GetConfig),
        Arc::new(schema::SetConfig),
        Arc::new(schema::GetMode),
        Arc::new(schema::SetMode),
        Arc::new(migration::MigrateContext),
        Arc::new(migration::GetMigrationBundle),
        Arc::new(analytics::CompareRegistries),
        Arc::new(analytics::GetRegistryStatistics),
        Arc::new(analytics::SchemaDrift),
        Arc::new(analytics::DiffSchema),
        Arc::new(analytics::FindMissingSchemas),
        Arc::new(analytics::FindSchemaConflicts),
        Arc::new(batch::ClearContext),
        Arc::new(batch::ClearMultipleContexts),
        Arc::new(batch::ClearContextAcrossRegistries),
        Arc::new(tasks::GetTaskStatus),
        Arc::new(tasks::CancelTask),
        Arc::new(tasks::ListTasks),
        Arc::new(sync::ScheduleSyncJob),
        Arc::new(sync::ListSyncJobs),
        Arc::new(sync::GetSyncJob),
        Arc::new(sync::DeleteSyncJob),
    ]
}
