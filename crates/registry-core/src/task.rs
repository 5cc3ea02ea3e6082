//! Task identity and state machine shared by the Task Engine and every
//! tool that reports progress through it (spec §3 "Task", §4.3).

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// An opaque, server-generated task identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Ulid);

impl TaskId {
    pub fn new() -> Self {
        TaskId(Ulid::new())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        TaskId::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of long-running work a task represents (spec §3 "Task").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskType {
    Migration,
    Sync,
    Cleanup,
    Export,
    Import,
    Statistics,
    Compare,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskType::Migration => "MIGRATION",
            TaskType::Sync => "SYNC",
            TaskType::Cleanup => "CLEANUP",
            TaskType::Export => "EXPORT",
            TaskType::Import => "IMPORT",
            TaskType::Statistics => "STATISTICS",
            TaskType::Compare => "COMPARE",
        };
        write!(f, "{s}")
    }
}

/// The task state machine (spec §3): `Pending -> Running -> {terminal}`.
/// Terminal states never transition further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "PENDING",
            TaskState::Running => "RUNNING",
            TaskState::Completed => "COMPLETED",
            TaskState::Failed => "FAILED",
            TaskState::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// A progress update a running task publishes to its record.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProgressReport {
    /// 0..100.
    pub percent: u8,
    pub message: String,
}

impl ProgressReport {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        ProgressReport {
            percent: percent.min(100),
            message: message.into(),
        }
    }
}

/// The server-owned record for one task (spec §3 "Task").
///
/// Produced and mutated only by the Task Engine; every tool handler sees an
/// immutable snapshot via `get_task_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub task_type: TaskType,
    pub state: TaskState,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub progress_percent: u8,
    pub progress_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<crate::error::ErrorPayload>,
}

impl TaskRecord {
    pub fn new(task_type: TaskType, now: chrono::DateTime<chrono::Utc>) -> Self {
        TaskRecord {
            id: TaskId::new(),
            task_type,
            state: TaskState::Pending,
            created_at: now,
            started_at: None,
            ended_at: None,
            progress_percent: 0,
            progress_message: String::new(),
            result: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_exactly_completed_failed_cancelled() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
    }

    #[test]
    fn progress_report_clamps_percent_to_100() {
        let report = ProgressReport::new(250, "overshoot");
        assert_eq!(report.percent, 100);
    }

    #[test]
    fn new_task_record_starts_pending_with_no_result_or_error() {
        let record = TaskRecord::new(TaskType::Migration, chrono::Utc::now());
        assert_eq!(record.state, TaskState::Pending);
        assert!(record.result.is_none());
        assert!(record.error.is_none());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn task_ids_are_unique() {
        assert_ne!(TaskId::new(), TaskId::new());
    }
}
