//! In-memory periodic sync job definitions (spec §3 "SyncJob").

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// An opaque sync job identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncJobId(Ulid);

impl SyncJobId {
    pub fn new() -> Self {
        SyncJobId(Ulid::new())
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        SyncJobId::new()
    }
}

impl fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a sync job keeps aligned between registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncScope {
    Registry,
    Context,
    Subject,
}

/// Which way schemas flow during a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    Push,
    Pull,
    Bidirectional,
}

/// The definition of a scheduled, recurring sync between two registries.
///
/// Held entirely in memory by the sync scheduler (spec §3 "In-memory
/// only"); nothing here is persisted across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: SyncJobId,
    pub source_registry: String,
    pub target_registry: String,
    pub scope: SyncScope,
    /// The subject or context name this job is scoped to, when
    /// `scope != Registry`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_name: Option<String>,
    pub direction: SyncDirection,
    pub interval_seconds: u64,
    pub last_run_at: Option<chrono::DateTime<chrono::Utc>>,
    pub next_run_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Always 0 or 1: a job's own lock prevents overlapping runs.
    pub running_count: u32,
}

impl SyncJob {
    pub fn new(
        source_registry: impl Into<String>,
        target_registry: impl Into<String>,
        scope: SyncScope,
        scope_name: Option<String>,
        direction: SyncDirection,
        interval_seconds: u64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        SyncJob {
            id: SyncJobId::new(),
            source_registry: source_registry.into(),
            target_registry: target_registry.into(),
            scope,
            scope_name,
            direction,
            interval_seconds,
            last_run_at: None,
            next_run_at: Some(now + chrono::Duration::seconds(interval_seconds as i64)),
            running_count: 0,
        }
    }
}
