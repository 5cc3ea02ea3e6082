//! Domain types, error taxonomy, and the context-aware URL builder shared
//! by every layer of the schema registry control plane.
//!
//! This crate does no I/O. It exists so `registry-client`,
//! `registry-service`, and `mcp-surface` all agree on one definition of a
//! registry, a context, a subject, a task, and a stable error code.

pub mod comparison;
pub mod context;
pub mod error;
pub mod migration;
pub mod mode;
pub mod registry;
pub mod scope;
pub mod ssrf;
pub mod subject;
pub mod sync_job;
pub mod task;

pub use comparison::{ComparisonResult, DriftEntry, Relation, RelationBucket, RegistryStatistics, SchemaDiff};
pub use context::Context;
pub use error::{CoreError, ErrorCode, ErrorPayload};
pub use migration::{
    ConflictPolicy, MigrationBundle, MigrationEndpoint, MigrationPlan, MigrationResult,
    MigrationStatus, MigrationVersionEntry, VersionSelector,
};
pub use mode::Mode;
pub use registry::{Credentials, RegistryInfo, RegistryName, RegistryRecord, SsrfPolicy, TlsOptions};
pub use scope::{Scope, ScopeSet};
pub use ssrf::validate_base_url;
pub use subject::{SchemaReference, SchemaType, SchemaVersion, SubjectName};
pub use sync_job::{SyncDirection, SyncJob, SyncJobId, SyncScope};
pub use task::{ProgressReport, TaskId, TaskRecord, TaskState, TaskType};
