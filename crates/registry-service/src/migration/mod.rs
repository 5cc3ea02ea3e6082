//! The Migration Engine (spec §4.5 "Migration Engine (C5)").

pub mod bundle;
pub mod import_lock;

pub use import_lock::{ImportLockRegistry, ImportModeGuard};

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use registry_client::{ClientError, RegistryClient};
use registry_core::{
    ConflictPolicy, MigrationPlan, MigrationResult, MigrationStatus, MigrationVersionEntry,
    VersionSelector,
};
use tracing::{instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::manager::RegistryManager;

/// Bounded concurrency between subjects within one context migration
/// (spec §5 "Between subjects in a context migration ... default 4").
const DEFAULT_SUBJECT_CONCURRENCY: usize = 4;

pub struct MigrationEngine {
    manager: Arc<RegistryManager>,
    import_locks: ImportLockRegistry,
}

impl MigrationEngine {
    pub fn new(manager: Arc<RegistryManager>) -> Self {
        MigrationEngine {
            manager,
            import_locks: ImportLockRegistry::new(),
        }
    }

    #[instrument(skip(self, plan))]
    pub async fn execute(&self, plan: MigrationPlan) -> ServiceResult<MigrationResult> {
        let source = self.manager.get(&plan.source.registry)?;
        let target = self.manager.get(&plan.target.registry)?;

        let subjects = match &plan.subjects {
            Some(list) => list.clone(),
            None => source.list_subjects(&plan.source.context).await.map_err(ServiceError::Client)?,
        };

        // Step 2: snapshot and flip the target's global mode once for the
        // whole plan, restored on every exit path via the guard's Drop.
        let guard = if plan.preserve_ids && !plan.dry_run {
            Some(self.import_locks.acquire(target.clone(), None, plan.target.context.clone()).await?)
        } else {
            None
        };

        let results: Vec<ServiceResult<(String, Vec<MigrationVersionEntry>)>> = stream::iter(subjects)
            .map(|subject| {
                let source = source.clone();
                let target = target.clone();
                let plan = &plan;
                async move {
                    migrate_subject(&source, &target, &subject, plan)
                        .await
                        .map(|entries| (subject, entries))
                }
            })
            .buffer_unordered(DEFAULT_SUBJECT_CONCURRENCY)
            .collect()
            .await;

        if let Some(guard) = guard {
            guard.release().await?;
        }

        let mut versions = Vec::new();
        let mut failed_subjects = Vec::new();
        for result in results {
            match result {
                Ok((_, subject_entries)) => versions.extend(subject_entries),
                Err(err) => {
                    if plan.continue_on_subject_failure {
                        warn!(error = %err, "subject migration failed, continuing per plan");
                        failed_subjects.push(err.to_string());
                    } else {
                        return Err(err);
                    }
                }
            }
        }

        Ok(MigrationResult::new(plan.dry_run, versions, failed_subjects))
    }
}

fn select_versions(all_versions: &[i32], selector: &VersionSelector) -> Vec<i32> {
    let mut versions = match selector {
        VersionSelector::Latest => all_versions.iter().max().copied().into_iter().collect(),
        VersionSelector::All => all_versions.to_vec(),
        VersionSelector::Explicit(list) => list
            .iter()
            .filter(|v| all_versions.contains(v))
            .copied()
            .collect(),
    };
    versions.sort_unstable();
    versions
}

async fn migrate_subject(
    source: &RegistryClient,
    target: &RegistryClient,
    subject: &str,
    plan: &MigrationPlan,
) -> ServiceResult<Vec<MigrationVersionEntry>> {
    let available = source
        .get_subject_versions(subject, &plan.source.context)
        .await
        .map_err(ServiceError::Client)?;
    let versions = select_versions(&available, &plan.version_selector);

    let mut entries = Vec::with_capacity(versions.len());
    // Versions are applied strictly in ascending order within a subject
    // (spec §5); `select_versions` already sorts ascending and this loop
    // is intentionally serial.
    for version in versions {
        let source_schema = source
            .get_schema(subject, &version.to_string(), &plan.source.context)
            .await
            .map_err(ServiceError::Client)?;

        let existing = target
            .get_schema(subject, &version.to_string(), &plan.target.context)
            .await;

        let entry = match existing {
            Ok(existing) if existing.schema == source_schema.schema => MigrationVersionEntry {
                subject: subject.to_string(),
                source_version: version,
                source_id: source_schema.id,
                target_id: Some(existing.id),
                status: MigrationStatus::SkippedIdempotent,
                detail: None,
            },
            Ok(existing) => {
                if plan.on_conflict == ConflictPolicy::Overwrite && !plan.dry_run {
                    register_version(target, subject, &source_schema, plan).await?
                } else {
                    MigrationVersionEntry {
                        subject: subject.to_string(),
                        source_version: version,
                        source_id: source_schema.id,
                        target_id: Some(existing.id),
                        status: MigrationStatus::Conflict,
                        detail: Some("target has a different schema at this version".to_string()),
                    }
                }
            }
            Err(ClientError::SubjectNotFound(_)) => {
                if plan.dry_run {
                    MigrationVersionEntry {
                        subject: subject.to_string(),
                        source_version: version,
                        source_id: source_schema.id,
                        target_id: None,
                        status: MigrationStatus::Migrated,
                        detail: Some("dry run: would register".to_string()),
                    }
                } else {
                    register_version(target, subject, &source_schema, plan).await?
                }
            }
            Err(err) => return Err(ServiceError::Client(err)),
        };
        entries.push(entry);
    }

    Ok(entries)
}

async fn register_version(
    target: &RegistryClient,
    subject: &str,
    source_schema: &registry_client::FetchedSchema,
    plan: &MigrationPlan,
) -> ServiceResult<MigrationVersionEntry> {
    let id = if plan.preserve_ids {
        Some(source_schema.id)
    } else {
        None
    };
    let registered = target
        .register_schema(
            subject,
            &source_schema.schema,
            source_schema.schema_type,
            &source_schema.references,
            &plan.target.context,
            id,
        )
        .await
        .map_err(ServiceError::Client)?;

    Ok(MigrationVersionEntry {
        subject: subject.to_string(),
        source_version: source_schema.version,
        source_id: source_schema.id,
        target_id: Some(registered.id),
        status: MigrationStatus::Migrated,
        detail: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_selector_picks_the_highest_version() {
        assert_eq!(select_versions(&[1, 2, 5, 3], &VersionSelector::Latest), vec![5]);
    }

    #[test]
    fn all_selector_returns_every_version_sorted() {
        assert_eq!(select_versions(&[3, 1, 2], &VersionSelector::All), vec![1, 2, 3]);
    }

    #[test]
    fn explicit_selector_filters_to_versions_that_exist() {
        assert_eq!(
            select_versions(&[1, 2, 3], &VersionSelector::Explicit(vec![2, 9])),
            vec![2]
        );
    }
}
