//! Migration plans and per-version outcomes (spec §3 "MigrationPlan", §4.5).

use serde::{Deserialize, Serialize};

use crate::context::Context;

/// Which versions of a subject to migrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSelector {
    Latest,
    All,
    Explicit(Vec<i32>),
}

/// What to do when the target already holds a conflicting version at the
/// same version number (spec §4.5 step 3c). `Overwrite` is reserved; the
/// default and only implemented policy is `FailSubject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    FailSubject,
    Overwrite,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        ConflictPolicy::FailSubject
    }
}

/// The source or target side of a migration plan.
#[derive(Debug, Clone)]
pub struct MigrationEndpoint {
    pub registry: String,
    pub context: Context,
}

/// A fully resolved migration request (spec §3 "MigrationPlan").
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub source: MigrationEndpoint,
    pub target: MigrationEndpoint,
    /// `None` means "all subjects in the source context".
    pub subjects: Option<Vec<String>>,
    pub version_selector: VersionSelector,
    pub preserve_ids: bool,
    pub dry_run: bool,
    pub on_conflict: ConflictPolicy,
    pub continue_on_subject_failure: bool,
    pub generate_bundle: bool,
}

/// The classification of a single (subject, version) migration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationStatus {
    Migrated,
    SkippedIdempotent,
    Conflict,
    Failed,
}

/// A single per-version line item in a migration result (spec §4.5 step 3e,
/// §8 scenarios S3/S4).
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MigrationVersionEntry {
    pub subject: String,
    pub source_version: i32,
    pub source_id: i64,
    pub target_id: Option<i64>,
    pub status: MigrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The aggregate result of running (or dry-running) a [`MigrationPlan`]
/// (spec §8 scenarios S3/S4).
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MigrationResult {
    pub dry_run: bool,
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub versions: Vec<MigrationVersionEntry>,
    pub failed_subjects: Vec<String>,
}

impl MigrationResult {
    /// Tallies `migrated`/`skipped`/`failed` from `versions` so every
    /// caller gets the same counts the per-entry statuses imply.
    pub fn new(dry_run: bool, versions: Vec<MigrationVersionEntry>, failed_subjects: Vec<String>) -> Self {
        let migrated = versions.iter().filter(|e| e.status == MigrationStatus::Migrated).count();
        let skipped = versions.iter().filter(|e| e.status == MigrationStatus::SkippedIdempotent).count();
        let failed = versions
            .iter()
            .filter(|e| matches!(e.status, MigrationStatus::Conflict | MigrationStatus::Failed))
            .count();
        MigrationResult {
            dry_run,
            migrated,
            skipped,
            failed,
            versions,
            failed_subjects,
        }
    }

    /// True when every entry in the plan is `SKIPPED_IDEMPOTENT` — the
    /// correctness property a completed migration must satisfy when re-run
    /// (spec §4.5 "Idempotence", §8).
    pub fn is_fully_idempotent(&self) -> bool {
        !self.versions.is_empty()
            && self
                .versions
                .iter()
                .all(|e| e.status == MigrationStatus::SkippedIdempotent)
    }
}

/// The three-file artifact returned for bulk context migration instead of
/// executing it directly (spec §4.5 part B).
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MigrationBundle {
    pub dotenv: String,
    pub docker_compose_yml: String,
    pub migrate_context_sh: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: MigrationStatus) -> MigrationVersionEntry {
        MigrationVersionEntry {
            subject: "orders-value".into(),
            source_version: 1,
            source_id: 10,
            target_id: Some(10),
            status,
            detail: None,
        }
    }

    #[test]
    fn fully_idempotent_requires_every_entry_skipped() {
        let all_skipped = MigrationResult::new(false, vec![entry(MigrationStatus::SkippedIdempotent); 3], vec![]);
        assert!(all_skipped.is_fully_idempotent());

        let mixed = MigrationResult::new(
            false,
            vec![entry(MigrationStatus::SkippedIdempotent), entry(MigrationStatus::Migrated)],
            vec![],
        );
        assert!(!mixed.is_fully_idempotent());
    }

    #[test]
    fn empty_result_is_not_considered_idempotent() {
        let empty = MigrationResult::new(false, vec![], vec![]);
        assert!(!empty.is_fully_idempotent());
    }

    #[test]
    fn counts_are_tallied_from_entry_statuses() {
        let result = MigrationResult::new(
            false,
            vec![
                entry(MigrationStatus::Migrated),
                entry(MigrationStatus::SkippedIdempotent),
                entry(MigrationStatus::Conflict),
            ],
            vec![],
        );
        assert_eq!(result.migrated, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.failed, 1);
    }

    #[test]
    fn conflict_policy_defaults_to_fail_subject() {
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::FailSubject);
    }
}
