//! Cross-registry comparison and drift types (spec §3 "ComparisonResult", §4.6).

use serde::{Deserialize, Serialize};

/// The default cap on how many subject names are returned per relation
/// bucket in a [`ComparisonResult`] (spec §4.6).
pub const DEFAULT_SAMPLE_CAP: usize = 100;

/// The default bounded concurrency for fan-out reads during comparison and
/// statistics gathering (spec §4.6, §5).
pub const DEFAULT_COMPARE_CONCURRENCY: usize = 16;

/// How a single subject relates between a source and a target registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    OnlyInSource,
    OnlyInTarget,
    Identical,
    DiffersLatest,
    DiffersHistory,
}

/// A capped sample of subject names classified under one [`Relation`].
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RelationBucket {
    pub relation: Relation,
    pub count: usize,
    /// Truncated to [`DEFAULT_SAMPLE_CAP`] entries; `count` may exceed
    /// `sample.len()`.
    pub sample: Vec<String>,
}

impl RelationBucket {
    pub fn new(relation: Relation, mut subjects: Vec<String>, cap: usize) -> Self {
        let count = subjects.len();
        subjects.truncate(cap);
        RelationBucket {
            relation,
            count,
            sample: subjects,
        }
    }
}

/// The result of comparing two registries or two contexts (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ComparisonResult {
    pub source_registry: String,
    pub target_registry: String,
    pub buckets: Vec<RelationBucket>,
    /// Set when one or more registries timed out or were unreachable
    /// during the fan-out; the result reflects only the registries that
    /// responded (spec §4.6 "propagate REGISTRY_UNREACHABLE ... as
    /// partial results").
    pub partial: bool,
}

/// Per-version classification returned by `diff_schema` (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SchemaDiff {
    pub subject: String,
    pub source_only_versions: Vec<i32>,
    pub target_only_versions: Vec<i32>,
    pub differing_versions: Vec<i32>,
    /// A textual diff of the latest version on each side, when both exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_diff: Option<String>,
}

/// Aggregate statistics for a single registry (spec §4.6
/// `get_registry_statistics`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RegistryStatistics {
    pub subject_count: usize,
    pub version_count: usize,
    pub context_count: usize,
    pub average_versions_per_subject: f64,
}

impl RegistryStatistics {
    pub fn compute(subject_count: usize, version_count: usize, context_count: usize) -> Self {
        let average_versions_per_subject = if subject_count == 0 {
            0.0
        } else {
            version_count as f64 / subject_count as f64
        };
        RegistryStatistics {
            subject_count,
            version_count,
            context_count,
            average_versions_per_subject,
        }
    }
}

/// One subject's presence/divergence across a set of registries (spec §4.6
/// `schema_drift`).
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DriftEntry {
    pub subject: String,
    pub present_in: Vec<String>,
    pub missing_from: Vec<String>,
    /// True when the subject's latest version differs across the
    /// registries it is present in.
    pub diverges: bool,
}
