//! Cross-registry comparison and statistics (spec §4.6 "Comparison &
//! Statistics (C6)").

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use registry_client::RegistryClient;
use registry_core::{
    Context, ComparisonResult, DriftEntry, Relation, RelationBucket, RegistryStatistics,
    SchemaDiff, DEFAULT_COMPARE_CONCURRENCY, DEFAULT_SAMPLE_CAP,
};
use tracing::{instrument, warn};

use crate::error::ServiceResult;

/// Threshold above which `get_registry_statistics` runs as a background
/// task instead of synchronously (spec §4.6).
pub const STATISTICS_TASK_THRESHOLD: usize = 1_000;

#[instrument(skip(source, target))]
pub async fn compare_registries(
    source: &RegistryClient,
    target: &RegistryClient,
    context: &Context,
) -> ComparisonResult {
    let (source_subjects, source_ok) = match source.list_subjects(context).await {
        Ok(list) => (list.into_iter().collect::<HashSet<_>>(), true),
        Err(e) => {
            warn!(error = %e, "source unreachable during compare");
            (HashSet::new(), false)
        }
    };
    let (target_subjects, target_ok) = match target.list_subjects(context).await {
        Ok(list) => (list.into_iter().collect::<HashSet<_>>(), true),
        Err(e) => {
            warn!(error = %e, "target unreachable during compare");
            (HashSet::new(), false)
        }
    };

    let only_in_source: Vec<String> = source_subjects.difference(&target_subjects).cloned().collect();
    let only_in_target: Vec<String> = target_subjects.difference(&source_subjects).cloned().collect();
    let common: Vec<String> = source_subjects.intersection(&target_subjects).cloned().collect();

    let classified: Vec<(String, Relation)> = stream::iter(common)
        .map(|subject| {
            let source = source.clone();
            let target = target.clone();
            let context = context.clone();
            async move {
                let relation = classify_subject(&source, &target, &subject, &context).await;
                (subject, relation)
            }
        })
        .buffer_unordered(DEFAULT_COMPARE_CONCURRENCY)
        .collect()
        .await;

    let mut identical = Vec::new();
    let mut differs_latest = Vec::new();
    for (subject, relation) in classified {
        match relation {
            Relation::Identical => identical.push(subject),
            Relation::DiffersLatest => differs_latest.push(subject),
            _ => {}
        }
    }

    ComparisonResult {
        source_registry: source.name().to_string(),
        target_registry: target.name().to_string(),
        buckets: vec![
            RelationBucket::new(Relation::OnlyInSource, only_in_source, DEFAULT_SAMPLE_CAP),
            RelationBucket::new(Relation::OnlyInTarget, only_in_target, DEFAULT_SAMPLE_CAP),
            RelationBucket::new(Relation::Identical, identical, DEFAULT_SAMPLE_CAP),
            RelationBucket::new(Relation::DiffersLatest, differs_latest, DEFAULT_SAMPLE_CAP),
        ],
        partial: !(source_ok && target_ok),
    }
}

async fn classify_subject(
    source: &RegistryClient,
    target: &RegistryClient,
    subject: &str,
    context: &Context,
) -> Relation {
    match (
        source.get_schema(subject, "latest", context).await,
        target.get_schema(subject, "latest", context).await,
    ) {
        (Ok(a), Ok(b)) if a.schema == b.schema => Relation::Identical,
        (Ok(_), Ok(_)) => Relation::DiffersLatest,
        _ => Relation::DiffersHistory,
    }
}

#[instrument(skip(source, target))]
pub async fn diff_schema(
    source: &RegistryClient,
    target: &RegistryClient,
    subject: &str,
    context: &Context,
) -> ServiceResult<SchemaDiff> {
    let source_versions: HashSet<i32> = source
        .get_subject_versions(subject, context)
        .await
        .map(|v| v.into_iter().collect())
        .unwrap_or_default();
    let target_versions: HashSet<i32> = target
        .get_subject_versions(subject, context)
        .await
        .map(|v| v.into_iter().collect())
        .unwrap_or_default();

    let mut source_only: Vec<i32> = source_versions.difference(&target_versions).copied().collect();
    let mut target_only: Vec<i32> = target_versions.difference(&source_versions).copied().collect();
    source_only.sort_unstable();
    target_only.sort_unstable();

    let mut differing = Vec::new();
    for version in source_versions.intersection(&target_versions) {
        let a = source.get_schema(subject, &version.to_string(), context).await;
        let b = target.get_schema(subject, &version.to_string(), context).await;
        if let (Ok(a), Ok(b)) = (a, b) {
            if a.schema != b.schema {
                differing.push(*version);
            }
        }
    }
    differing.sort_unstable();

    let latest_diff = match (
        source.get_schema(subject, "latest", context).await,
        target.get_schema(subject, "latest", context).await,
    ) {
        (Ok(a), Ok(b)) if a.schema != b.schema => Some(format!("- {}\n+ {}", a.schema, b.schema)),
        _ => None,
    };

    Ok(SchemaDiff {
        subject: subject.to_string(),
        source_only_versions: source_only,
        target_only_versions: target_only,
        differing_versions: differing,
        latest_diff,
    })
}

#[instrument(skip(registry))]
pub async fn get_registry_statistics(registry: &RegistryClient) -> ServiceResult<RegistryStatistics> {
    let subjects = registry
        .list_subjects(&Context::default_context())
        .await
        .map_err(crate::error::ServiceError::Client)?;

    let per_subject: Vec<usize> = stream::iter(subjects.iter().cloned())
        .map(|subject| {
            let registry = registry.clone();
            async move {
                registry
                    .get_subject_versions(&subject, &Context::default_context())
                    .await
                    .map(|v| v.len())
                    .unwrap_or(0)
            }
        })
        .buffer_unordered(DEFAULT_COMPARE_CONCURRENCY)
        .collect()
        .await;

    let version_count: usize = per_subject.iter().sum();

    let context_count = match registry.list_contexts().await {
        Ok(contexts) => contexts.len() + 1,
        Err(e) => {
            warn!(error = %e, "could not list contexts, defaulting to the default context only");
            1
        }
    };

    Ok(RegistryStatistics::compute(subjects.len(), version_count, context_count))
}

#[instrument(skip(registries))]
pub async fn schema_drift(
    registries: &HashMap<String, Arc<RegistryClient>>,
    subject: &str,
    context: &Context,
) -> DriftEntry {
    let mut present_in = Vec::new();
    let mut missing_from = Vec::new();
    let mut latest_schemas = Vec::new();

    for (name, client) in registries {
        match client.get_schema(subject, "latest", context).await {
            Ok(schema) => {
                present_in.push(name.clone());
                latest_schemas.push(schema.schema);
            }
            Err(_) => missing_from.push(name.clone()),
        }
    }
    present_in.sort();
    missing_from.sort();

    let diverges = latest_schemas.windows(2).any(|w| w[0] != w[1]);

    DriftEntry {
        subject: subject.to_string(),
        present_in,
        missing_from,
        diverges,
    }
}

/// Subjects present in `source` but absent from `target` — a derived view
/// over [`compare_registries`] (spec §4.6 `find_missing_schemas`).
pub async fn find_missing_schemas(
    source: &RegistryClient,
    target: &RegistryClient,
    context: &Context,
) -> Vec<String> {
    let result = compare_registries(source, target, context).await;
    result
        .buckets
        .into_iter()
        .find(|b| b.relation == Relation::OnlyInSource)
        .map(|b| b.sample)
        .unwrap_or_default()
}

/// Subjects present in both registries with diverging latest versions — a
/// derived view over [`compare_registries`] (spec §4.6
/// `find_schema_conflicts`).
pub async fn find_schema_conflicts(
    source: &RegistryClient,
    target: &RegistryClient,
    context: &Context,
) -> Vec<String> {
    let result = compare_registries(source, target, context).await;
    result
        .buckets
        .into_iter()
        .find(|b| b.relation == Relation::DiffersLatest)
        .map(|b| b.sample)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_threshold_matches_spec_default() {
        assert_eq!(STATISTICS_TASK_THRESHOLD, 1000);
    }
}
