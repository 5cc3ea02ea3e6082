//! Batch deletion operations (spec §4.7 "Batch Operations (C7)").
//!
//! `dry_run` defaults to `true` at the type level (see [`BatchRequest`]) so
//! that forgetting to pass it can never trigger a deletion — the hard
//! invariant the spec calls out explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use registry_client::RegistryClient;
use registry_core::Context;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Default bounded concurrency for per-subject deletes within one context
/// (spec §4.7, §5).
const DEFAULT_DELETE_CONCURRENCY: usize = 10;

/// `dry_run` defaults to `true`; callers must explicitly opt into real
/// deletion by setting it to `false` (spec §4.7 "hard invariant").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DryRun(bool);

impl Default for DryRun {
    fn default() -> Self {
        DryRun(true)
    }
}

impl DryRun {
    pub fn explicit(value: bool) -> Self {
        DryRun(value)
    }

    pub fn is_dry_run(self) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub dry_run: bool,
}

#[instrument(skip(registry))]
pub async fn clear_context_batch(
    registry: &RegistryClient,
    context: &Context,
    dry_run: DryRun,
) -> Result<BatchOutcome, registry_client::ClientError> {
    let subjects = registry.list_subjects(context).await?;

    if dry_run.is_dry_run() {
        return Ok(BatchOutcome {
            attempted: subjects.len(),
            succeeded: 0,
            failed: 0,
            errors: Vec::new(),
            dry_run: true,
        });
    }

    let results: Vec<Result<(), String>> = stream::iter(subjects.iter().cloned())
        .map(|subject| {
            let registry = registry.clone();
            let context = context.clone();
            async move {
                registry
                    .delete_subject(&subject, &context, false)
                    .await
                    .map(|_| ())
                    .map_err(|e| format!("{subject}: {e}"))
            }
        })
        .buffer_unordered(DEFAULT_DELETE_CONCURRENCY)
        .collect()
        .await;

    let errors: Vec<String> = results.iter().filter_map(|r| r.as_ref().err().cloned()).collect();
    let succeeded = results.len() - errors.len();

    Ok(BatchOutcome {
        attempted: subjects.len(),
        succeeded,
        failed: errors.len(),
        errors,
        dry_run: false,
    })
}

#[instrument(skip(registry))]
pub async fn clear_multiple_contexts_batch(
    registry: &RegistryClient,
    contexts: &[Context],
    dry_run: DryRun,
) -> Result<BatchOutcome, registry_client::ClientError> {
    let mut total = BatchOutcome {
        attempted: 0,
        succeeded: 0,
        failed: 0,
        errors: Vec::new(),
        dry_run: dry_run.is_dry_run(),
    };
    for context in contexts {
        let outcome = clear_context_batch(registry, context, dry_run).await?;
        total.attempted += outcome.attempted;
        total.succeeded += outcome.succeeded;
        total.failed += outcome.failed;
        total.errors.extend(outcome.errors);
    }
    Ok(total)
}

/// Per-registry rollup for `clear_context_across_registries_batch` (spec
/// §4.7). Blocks execution entirely on any view-only target registry.
#[instrument(skip(registries))]
pub async fn clear_context_across_registries_batch(
    registries: &HashMap<String, Arc<RegistryClient>>,
    context: &Context,
    dry_run: DryRun,
) -> Result<HashMap<String, BatchOutcome>, registry_client::ClientError> {
    if !dry_run.is_dry_run() && registries.values().any(|c| c.is_viewonly()) {
        return Err(registry_client::ClientError::RegistryViewonly);
    }

    let mut rollup = HashMap::with_capacity(registries.len());
    for (name, client) in registries {
        let outcome = clear_context_batch(client, context, dry_run).await?;
        rollup.insert(name.clone(), outcome);
    }
    Ok(rollup)
}
