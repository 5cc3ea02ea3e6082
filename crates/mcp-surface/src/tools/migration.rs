//! Migration tools, fronting the Migration Engine and bundle renderer
//! (spec §4.5, §4.8).

use std::sync::Arc;

use async_trait::async_trait;
use registry_core::{
    ConflictPolicy, Context, MigrationBundle, MigrationEndpoint, MigrationPlan, Scope,
    VersionSelector,
};
use registry_service::elicitation::{ContinuationToken, ElicitationSession};
use registry_service::migration::bundle::{self, BundleRequest};
use registry_service::task_engine::{ProgressReporter, TaskWork};
use registry_service::{MigrationEngine, ServiceResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{McpError, McpResult};
use crate::schemas::schema_for;
use crate::tool_table::{ToolContext, ToolHandler};

/// A JSON-Schema-friendly mirror of [`VersionSelector`]; the core type's
/// third variant carries a payload that needs a field name at the wire
/// boundary.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum VersionSelectorInput {
    Latest,
    All,
    Explicit { versions: Vec<i32> },
}

impl From<VersionSelectorInput> for VersionSelector {
    fn from(value: VersionSelectorInput) -> Self {
        match value {
            VersionSelectorInput::Latest => VersionSelector::Latest,
            VersionSelectorInput::All => VersionSelector::All,
            VersionSelectorInput::Explicit { versions } => VersionSelector::Explicit(versions),
        }
    }
}

fn default_version_selector() -> VersionSelectorInput {
    VersionSelectorInput::Latest
}

fn default_true() -> bool {
    true
}

/// A JSON-Schema-friendly mirror of [`ConflictPolicy`].
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum ConflictPolicyInput {
    FailSubject,
    Overwrite,
}

impl From<ConflictPolicyInput> for ConflictPolicy {
    fn from(value: ConflictPolicyInput) -> Self {
        match value {
            ConflictPolicyInput::FailSubject => ConflictPolicy::FailSubject,
            ConflictPolicyInput::Overwrite => ConflictPolicy::Overwrite,
        }
    }
}

impl ConflictPolicyInput {
    fn label(self) -> &'static str {
        match self {
            ConflictPolicyInput::FailSubject => "fail_subject",
            ConflictPolicyInput::Overwrite => "overwrite",
        }
    }
}

fn parse_continuation_token(raw: &str) -> McpResult<ContinuationToken> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| McpError::InvalidArgument(format!("invalid continuation token: {raw}")))
}

/// Overlays `overlay`'s object keys onto `base`'s. Used to merge a resumed
/// elicitation session's accumulated input with the caller's answer.
fn merge_json(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            base.extend(overlay);
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct MigrateContextInput {
    source_registry: String,
    #[serde(default)]
    source_context: Option<String>,
    target_registry: String,
    #[serde(default)]
    target_context: Option<String>,
    /// `None` migrates every subject in the source context.
    #[serde(default)]
    subjects: Option<Vec<String>>,
    #[serde(default = "default_version_selector")]
    version_selector: VersionSelectorInput,
    #[serde(default)]
    preserve_ids: bool,
    /// Defaults to `true`: callers must explicitly set this to `false` to
    /// perform a real migration (spec §4.5 "Dry-run").
    #[serde(default = "default_true")]
    dry_run: bool,
    #[serde(default)]
    continue_on_subject_failure: bool,
    /// Emit a bundle instead of migrating directly; forced on regardless
    /// of this flag when the process was started with
    /// `ENABLE_MIGRATION=false` (spec §4.5 part B).
    #[serde(default)]
    generate_bundle: bool,
    #[serde(default)]
    source_user: Option<String>,
    #[serde(default)]
    source_password: Option<String>,
    #[serde(default)]
    target_user: Option<String>,
    #[serde(default)]
    target_password: Option<String>,
    #[serde(default)]
    migrator_image: Option<String>,
    /// Required before a real (non-dry-run) migration proceeds; omitting it
    /// raises an elicitation instead of silently picking a policy (spec
    /// §4.9, this tool is one of the named eliciting tools).
    #[serde(default)]
    on_conflict: Option<ConflictPolicyInput>,
    /// Carries a prior call's `continuation_token` to resume an elicited
    /// invocation with the missing answer merged in.
    #[serde(default)]
    continuation_token: Option<String>,
}

/// Returned in place of [`MigrateContextOutput`] when the call is missing
/// information the tool needs before it can run for real (spec §4.9).
#[derive(Debug, Serialize, JsonSchema)]
struct ElicitationRequired {
    elicitation_required: bool,
    continuation_token: String,
    next_question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggested_default: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct MigrateContextOutput {
    /// Present when the migration was submitted to the task engine; poll
    /// with `get_task_status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
    /// Present when a bundle was emitted instead of running directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    bundle: Option<MigrationBundle>,
}

struct MigrationWork {
    engine: Arc<MigrationEngine>,
    plan: MigrationPlan,
}

#[async_trait]
impl TaskWork for MigrationWork {
    async fn run(
        self: Box<Self>,
        _progress: ProgressReporter,
        _cancellation: CancellationToken,
    ) -> ServiceResult<serde_json::Value> {
        let result = self.engine.execute(self.plan).await?;
        Ok(serde_json::to_value(result).unwrap())
    }
}

pub struct MigrateContext;

#[async_trait]
impl ToolHandler for MigrateContext {
    fn name(&self) -> &'static str {
        "migrate_context"
    }

    fn description(&self) -> &'static str {
        "Migrate subjects from one registry/context to another, version by version. Defaults to a dry run and emits a bundle instead of executing when migration is disabled for this process. A real run invoked without on_conflict raises an elicitation asking for one."
    }

    fn required_scope(&self) -> Scope {
        Scope::Admin
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<MigrateContextInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<MigrateContextOutput>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let effective = match input.get("continuation_token").and_then(Value::as_str).map(str::to_string) {
            Some(raw_token) => {
                let token = parse_continuation_token(&raw_token)?;
                let session = ctx.elicitation.resume(token).ok_or_else(|| {
                    McpError::InvalidArgument("continuation token expired or unknown".to_string())
                })?;
                ctx.elicitation.complete(token);
                merge_json(session.accumulated, input)
            }
            None => input,
        };

        let input: MigrateContextInput =
            serde_json::from_value(effective.clone()).map_err(|e| McpError::InvalidArgument(e.to_string()))?;

        let source_client = ctx.manager.get(&input.source_registry)?;
        let target_client = ctx.manager.get(&input.target_registry)?;
        let source_context = Context::from_opt(input.source_context.as_deref());
        let target_context = Context::from_opt(input.target_context.as_deref());

        if !ctx.enable_migration || input.generate_bundle {
            let request = BundleRequest {
                source_url: source_client.base_url(),
                source_user: input.source_user.as_deref(),
                source_password: input.source_password.as_deref(),
                source_context: &source_context,
                target_url: target_client.base_url(),
                target_user: input.target_user.as_deref(),
                target_password: input.target_password.as_deref(),
                target_context: &target_context,
                preserve_ids: input.preserve_ids,
                dry_run: input.dry_run,
                migrator_image: input.migrator_image.as_deref(),
            };
            return Ok(serde_json::to_value(MigrateContextOutput {
                task_id: None,
                bundle: Some(bundle::render(&request)),
            })
            .unwrap());
        }

        if !input.dry_run && input.on_conflict.is_none() {
            let mut accumulated = effective;
            if let Value::Object(map) = &mut accumulated {
                map.remove("continuation_token");
            }
            let suggested_default = ctx.smart_defaults.suggest("migrate_context", "on_conflict");
            let next_question = "dry_run=false needs an explicit on_conflict (\"fail_subject\" or \"overwrite\") \
                for versions where the target already holds a different schema at the same version. \
                Re-invoke with continuation_token set to the token below and on_conflict filled in."
                .to_string();
            let token = ctx.elicitation.begin(ElicitationSession {
                tool_name: "migrate_context".to_string(),
                accumulated,
                next_question: next_question.clone(),
            });
            return Ok(serde_json::to_value(ElicitationRequired {
                elicitation_required: true,
                continuation_token: token.to_string(),
                next_question,
                suggested_default,
            })
            .unwrap());
        }

        if let Some(policy) = input.on_conflict {
            ctx.smart_defaults.record("migrate_context", "on_conflict", policy.label());
        }

        let plan = MigrationPlan {
            source: MigrationEndpoint {
                registry: input.source_registry,
                context: source_context,
            },
            target: MigrationEndpoint {
                registry: input.target_registry,
                context: target_context,
            },
            subjects: input.subjects,
            version_selector: input.version_selector.into(),
            preserve_ids: input.preserve_ids,
            dry_run: input.dry_run,
            on_conflict: input.on_conflict.map(Into::into).unwrap_or_default(),
            continue_on_subject_failure: input.continue_on_subject_failure,
            generate_bundle: false,
        };

        let task_id = ctx.task_engine.submit(
            registry_core::TaskType::Migration,
            Box::new(MigrationWork {
                engine: ctx.migration_engine.clone(),
                plan,
            }),
        );
        Ok(serde_json::to_value(MigrateContextOutput {
            task_id: Some(task_id.to_string()),
            bundle: None,
        })
        .unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GetMigrationBundleInput {
    source_registry: String,
    #[serde(default)]
    source_context: Option<String>,
    target_registry: String,
    #[serde(default)]
    target_context: Option<String>,
    #[serde(default)]
    preserve_ids: bool,
    #[serde(default = "default_true")]
    dry_run: bool,
    #[serde(default)]
    source_user: Option<String>,
    #[serde(default)]
    source_password: Option<String>,
    #[serde(default)]
    target_user: Option<String>,
    #[serde(default)]
    target_password: Option<String>,
    #[serde(default)]
    migrator_image: Option<String>,
}

pub struct GetMigrationBundle;

#[async_trait]
impl ToolHandler for GetMigrationBundle {
    fn name(&self) -> &'static str {
        "get_migration_bundle"
    }

    fn description(&self) -> &'static str {
        "Render the .env, docker-compose.yml, and run script for the external bulk context migrator, without performing any migration."
    }

    fn required_scope(&self) -> Scope {
        Scope::Admin
    }

    fn slim_mode_visible(&self) -> bool {
        false
    }

    fn input_schema(&self) -> Value {
        schema_for::<GetMigrationBundleInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<MigrationBundle>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: GetMigrationBundleInput =
            serde_json::from_value(input).map_err(|e| McpError::InvalidArgument(e.to_string()))?;
        let source_client = ctx.manager.get(&input.source_registry)?;
        let target_client = ctx.manager.get(&input.target_registry)?;
        let source_context = Context::from_opt(input.source_context.as_deref());
        let target_context = Context::from_opt(input.target_context.as_deref());

        let request = BundleRequest {
            source_url: source_client.base_url(),
            source_user: input.source_user.as_deref(),
            source_password: input.source_password.as_deref(),
            source_context: &source_context,
            target_url: target_client.base_url(),
            target_user: input.target_user.as_deref(),
            target_password: input.target_password.as_deref(),
            target_context: &target_context,
            preserve_ids: input.preserve_ids,
            dry_run: input.dry_run,
            migrator_image: input.migrator_image.as_deref(),
        };
        Ok(serde_json::to_value(bundle::render(&request)).unwrap())
    }
}
