//! Context-bundle emission (spec §4.5 part B, §6 "Migration bundle format").
//!
//! Bulk context migration with ID preservation is delegated to an external,
//! resumable migrator tool; this module only renders the three artifacts
//! the operator is expected to write to disk and run.

use registry_core::{Context, MigrationBundle};

/// Default migrator image referenced by the emitted `docker-compose.yml`
/// (spec §6: "image reference is configurable, with a documented
/// default").
pub const DEFAULT_MIGRATOR_IMAGE: &str = "confluentinc/cp-schema-registry-migrator:latest";

pub struct BundleRequest<'a> {
    pub source_url: &'a str,
    pub source_user: Option<&'a str>,
    pub source_password: Option<&'a str>,
    pub source_context: &'a Context,
    pub target_url: &'a str,
    pub target_user: Option<&'a str>,
    pub target_password: Option<&'a str>,
    pub target_context: &'a Context,
    pub preserve_ids: bool,
    pub dry_run: bool,
    pub migrator_image: Option<&'a str>,
}

pub fn render(req: &BundleRequest) -> MigrationBundle {
    MigrationBundle {
        dotenv: render_dotenv(req),
        docker_compose_yml: render_compose(req),
        migrate_context_sh: render_script(),
    }
}

fn render_dotenv(req: &BundleRequest) -> String {
    let mut lines = vec![
        format!("SOURCE_SCHEMA_REGISTRY_URL={}", req.source_url),
        format!("DEST_SCHEMA_REGISTRY_URL={}", req.target_url),
    ];
    if let Some(user) = req.source_user {
        lines.push(format!("SOURCE_SCHEMA_REGISTRY_USER={user}"));
    }
    if let Some(password) = req.source_password {
        lines.push(format!("SOURCE_SCHEMA_REGISTRY_PASSWORD={password}"));
    }
    if let Some(user) = req.target_user {
        lines.push(format!("DEST_SCHEMA_REGISTRY_USER={user}"));
    }
    if let Some(password) = req.target_password {
        lines.push(format!("DEST_SCHEMA_REGISTRY_PASSWORD={password}"));
    }
    lines.push(format!("SOURCE_CONTEXT={}", req.source_context));
    lines.push(format!("DEST_CONTEXT={}", req.target_context));
    lines.push(format!("PRESERVE_IDS={}", req.preserve_ids));
    lines.push(format!("DRY_RUN={}", req.dry_run));
    lines.join("\n") + "\n"
}

fn render_compose(req: &BundleRequest) -> String {
    let image = req.migrator_image.unwrap_or(DEFAULT_MIGRATOR_IMAGE);
    format!(
        "services:\n  migrator:\n    image: {image}\n    env_file:\n      - .env\n    restart: \"no\"\n"
    )
}

fn render_script() -> String {
    "#!/usr/bin/env bash\nset -euo pipefail\ndocker compose up --abort-on-container-exit || exit $?\n".to_string()
}
