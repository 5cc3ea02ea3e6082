//! The `schema-registry-mcp` binary: loads configuration, builds every
//! control-plane component, and serves the MCP surface over whichever
//! transport was selected (spec §6 "External Interfaces").

mod config;

use std::sync::Arc;

use mcp_surface::{build_tool_table, NoAuthValidator, RegistryServerHandler, StaticScopeValidator, TokenValidator, ToolContext};
use registry_service::elicitation::{ElicitationStore, SmartDefaultsStore};
use registry_service::{MigrationEngine, RegistryManager, SyncScheduler, TaskEngine};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{ServerConfig, TransportKind};

/// Configuration error (exit code 2) and port-in-use (exit code 3) are
/// distinguished so `main` can report the exact code spec §6 specifies;
/// any other failure is a runtime crash and exits non-zero via `anyhow`.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] registry_service::ServiceError),

    #[error("failed to bind {0}: {1}")]
    PortInUse(String, std::io::Error),
}

fn init_tracing(cfg: &ServerConfig) {
    let filter = EnvFilter::try_new(&cfg.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn build_validator(cfg: &ServerConfig) -> Arc<dyn TokenValidator> {
    if cfg.enable_auth {
        // JWT/OAuth verification is an external collaborator (spec §1,
        // §4.4); operators front this process with their own
        // token-introspection sidecar and grant scopes through their own
        // `TokenValidator` impl. This default denies everything until one
        // is wired in, which is the safe failure mode for `ENABLE_AUTH=true`.
        Arc::new(StaticScopeValidator::new())
    } else {
        Arc::new(NoAuthValidator)
    }
}

async fn run(cfg: ServerConfig) -> Result<(), StartupError> {
    let manager = Arc::new(RegistryManager::from_env()?);
    info!(registries = manager.names().len(), multi = manager.is_multi(), "registry manager ready");

    let task_engine = Arc::new(TaskEngine::new());
    let migration_engine = Arc::new(MigrationEngine::new(manager.clone()));
    let sync_scheduler = Arc::new(SyncScheduler::new(manager.clone()));
    let elicitation = Arc::new(ElicitationStore::new());
    let smart_defaults = Arc::new(SmartDefaultsStore::new(cfg.enable_smart_defaults));

    let ctx = Arc::new(ToolContext {
        manager,
        task_engine,
        migration_engine,
        sync_scheduler,
        elicitation,
        smart_defaults,
        enable_migration: cfg.enable_migration,
    });

    let validator = build_validator(&cfg);
    let handler = RegistryServerHandler::new(build_tool_table(), ctx, validator, cfg.slim_mode);

    let shutdown = tokio_util::sync::CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown_signal.cancel();
    });

    match cfg.transport {
        TransportKind::Stdio => {
            info!("serving MCP over stdio");
            tokio::select! {
                result = mcp_surface::transport::stdio::serve(handler) => {
                    if let Err(e) = result {
                        error!(error = %e, "stdio transport ended with an error");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("stdio transport shutting down");
                }
            }
        }
        TransportKind::Sse => {
            let app = mcp_surface::transport::sse::router(handler);
            let addr = cfg.bind_addr();
            info!(%addr, path = %cfg.path, "serving MCP over SSE");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| StartupError::PortInUse(addr, e))?;
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .map_err(|e| StartupError::PortInUse(cfg.bind_addr(), std::io::Error::other(e)))?;
        }
    }

    Ok(())
}

fn main() {
    let cfg = ServerConfig::load();
    init_tracing(&cfg);

    let runtime = tokio::runtime::Runtime::new().expect("failed to start the tokio runtime");
    let exit_code = match runtime.block_on(run(cfg)) {
        Ok(()) => 0,
        Err(StartupError::Config(e)) => {
            error!(error = %e, "configuration error");
            2
        }
        Err(e @ StartupError::PortInUse(..)) => {
            error!(error = %e, "port already in use");
            3
        }
    };
    std::process::exit(exit_code);
}
