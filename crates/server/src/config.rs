//! Typed server configuration, parsed from CLI flags with environment
//! variables as the fallback (spec §6 "Configuration").

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    Stdio,
    Sse,
}

/// CLI surface mirroring spec §6's environment variables one for one;
/// `clap`'s `env` feature falls back to the named variable whenever the
/// flag is omitted.
#[derive(Debug, Parser)]
#[command(name = "schema-registry-mcp", about = "MCP control plane for Confluent-style Schema Registries")]
pub struct ServerConfig {
    #[arg(long, env = "MCP_TRANSPORT", value_enum, default_value = "stdio")]
    pub transport: TransportKind,

    #[arg(long, env = "MCP_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "MCP_PORT", default_value_t = 8765)]
    pub port: u16,

    #[arg(long, env = "MCP_PATH", default_value = "/mcp")]
    pub path: String,

    #[arg(long, env = "SLIM_MODE", default_value_t = false)]
    pub slim_mode: bool,

    #[arg(long, env = "ENABLE_MIGRATION", default_value_t = true)]
    pub enable_migration: bool,

    #[arg(long, env = "ENABLE_AUTH", default_value_t = false)]
    pub enable_auth: bool,

    #[arg(long, env = "ENABLE_SMART_DEFAULTS", default_value_t = true)]
    pub enable_smart_defaults: bool,

    /// Documented here for `--help` discoverability; `RegistryManager::from_env`
    /// reads `ALLOW_LOCALHOST` itself rather than taking this as a parameter,
    /// so the env var is what actually matters, not the flag.
    #[arg(long, env = "ALLOW_LOCALHOST", default_value_t = false)]
    pub allow_localhost: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit `tracing-subscriber`'s JSON formatter instead of the
    /// human-readable one; operators typically flip this on in
    /// production alongside `LOG_LEVEL=info`.
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl ServerConfig {
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        ServerConfig::parse()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_defaults() {
        let cfg = ServerConfig::parse_from(["schema-registry-mcp"]);
        assert_eq!(cfg.transport, TransportKind::Stdio);
        assert!(!cfg.slim_mode);
        assert!(cfg.enable_migration);
        assert!(!cfg.enable_auth);
    }
}
