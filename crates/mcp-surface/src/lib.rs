//! The MCP tool and resource surface over the registry control plane
//! (spec §4.8 "Tool Registry / MCP Surface (C8)"): typed tool table,
//! scope guard, response envelope, structured-output validation, and the
//! `rmcp::ServerHandler` that stdio and SSE transports both serve.

pub mod envelope;
pub mod error;
pub mod guard;
pub mod resources;
pub mod schemas;
pub mod server_handler;
pub mod tool_table;
pub mod tools;
pub mod transport;

pub use envelope::{RegistryMode, MCP_PROTOCOL_VERSION};
pub use error::{McpError, McpResult};
pub use guard::{NoAuthValidator, StaticScopeValidator, TokenValidator};
pub use server_handler::RegistryServerHandler;
pub use tool_table::{build_tool_table, ToolContext, ToolHandler};
