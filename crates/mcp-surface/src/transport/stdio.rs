//! The stdio transport: one client, wired directly to stdin/stdout, no
//! HTTP stack involved (spec §6 `MCP_TRANSPORT=stdio`, the default).

use rmcp::transport::io::stdio;
use rmcp::ServiceExt;

use crate::server_handler::RegistryServerHandler;

/// Serves `handler` over stdio until the client disconnects. Blocks the
/// calling task; the caller is expected to run this inside
/// `tokio::select!` against a shutdown signal (spec §6 "Graceful
/// shutdown").
pub async fn serve(handler: RegistryServerHandler) -> anyhow::Result<()> {
    let transport = stdio();
    let service = handler.serve(transport).await?;
    service.waiting().await?;
    Ok(())
}
