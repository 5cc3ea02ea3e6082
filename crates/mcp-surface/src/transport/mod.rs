//! The two wire transports the spec's §6 `MCP_TRANSPORT` switch selects
//! between: `stdio` (the `rmcp` default, one client per process) and a
//! hand-rolled `axum` SSE route for clients that want HTTP (spec §4.8).

pub mod sse;
pub mod stdio;
