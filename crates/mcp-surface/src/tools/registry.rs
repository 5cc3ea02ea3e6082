//! Registry inventory and connectivity tools, fronting the Registry
//! Manager (spec §4.2, §4.8).

use async_trait::async_trait;
use registry_core::{RegistryInfo, Scope};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::McpResult;
use crate::schemas::schema_for;
use crate::tool_table::{ToolContext, ToolHandler};

#[derive(Debug, Deserialize, JsonSchema)]
struct EmptyInput {}

#[derive(Debug, Serialize, JsonSchema)]
struct ListRegistriesOutput {
    registries: Vec<RegistryInfo>,
    is_multi: bool,
}

pub struct ListRegistries;

#[async_trait]
impl ToolHandler for ListRegistries {
    fn name(&self) -> &'static str {
        "list_registries"
    }

    fn description(&self) -> &'static str {
        "List every configured registry with its URL, view-only flag, and mode label."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<EmptyInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<ListRegistriesOutput>()
    }

    async fn call(&self, ctx: &ToolContext, _input: Value) -> McpResult<Value> {
        let output = ListRegistriesOutput {
            registries: ctx.manager.list(),
            is_multi: ctx.manager.is_multi(),
        };
        Ok(serde_json::to_value(output).unwrap())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TestConnectionInput {
    registry: String,
}

pub struct TestConnection;

#[async_trait]
impl ToolHandler for TestConnection {
    fn name(&self) -> &'static str {
        "test_connection"
    }

    fn description(&self) -> &'static str {
        "Probe one registry's reachability with a single bounded-timeout request."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<TestConnectionInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<registry_client::ConnectionHealth>()
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> McpResult<Value> {
        let input: TestConnectionInput = serde_json::from_value(input)
            .map_err(|e| crate::error::McpError::InvalidArgument(e.to_string()))?;
        let health = ctx.manager.test_connection(&input.registry).await?;
        Ok(serde_json::to_value(health).unwrap())
    }
}

#[derive(Debug, Serialize, JsonSchema)]
struct TestAllConnectionsOutput {
    results: std::collections::HashMap<String, registry_client::ConnectionHealth>,
}

pub struct TestAllConnections;

#[async_trait]
impl ToolHandler for TestAllConnections {
    fn name(&self) -> &'static str {
        "test_all_connections"
    }

    fn description(&self) -> &'static str {
        "Probe every configured registry concurrently and report per-registry health."
    }

    fn required_scope(&self) -> Scope {
        Scope::Read
    }

    fn input_schema(&self) -> Value {
        schema_for::<EmptyInput>()
    }

    fn output_schema(&self) -> Value {
        schema_for::<TestAllConnectionsOutput>()
    }

    async fn call(&self, ctx: &ToolContext, _input: Value) -> McpResult<Value> {
        let results = ctx.manager.test_all().await;
        Ok(serde_json::to_value(TestAllConnectionsOutput { results }).unwrap())
    }
}
