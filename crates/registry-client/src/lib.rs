//! A client for one Confluent-style Schema Registry endpoint: context-aware
//! URL composition, SSRF-checked construction, view-only enforcement, and
//! fixed backoff for idempotent reads (spec §4.1).

pub mod client;
pub mod error;
pub mod retry;
pub mod tls;

pub use client::{ConnectionHealth, FetchedSchema, RegisteredSchema, RegistryClient, SchemaById};
pub use error::{ClientError, ClientResult};
