//! Subjects, schema versions, and references (spec §3 "Subject").

use std::fmt;

use serde::{Deserialize, Serialize};

/// A subject name, scoped to (Registry, Context) at the call site rather
/// than carried in the type itself — callers always pass registry/context
/// alongside a `SubjectName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectName(pub String);

impl fmt::Display for SubjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubjectName {
    fn from(value: &str) -> Self {
        SubjectName(value.to_string())
    }
}

impl From<String> for SubjectName {
    fn from(value: String) -> Self {
        SubjectName(value)
    }
}

/// The schema serialization format (spec §3 "Subject").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    Avro,
    Json,
    Protobuf,
}

impl Default for SchemaType {
    fn default() -> Self {
        SchemaType::Avro
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemaType::Avro => "AVRO",
            SchemaType::Json => "JSON",
            SchemaType::Protobuf => "PROTOBUF",
        };
        write!(f, "{s}")
    }
}

/// A (subject, version) pair referenced by another schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SchemaReference {
    pub name: String,
    pub subject: String,
    pub version: i32,
}

/// A single registered version of a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub subject: String,
    pub version: i32,
    /// Monotonic, unique within the owning registry.
    pub id: i64,
    pub schema: String,
    #[serde(default)]
    pub schema_type: SchemaType,
    #[serde(default)]
    pub references: Vec<SchemaReference>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_type_defaults_to_avro() {
        assert_eq!(SchemaType::default(), SchemaType::Avro);
    }

    #[test]
    fn subject_name_display_matches_inner_string() {
        let name: SubjectName = "orders-value".into();
        assert_eq!(name.to_string(), "orders-value");
    }

    #[test]
    fn schema_version_omits_references_when_empty_by_default_construction() {
        let version = SchemaVersion {
            subject: "orders-value".into(),
            version: 1,
            id: 42,
            schema: "{}".into(),
            schema_type: SchemaType::Json,
            references: vec![],
        };
        let json = serde_json::to_value(&version).unwrap();
        assert_eq!(json["references"], serde_json::json!([]));
    }
}
