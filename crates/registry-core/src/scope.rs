//! The coarse-grained capability model (spec §4.4).

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single capability label attached to tools and to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Read,
    Write,
    Admin,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Read => "read",
            Scope::Write => "write",
            Scope::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

impl Scope {
    pub fn parse(s: &str) -> Option<Scope> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Some(Scope::Read),
            "write" => Some(Scope::Write),
            "admin" => Some(Scope::Admin),
            _ => None,
        }
    }
}

/// The set of scopes a caller holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSet(HashSet<Scope>);

impl ScopeSet {
    pub fn empty() -> Self {
        ScopeSet(HashSet::new())
    }

    /// A scope set holding all three scopes, used for dev-mode
    /// (`ENABLE_AUTH=false`) and for tests.
    pub fn all() -> Self {
        ScopeSet([Scope::Read, Scope::Write, Scope::Admin].into_iter().collect())
    }

    pub fn from_iter(scopes: impl IntoIterator<Item = Scope>) -> Self {
        ScopeSet(scopes.into_iter().collect())
    }

    pub fn parse_csv(raw: &str) -> Self {
        ScopeSet(raw.split(',').filter_map(Scope::parse).collect())
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    pub fn insert(&mut self, scope: Scope) {
        self.0.insert(scope);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
