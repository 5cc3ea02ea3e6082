//! Elicitation sessions and the smart-defaults pattern store (spec §4.9
//! "Elicitation & Smart Defaults (C9)").

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use ulid::Ulid;

/// Default continuation-token TTL (spec §4.9).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(600);

/// An opaque continuation token handed back to the caller so the next
/// invocation of a multi-step tool can resume where it left off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(Ulid);

impl ContinuationToken {
    fn new() -> Self {
        ContinuationToken(Ulid::new())
    }
}

impl std::fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accumulated state for one in-progress elicitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitationSession {
    pub tool_name: String,
    pub accumulated: Value,
    pub next_question: String,
}

struct StoredSession {
    session: ElicitationSession,
    created_at: Instant,
}

/// In-memory continuation-token store for multi-step tool invocations.
pub struct ElicitationStore {
    sessions: Mutex<HashMap<ContinuationToken, StoredSession>>,
    ttl: Duration,
}

impl ElicitationStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        ElicitationStore {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    #[instrument(skip(self, session))]
    pub fn begin(&self, session: ElicitationSession) -> ContinuationToken {
        let token = ContinuationToken::new();
        self.sessions.lock().unwrap().insert(
            token,
            StoredSession {
                session,
                created_at: Instant::now(),
            },
        );
        token
    }

    /// Resume a session, sweeping expired entries as a side effect.
    pub fn resume(&self, token: ContinuationToken) -> Option<ElicitationSession> {
        let mut sessions = self.sessions.lock().unwrap();
        self.sweep_locked(&mut sessions);
        sessions.get(&token).map(|s| s.session.clone())
    }

    pub fn update(&self, token: ContinuationToken, session: ElicitationSession) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(entry) = sessions.get_mut(&token) {
            entry.session = session;
        }
    }

    pub fn complete(&self, token: ContinuationToken) {
        self.sessions.lock().unwrap().remove(&token);
    }

    fn sweep_locked(&self, sessions: &mut HashMap<ContinuationToken, StoredSession>) {
        let ttl = self.ttl;
        let before = sessions.len();
        sessions.retain(|_, s| s.created_at.elapsed() < ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "swept expired elicitation sessions");
        }
    }
}

impl Default for ElicitationStore {
    fn default() -> Self {
        ElicitationStore::new()
    }
}

/// The per-tool, per-field smart-defaults pattern store (spec §4.9).
///
/// Non-authoritative: a recorded default is only ever a suggestion and
/// never overrides explicit caller input.
pub struct SmartDefaultsStore {
    enabled: bool,
    counts: Mutex<HashMap<(String, String), HashMap<String, u64>>>,
}

impl SmartDefaultsStore {
    pub fn new(enabled: bool) -> Self {
        SmartDefaultsStore {
            enabled,
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, tool: &str, field: &str, value: &str) {
        if !self.enabled {
            return;
        }
        let mut counts = self.counts.lock().unwrap();
        *counts
            .entry((tool.to_string(), field.to_string()))
            .or_default()
            .entry(value.to_string())
            .or_insert(0) += 1;
    }

    /// The most frequently supplied value for this tool/field, if any and
    /// if the store is enabled.
    pub fn suggest(&self, tool: &str, field: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let counts = self.counts.lock().unwrap();
        counts
            .get(&(tool.to_string(), field.to_string()))
            .and_then(|values| values.iter().max_by_key(|(_, count)| **count))
            .map(|(value, _)| value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_and_resume_roundtrips_the_session() {
        let store = ElicitationStore::new();
        let session = ElicitationSession {
            tool_name: "evolve_schema".into(),
            accumulated: serde_json::json!({"subject": "orders-value"}),
            next_question: "which compatibility mode?".into(),
        };
        let token = store.begin(session.clone());
        let resumed = store.resume(token).unwrap();
        assert_eq!(resumed.tool_name, "evolve_schema");
    }

    #[test]
    fn expired_sessions_are_swept_on_resume() {
        let store = ElicitationStore::with_ttl(Duration::from_millis(1));
        let token = store.begin(ElicitationSession {
            tool_name: "evolve_schema".into(),
            accumulated: serde_json::json!({}),
            next_question: "?".into(),
        });
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.resume(token).is_none());
    }

    #[test]
    fn smart_defaults_suggests_the_most_frequent_value() {
        let store = SmartDefaultsStore::new(true);
        store.record("evolve_schema", "compatibility", "BACKWARD");
        store.record("evolve_schema", "compatibility", "BACKWARD");
        store.record("evolve_schema", "compatibility", "FULL");
        assert_eq!(
            store.suggest("evolve_schema", "compatibility"),
            Some("BACKWARD".to_string())
        );
    }

    #[test]
    fn disabled_store_never_suggests() {
        let store = SmartDefaultsStore::new(false);
        store.record("evolve_schema", "compatibility", "BACKWARD");
        assert_eq!(store.suggest("evolve_schema", "compatibility"), None);
    }
}
