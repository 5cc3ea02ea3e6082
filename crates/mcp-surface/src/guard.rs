//! The Auth & Scope Guard (spec §4.4 "Auth & Scope Guard (C4)").
//!
//! OAuth provider integration and JWT verification are explicitly external
//! to this system (spec §1); this module only specifies the boundary: a
//! [`TokenValidator`] turns an opaque bearer token into a [`ScopeSet`].

use registry_core::ScopeSet;

/// Extracts a caller's granted scopes from an opaque bearer token. The
/// actual JWT/OAuth verification lives outside this crate; implementors
/// here only need to trust the token was already authenticated upstream
/// and decode whatever claim carries scopes.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, bearer_token: Option<&str>) -> ScopeSet;
}

/// Development mode: `ENABLE_AUTH=false` grants every scope regardless of
/// the token (spec §4.4).
pub struct NoAuthValidator;

impl TokenValidator for NoAuthValidator {
    fn validate(&self, _bearer_token: Option<&str>) -> ScopeSet {
        ScopeSet::all()
    }
}

/// A validator that maps known static tokens to fixed scope sets. Intended
/// for tests and simple deployments; production deployments are expected
/// to supply their own [`TokenValidator`] backed by real JWT verification.
pub struct StaticScopeValidator {
    tokens: std::collections::HashMap<String, ScopeSet>,
}

impl StaticScopeValidator {
    pub fn new() -> Self {
        StaticScopeValidator {
            tokens: std::collections::HashMap::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, scopes: ScopeSet) -> Self {
        self.tokens.insert(token.into(), scopes);
        self
    }
}

impl Default for StaticScopeValidator {
    fn default() -> Self {
        StaticScopeValidator::new()
    }
}

impl TokenValidator for StaticScopeValidator {
    fn validate(&self, bearer_token: Option<&str>) -> ScopeSet {
        bearer_token
            .and_then(|t| self.tokens.get(t))
            .cloned()
            .unwrap_or_else(ScopeSet::empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::Scope;

    #[test]
    fn no_auth_validator_grants_every_scope() {
        let validator = NoAuthValidator;
        let scopes = validator.validate(None);
        assert!(scopes.contains(Scope::Admin));
    }

    #[test]
    fn static_validator_grants_nothing_for_an_unknown_token() {
        let validator = StaticScopeValidator::new().with_token("abc", ScopeSet::from_iter([Scope::Read]));
        assert!(validator.validate(Some("nope")).is_empty());
    }

    #[test]
    fn static_validator_grants_configured_scopes_for_a_known_token() {
        let validator = StaticScopeValidator::new().with_token("abc", ScopeSet::from_iter([Scope::Read, Scope::Write]));
        let scopes = validator.validate(Some("abc"));
        assert!(scopes.contains(Scope::Read));
        assert!(scopes.contains(Scope::Write));
        assert!(!scopes.contains(Scope::Admin));
    }
}
