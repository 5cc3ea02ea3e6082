//! Schema Registry contexts (spec §3 "Context") and the context-aware URL
//! builder (spec §4.1 "URL composition").
//!
//! `build_url` is the single authoritative implementation of the rule: the
//! default context (`nil`, `""`, or `"."`) never appears in the URL, and any
//! other context is rendered as a `/contexts/<urlencode(ctx)>` prefix. Every
//! registry-client operation and every test of invariant 1 (spec §8) goes
//! through this function.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical namespace of subjects within a registry.
///
/// The default context is represented by [`Context::Default`] regardless of
/// whether the caller spelled it as `None`, `""`, or `"."` — all three
/// collapse to the same value at construction time so that every downstream
/// consumer only has one case to handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Option<String>);

impl Context {
    /// The default context, spelled however the caller likes.
    pub fn default_context() -> Self {
        Context(None)
    }

    /// Build a context from a caller-supplied value that may be absent,
    /// empty, or the literal `"."` — all of which mean "default".
    pub fn from_opt(raw: Option<&str>) -> Self {
        match raw {
            None => Context(None),
            Some(s) if s.is_empty() || s == "." => Context(None),
            Some(s) => Context(Some(s.to_string())),
        }
    }

    pub fn is_default(&self) -> bool {
        self.0.is_none()
    }

    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => write!(f, "."),
            Some(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for Context {
    fn from(value: &str) -> Self {
        Context::from_opt(Some(value))
    }
}

impl From<String> for Context {
    fn from(value: String) -> Self {
        Context::from_opt(Some(&value))
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::default_context()
    }
}

/// Compose a registry URL for `path` under `context`, relative to `base`.
///
/// `base` must not have a trailing slash; `path` must start with `/`. For
/// the default context this returns `base + path` verbatim. For a named
/// context it returns `base + "/contexts/" + urlencode(name) + path`.
pub fn build_url(base: &str, context: &Context, path: &str) -> String {
    match context.name() {
        None => format!("{base}{path}"),
        Some(name) => {
            let encoded = urlencode_context(name);
            format!("{base}/contexts/{encoded}{path}")
        }
    }
}

/// Percent-encode a context name for use as a single path segment.
///
/// Schema Registry context names are simple identifiers in practice, but we
/// still encode conservatively (RFC 3986 `pchar`) so that an operator-chosen
/// name containing `/`, `%`, or whitespace cannot smuggle extra path
/// segments into the composed URL.
fn urlencode_context(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_collapses_all_spellings() {
        assert_eq!(Context::from_opt(None), Context::default_context());
        assert_eq!(Context::from_opt(Some("")), Context::default_context());
        assert_eq!(Context::from_opt(Some(".")), Context::default_context());
    }

    #[test]
    fn build_url_default_context_has_no_contexts_segment() {
        let ctx = Context::default_context();
        assert_eq!(
            build_url("http://sr:8081", &ctx, "/subjects"),
            "http://sr:8081/subjects"
        );
        let dot = Context::from_opt(Some("."));
        assert_eq!(
            build_url("http://sr:8081", &dot, "/subjects"),
            "http://sr:8081/subjects"
        );
        let empty = Context::from_opt(Some(""));
        assert_eq!(
            build_url("http://sr:8081", &empty, "/subjects"),
            "http://sr:8081/subjects"
        );
    }

    #[test]
    fn build_url_named_context_has_exactly_one_contexts_segment() {
        let ctx = Context::from("prod");
        let url = build_url("http://sr:8081", &ctx, "/subjects");
        assert_eq!(url, "http://sr:8081/contexts/prod/subjects");
        assert_eq!(url.matches("/contexts/").count(), 1);
    }

    #[test]
    fn build_url_encodes_special_characters_in_context_name() {
        let ctx = Context::from("team a/b");
        let url = build_url("http://sr:8081", &ctx, "/subjects");
        assert_eq!(url, "http://sr:8081/contexts/team%20a%2Fb/subjects");
    }

    #[test]
    fn default_and_explicit_equivalence_invariant() {
        // Spec §8 invariant 1 / S6: context="." and context=None must
        // resolve to the same outbound URL.
        let a = build_url("http://sr", &Context::from_opt(Some(".")), "/subjects");
        let b = build_url("http://sr", &Context::from_opt(None), "/subjects");
        assert_eq!(a, b);
    }

    #[test]
    fn display_renders_dot_for_default() {
        assert_eq!(Context::default_context().to_string(), ".");
        assert_eq!(Context::from("prod").to_string(), "prod");
    }
}
