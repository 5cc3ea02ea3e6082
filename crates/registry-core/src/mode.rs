//! Subject and registry modes (spec §3 "Mode").

use std::fmt;

use serde::{Deserialize, Serialize};

/// The Schema Registry mode of a registry or an individual subject.
///
/// `Import` is transient: the Migration Engine enters it immediately before
/// an ID-preserving bulk registration and always restores the prior mode
/// afterward, even on failure (spec §4.5 invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Readwrite,
    Readonly,
    Import,
}

impl Mode {
    pub fn parse(raw: &str) -> Option<Mode> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "READWRITE" => Some(Mode::Readwrite),
            "READONLY" => Some(Mode::Readonly),
            "IMPORT" => Some(Mode::Import),
            _ => None,
        }
    }

    pub fn accepts_writes(self) -> bool {
        matches!(self, Mode::Readwrite | Mode::Import)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Readwrite => "READWRITE",
            Mode::Readonly => "READONLY",
            Mode::Import => "IMPORT",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Mode::parse("readwrite"), Some(Mode::Readwrite));
        assert_eq!(Mode::parse("ReadOnly"), Some(Mode::Readonly));
        assert_eq!(Mode::parse("IMPORT"), Some(Mode::Import));
        assert_eq!(Mode::parse("bogus"), None);
    }

    #[test]
    fn only_readonly_rejects_writes() {
        assert!(Mode::Readwrite.accepts_writes());
        assert!(Mode::Import.accepts_writes());
        assert!(!Mode::Readonly.accepts_writes());
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for mode in [Mode::Readwrite, Mode::Readonly, Mode::Import] {
            assert_eq!(Mode::parse(&mode.to_string()), Some(mode));
        }
    }
}
