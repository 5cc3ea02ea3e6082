//! The `Registry` identity and configuration record (spec §3 "Registry").

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// A unique, case-sensitive registry name, 1..64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryName(String);

impl RegistryName {
    pub fn parse(raw: impl Into<String>) -> Result<Self, crate::error::CoreError> {
        let raw = raw.into();
        if raw.is_empty() || raw.chars().count() > 64 {
            return Err(crate::error::CoreError::InvalidRegistryName(raw));
        }
        Ok(RegistryName(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Basic-auth credentials or a bearer token for a registry.
///
/// Held as [`SecretString`] end-to-end so an accidental `{:?}` of a
/// [`RegistryRecord`] never leaks a password or token into logs.
#[derive(Clone)]
pub enum Credentials {
    None,
    Basic {
        username: String,
        password: SecretString,
    },
    Bearer {
        token: SecretString,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::None => write!(f, "Credentials::None"),
            Credentials::Basic { username, .. } => {
                write!(f, "Credentials::Basic {{ username: {username:?}, password: [redacted] }}")
            }
            Credentials::Bearer { .. } => write!(f, "Credentials::Bearer {{ token: [redacted] }}"),
        }
    }
}

/// TLS options for a registry client (spec §3 "TLS options").
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    pub ca_bundle_path: Option<String>,
    pub client_cert_path: Option<String>,
    pub client_key_path: Option<String>,
    pub insecure_skip_verify: bool,
}

/// The SSRF posture applied when validating a registry's base URL
/// (spec §4.1 "SSRF safety").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsrfPolicy {
    /// When true, loopback and private-range hosts are permitted. Wired
    /// from `ALLOW_LOCALHOST=true` at startup.
    pub allow_localhost: bool,
}

impl Default for SsrfPolicy {
    fn default() -> Self {
        SsrfPolicy {
            allow_localhost: false,
        }
    }
}

/// An immutable, process-local registry configuration record.
///
/// Constructed once by the Registry Manager at startup (spec §3
/// "Lifecycle") and shared behind an `Arc` with every consumer; there is no
/// mutation path after construction.
#[derive(Debug, Clone)]
pub struct RegistryRecord {
    pub name: RegistryName,
    pub url: String,
    pub credentials: Credentials,
    pub viewonly: bool,
    pub tls: TlsOptions,
    pub ssrf_policy: SsrfPolicy,
    /// Informational only (spec §3): does not gate any operation.
    pub default_compatibility: Option<String>,
}

impl RegistryRecord {
    pub fn is_mutable(&self) -> bool {
        !self.viewonly
    }
}

/// A summary view of a registry suitable for `list_registries`-style tools
/// (spec §4.2 `RegistryInfo`). Never carries credentials.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RegistryInfo {
    pub name: String,
    pub url: String,
    pub viewonly: bool,
    pub mode_label: String,
}

impl From<&RegistryRecord> for RegistryInfo {
    fn from(record: &RegistryRecord) -> Self {
        RegistryInfo {
            name: record.name.as_str().to_string(),
            url: record.url.clone(),
            viewonly: record.viewonly,
            mode_label: if record.viewonly { "READONLY".into() } else { "READWRITE".into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_name_rejects_empty_and_overlong() {
        assert!(RegistryName::parse("").is_err());
        assert!(RegistryName::parse("x".repeat(65)).is_err());
        assert!(RegistryName::parse("dev").is_ok());
        assert!(RegistryName::parse("x".repeat(64)).is_ok());
    }

    #[test]
    fn credentials_debug_never_prints_secret_material() {
        let creds = Credentials::Basic {
            username: "svc".into(),
            password: SecretString::new("hunter2".into()),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));

        let bearer = Credentials::Bearer {
            token: SecretString::new("sk-super-secret".into()),
        };
        let rendered = format!("{bearer:?}");
        assert!(!rendered.contains("sk-super-secret"));
    }

    #[test]
    fn registry_info_never_carries_credentials() {
        let record = RegistryRecord {
            name: RegistryName::parse("dev").unwrap(),
            url: "http://sr:8081".into(),
            credentials: Credentials::Bearer {
                token: SecretString::new("secret".into()),
            },
            viewonly: true,
            tls: TlsOptions::default(),
            ssrf_policy: SsrfPolicy::default(),
            default_compatibility: None,
        };
        let info = RegistryInfo::from(&record);
        assert_eq!(info.mode_label, "READONLY");
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("secret"));
    }
}
