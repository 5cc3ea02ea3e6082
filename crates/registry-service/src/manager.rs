//! The Registry Manager (spec §4.2 "Registry Manager (C2)").
//!
//! Parses the numbered `SCHEMA_REGISTRY_*_N` environment slots (and the
//! legacy single-registry form) once at startup. The resulting set is
//! immutable and lock-free for the rest of the process lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use registry_client::{ConnectionHealth, RegistryClient};
use registry_core::{Credentials, RegistryInfo, RegistryName, RegistryRecord, SsrfPolicy, TlsOptions};
use secrecy::SecretString;
use tracing::{info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};

/// Highest numbered slot scanned (spec §4.2 "for N in 1..8").
const MAX_SLOTS: u32 = 8;

/// Default bounded concurrency for `test_all` (spec §4.2).
const DEFAULT_TEST_ALL_CONCURRENCY: usize = 8;

fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn env_bool(key: &str) -> bool {
    std::env::var(key).map(|v| parse_bool(&v)).unwrap_or(false)
}

fn parse_slot(n: Option<u32>, allow_localhost: bool) -> ServiceResult<Option<RegistryRecord>> {
    let suffix = |base: &str| match n {
        Some(n) => format!("{base}_{n}"),
        None => base.to_string(),
    };

    let url = match std::env::var(suffix("SCHEMA_REGISTRY_URL")) {
        Ok(url) => url,
        Err(_) => return Ok(None),
    };

    let name = match n {
        Some(n) => std::env::var(suffix("SCHEMA_REGISTRY_NAME")).map_err(|_| {
            ServiceError::Core(registry_core::CoreError::ConfigInvalid(format!(
                "SCHEMA_REGISTRY_NAME_{n} is required when SCHEMA_REGISTRY_URL_{n} is set"
            )))
        })?,
        None => "default".to_string(),
    };
    let name = RegistryName::parse(name).map_err(ServiceError::Core)?;

    let username = std::env::var(suffix("SCHEMA_REGISTRY_USER")).ok();
    let password = std::env::var(suffix("SCHEMA_REGISTRY_PASSWORD")).ok();
    let credentials = match (username, password) {
        (Some(username), Some(password)) => Credentials::Basic {
            username,
            password: SecretString::new(password),
        },
        _ => Credentials::None,
    };

    let viewonly_raw = std::env::var(suffix("VIEWONLY")).ok();
    let readonly_raw = std::env::var(suffix("READONLY")).ok();
    let viewonly = match (viewonly_raw, readonly_raw) {
        (Some(a), Some(b)) if parse_bool(&a) != parse_bool(&b) => {
            return Err(ServiceError::Core(registry_core::CoreError::ConfigInvalid(format!(
                "{} and {} disagree for this registry slot",
                suffix("VIEWONLY"),
                suffix("READONLY")
            ))));
        }
        (Some(a), _) => parse_bool(&a),
        (None, Some(b)) => parse_bool(&b),
        (None, None) => false,
    };

    Ok(Some(RegistryRecord {
        name,
        url,
        credentials,
        viewonly,
        tls: TlsOptions::default(),
        ssrf_policy: SsrfPolicy { allow_localhost },
        default_compatibility: None,
    }))
}

/// The immutable pool of registry clients for this process (spec §4.2).
pub struct RegistryManager {
    clients: Vec<Arc<RegistryClient>>,
    by_name: HashMap<String, usize>,
}

impl RegistryManager {
    /// Load registries from the environment. Duplicate names or URLs abort
    /// startup with `CONFIG_INVALID` (spec §4.2).
    #[instrument(skip_all)]
    pub fn from_env() -> ServiceResult<Self> {
        let allow_localhost = env_bool("ALLOW_LOCALHOST");
        let mut records = Vec::new();

        for n in 1..=MAX_SLOTS {
            if let Some(record) = parse_slot(Some(n), allow_localhost)? {
                records.push(record);
            }
        }

        if records.is_empty() {
            if let Some(record) = parse_slot(None, allow_localhost)? {
                records.push(record);
            }
        }

        if records.is_empty() {
            return Err(ServiceError::Core(registry_core::CoreError::ConfigInvalid(
                "no SCHEMA_REGISTRY_URL or SCHEMA_REGISTRY_URL_N configured".to_string(),
            )));
        }

        Self::from_records(records)
    }

    pub fn from_records(records: Vec<RegistryRecord>) -> ServiceResult<Self> {
        let mut seen_names = std::collections::HashSet::new();
        let mut seen_urls = std::collections::HashSet::new();
        for record in &records {
            if !seen_names.insert(record.name.as_str().to_string()) {
                return Err(ServiceError::Core(registry_core::CoreError::DuplicateRegistryName(
                    record.name.to_string(),
                )));
            }
            if !seen_urls.insert(record.url.clone()) {
                return Err(ServiceError::Core(registry_core::CoreError::DuplicateRegistryUrl(
                    record.url.clone(),
                )));
            }
        }

        let mut clients = Vec::with_capacity(records.len());
        let mut by_name = HashMap::with_capacity(records.len());
        for record in records {
            let name = record.name.as_str().to_string();
            let client = RegistryClient::new(Arc::new(record))?;
            by_name.insert(name, clients.len());
            clients.push(Arc::new(client));
        }

        info!(count = clients.len(), "registry manager initialized");
        Ok(RegistryManager { clients, by_name })
    }

    pub fn list(&self) -> Vec<RegistryInfo> {
        self.clients
            .iter()
            .map(|c| RegistryInfo {
                name: c.name().to_string(),
                url: c.base_url().to_string(),
                viewonly: c.is_viewonly(),
                mode_label: if c.is_viewonly() { "READONLY".into() } else { "READWRITE".into() },
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> ServiceResult<Arc<RegistryClient>> {
        self.by_name
            .get(name)
            .map(|&idx| self.clients[idx].clone())
            .ok_or_else(|| ServiceError::RegistryNotFound(name.to_string()))
    }

    /// The first numbered slot, or the only registry in legacy single mode
    /// (spec §4.2 `default()`).
    pub fn default_registry(&self) -> Arc<RegistryClient> {
        self.clients[0].clone()
    }

    pub fn is_multi(&self) -> bool {
        self.clients.len() > 1
    }

    pub fn names(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.name().to_string()).collect()
    }

    #[instrument(skip(self))]
    pub async fn test_connection(&self, name: &str) -> ServiceResult<ConnectionHealth> {
        let client = self.get(name)?;
        Ok(client.test_connection().await)
    }

    #[instrument(skip(self))]
    pub async fn test_all(&self) -> HashMap<String, ConnectionHealth> {
        let results: Vec<(String, ConnectionHealth)> = stream::iter(self.clients.iter().cloned())
            .map(|client| async move {
                let health = client.test_connection().await;
                (client.name().to_string(), health)
            })
            .buffer_unordered(DEFAULT_TEST_ALL_CONCURRENCY)
            .collect()
            .await;

        if results.iter().any(|(_, h)| !h.healthy) {
            warn!("one or more registries failed connectivity probe");
        }
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_record(name: &str, url: &str) -> RegistryRecord {
        RegistryRecord {
            name: RegistryName::parse(name).unwrap(),
            url: url.to_string(),
            credentials: Credentials::None,
            viewonly: false,
            tls: TlsOptions::default(),
            ssrf_policy: SsrfPolicy { allow_localhost: true },
            default_compatibility: None,
        }
    }

    #[test]
    fn divergent_viewonly_and_readonly_on_the_same_slot_is_a_config_error() {
        std::env::set_var("SCHEMA_REGISTRY_URL_77", "http://localhost:9999");
        std::env::set_var("SCHEMA_REGISTRY_NAME_77", "conflict");
        std::env::set_var("VIEWONLY_77", "true");
        std::env::set_var("READONLY_77", "false");
        let result = parse_slot(Some(77), true);
        std::env::remove_var("SCHEMA_REGISTRY_URL_77");
        std::env::remove_var("SCHEMA_REGISTRY_NAME_77");
        std::env::remove_var("VIEWONLY_77");
        std::env::remove_var("READONLY_77");
        assert!(matches!(
            result.unwrap_err(),
            ServiceError::Core(registry_core::CoreError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn agreeing_viewonly_and_readonly_on_the_same_slot_is_fine() {
        std::env::set_var("SCHEMA_REGISTRY_URL_78", "http://localhost:9998");
        std::env::set_var("SCHEMA_REGISTRY_NAME_78", "agree");
        std::env::set_var("VIEWONLY_78", "true");
        std::env::set_var("READONLY_78", "yes");
        let result = parse_slot(Some(78), true);
        std::env::remove_var("SCHEMA_REGISTRY_URL_78");
        std::env::remove_var("SCHEMA_REGISTRY_NAME_78");
        std::env::remove_var("VIEWONLY_78");
        std::env::remove_var("READONLY_78");
        assert!(result.unwrap().unwrap().viewonly);
    }

    #[test]
    fn duplicate_names_abort_construction() {
        let records = vec![
            plain_record("dev", "http://localhost:8081"),
            plain_record("dev", "http://localhost:8082"),
        ];
        let err = RegistryManager::from_records(records).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(registry_core::CoreError::DuplicateRegistryName(_))
        ));
    }

    #[test]
    fn duplicate_urls_abort_construction() {
        let records = vec![
            plain_record("dev", "http://localhost:8081"),
            plain_record("staging", "http://localhost:8081"),
        ];
        let err = RegistryManager::from_records(records).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(registry_core::CoreError::DuplicateRegistryUrl(_))
        ));
    }

    #[test]
    fn default_registry_is_the_first_configured_slot() {
        let records = vec![
            plain_record("dev", "http://localhost:8081"),
            plain_record("prod", "http://localhost:8082"),
        ];
        let manager = RegistryManager::from_records(records).unwrap();
        assert_eq!(manager.default_registry().name(), "dev");
        assert!(manager.is_multi());
    }

    #[test]
    fn get_missing_registry_returns_registry_not_found() {
        let manager = RegistryManager::from_records(vec![plain_record("dev", "http://localhost:8081")]).unwrap();
        let err = manager.get("ghost").unwrap_err();
        assert!(matches!(err, ServiceError::RegistryNotFound(_)));
    }
}
