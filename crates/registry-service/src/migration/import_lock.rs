//! The scoped IMPORT-mode guard (spec §4.5 step 2/4, §5 "Registry-global
//! IMPORT mode is a shared resource").
//!
//! At most one migration task per target registry may hold the IMPORT-mode
//! window at a time. The guard acquires a per-registry exclusive lock,
//! snapshots the prior mode, and restores it unconditionally — including
//! on cancellation and on panic unwind, which is why release is scheduled
//! from `Drop` rather than relying on callers to remember to clean up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use registry_client::RegistryClient;
use registry_core::{Context, Mode};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{error, warn};

use crate::error::{ServiceError, ServiceResult};

/// Holds one per-registry lock used to serialize IMPORT-mode windows.
#[derive(Clone, Default)]
pub struct ImportLockRegistry {
    locks: Arc<StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl ImportLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, registry: &str) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(registry.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Acquire the IMPORT-mode window for `client`, fail-fast with
    /// `REGISTRY_BUSY` if another task already holds it (spec §5 default
    /// policy).
    pub async fn acquire(
        &self,
        client: Arc<RegistryClient>,
        subject: Option<String>,
        context: Context,
    ) -> ServiceResult<ImportModeGuard> {
        let lock = self.lock_for(client.name());
        let permit = lock
            .try_lock_owned()
            .map_err(|_| ServiceError::RegistryBusy(client.name().to_string()))?;

        let previous_mode = client
            .get_mode(subject.as_deref(), &context)
            .await
            .unwrap_or(Mode::Readwrite);

        client
            .set_mode(subject.as_deref(), &context, Mode::Import, true)
            .await?;

        Ok(ImportModeGuard {
            client,
            subject,
            context,
            previous_mode,
            permit: Some(permit),
            released: false,
        })
    }
}

/// RAII handle to an acquired IMPORT-mode window. Prefer calling
/// [`ImportModeGuard::release`] on the success path; the guard restores
/// the prior mode as a best-effort detached task on `Drop` when the
/// caller didn't (cancellation, panic, or an early `?` return).
pub struct ImportModeGuard {
    client: Arc<RegistryClient>,
    subject: Option<String>,
    context: Context,
    previous_mode: Mode,
    permit: Option<OwnedMutexGuard<()>>,
    released: bool,
}

impl ImportModeGuard {
    /// Restore the target's prior mode and release the per-registry lock.
    /// Consumes the guard so `Drop` becomes a no-op.
    pub async fn release(mut self) -> ServiceResult<()> {
        self.released = true;
        self.client
            .set_mode(self.subject.as_deref(), &self.context, self.previous_mode, true)
            .await?;
        self.permit.take();
        Ok(())
    }
}

impl Drop for ImportModeGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            registry = self.client.name(),
            "import mode guard dropped without explicit release; restoring mode in background"
        );
        let client = self.client.clone();
        let subject = self.subject.clone();
        let context = self.context.clone();
        let previous_mode = self.previous_mode;
        // The OwnedMutexGuard permit is dropped here too (releasing the
        // per-registry lock) once this function returns; the spawned task
        // only needs the client handle, which is independently ref-counted.
        tokio::spawn(async move {
            if let Err(e) = client.set_mode(subject.as_deref(), &context, previous_mode, true).await {
                error!(registry = client.name(), error = %e, "failed to restore registry mode after guard drop");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::{Credentials, RegistryName, RegistryRecord, SsrfPolicy, TlsOptions};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> Arc<RegistryClient> {
        let record = Arc::new(RegistryRecord {
            name: RegistryName::parse("dev").unwrap(),
            url: server.uri(),
            credentials: Credentials::None,
            viewonly: false,
            tls: TlsOptions::default(),
            ssrf_policy: SsrfPolicy { allow_localhost: true },
            default_compatibility: None,
        });
        Arc::new(RegistryClient::new(record).unwrap())
    }

    #[tokio::test]
    async fn a_second_acquire_on_the_same_registry_fails_fast_with_registry_busy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"mode": "READWRITE"})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/mode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"mode": "IMPORT"})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let registry = ImportLockRegistry::new();
        let guard = registry
            .acquire(client.clone(), None, Context::default_context())
            .await
            .unwrap();

        let err = registry
            .acquire(client.clone(), None, Context::default_context())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RegistryBusy(_)));

        guard.release().await.unwrap();
    }

    #[tokio::test]
    async fn release_restores_the_snapshotted_prior_mode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"mode": "READONLY"})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/mode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"mode": "OK"})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let registry = ImportLockRegistry::new();
        let guard = registry
            .acquire(client.clone(), None, Context::default_context())
            .await
            .unwrap();
        assert_eq!(guard.previous_mode, Mode::Readonly);
        guard.release().await.unwrap();

        // Lock is free again.
        let guard2 = registry
            .acquire(client, None, Context::default_context())
            .await
            .unwrap();
        guard2.release().await.unwrap();
    }
}
