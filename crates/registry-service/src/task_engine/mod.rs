//! The Task Engine (spec §4.3 "Task Engine (C3)"): a generic, cancellable,
//! progress-tracked worker pool used by every long-running operation.

mod progress;

pub use progress::ProgressReporter;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use registry_core::{ErrorPayload, TaskId, TaskRecord, TaskState, TaskType};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use progress::TaskMap;

/// Default task wall-clock timeout (spec §4.3, §5).
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default reap window after a task reaches a terminal state (spec §4.3).
pub const DEFAULT_REAP_WINDOW: Duration = Duration::from_secs(3600);

/// The unit of work a caller submits to the engine. Implementors receive a
/// [`ProgressReporter`] to publish progress and a [`CancellationToken`] to
/// observe at every network boundary and loop top (spec §4.3
/// "Cancellation").
#[async_trait]
pub trait TaskWork: Send {
    async fn run(
        self: Box<Self>,
        progress: ProgressReporter,
        cancellation: CancellationToken,
    ) -> ServiceResult<serde_json::Value>;
}

struct Job {
    id: TaskId,
    work: Box<dyn TaskWork>,
    timeout: Duration,
    cancellation: CancellationToken,
}

/// The default worker pool size (spec §4.3: `min(8, 2*CPU)`).
fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (2 * cpus).min(8)
}

pub struct TaskEngine {
    tasks: TaskMap,
    cancellations: Arc<Mutex<HashMap<TaskId, CancellationToken>>>,
    submit_tx: mpsc::UnboundedSender<Job>,
    reap_window: Duration,
}

impl TaskEngine {
    pub fn new() -> Self {
        Self::with_concurrency(default_worker_count(), DEFAULT_REAP_WINDOW)
    }

    pub fn with_concurrency(concurrency: usize, reap_window: Duration) -> Self {
        let tasks: TaskMap = Arc::new(Mutex::new(HashMap::new()));
        let cancellations = Arc::new(Mutex::new(HashMap::new()));
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let (submit_tx, submit_rx) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(Self::dispatch_loop(submit_rx, tasks.clone(), semaphore));

        TaskEngine {
            tasks,
            cancellations,
            submit_tx,
            reap_window,
        }
    }

    async fn dispatch_loop(
        mut rx: mpsc::UnboundedReceiver<Job>,
        tasks: TaskMap,
        semaphore: Arc<Semaphore>,
    ) {
        while let Some(job) = rx.recv().await {
            let tasks = tasks.clone();
            let semaphore = semaphore.clone();
            tokio::spawn(async move {
                let permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("task engine semaphore is never closed");
                Self::run_job(job, tasks).await;
                drop(permit);
            });
        }
    }

    #[instrument(skip(job, tasks), fields(task_id = %job.id))]
    async fn run_job(job: Job, tasks: TaskMap) {
        let Job {
            id,
            work,
            timeout,
            cancellation,
        } = job;

        {
            let mut guard = tasks.lock().unwrap();
            if let Some(record) = guard.get_mut(&id) {
                record.state = TaskState::Running;
                record.started_at = Some(Utc::now());
            }
        }

        let reporter = ProgressReporter::new(id, tasks.clone());
        let outcome = tokio::time::timeout(timeout, work.run(reporter, cancellation.clone())).await;

        let mut guard = tasks.lock().unwrap();
        let Some(record) = guard.get_mut(&id) else {
            warn!(task_id = %id, "task record vanished before completion");
            return;
        };

        record.ended_at = Some(Utc::now());
        match outcome {
            _ if cancellation.is_cancelled() => {
                record.state = TaskState::Cancelled;
                record.error = Some(ErrorPayload::new(
                    "task was cancelled",
                    "TASK_CANCELLED",
                ));
            }
            Err(_elapsed) => {
                record.state = TaskState::Failed;
                record.error = Some(ErrorPayload::new(
                    format!("task exceeded its {timeout:?} timeout"),
                    "TASK_TIMEOUT",
                ));
            }
            Ok(Ok(value)) => {
                record.state = TaskState::Completed;
                record.progress_percent = 100;
                record.result = Some(value);
            }
            Ok(Err(err)) => {
                error!(task_id = %id, error = %err, "task failed");
                record.state = TaskState::Failed;
                record.error = Some(ErrorPayload::new(err.to_string(), err_code(&err)));
            }
        }
    }

    /// Submit a unit of work and return its task id immediately; the work
    /// runs on the bounded pool once a permit is available.
    pub fn submit(&self, task_type: TaskType, work: Box<dyn TaskWork>) -> TaskId {
        self.submit_with_timeout(task_type, work, DEFAULT_TASK_TIMEOUT)
    }

    pub fn submit_with_timeout(
        &self,
        task_type: TaskType,
        work: Box<dyn TaskWork>,
        timeout: Duration,
    ) -> TaskId {
        let record = TaskRecord::new(task_type, Utc::now());
        let id = record.id;
        self.tasks.lock().unwrap().insert(id, record);

        let cancellation = CancellationToken::new();
        self.cancellations.lock().unwrap().insert(id, cancellation.clone());

        debug!(task_id = %id, task_type = %task_type, "task submitted");
        // An unbounded channel send only fails if the dispatcher loop has
        // been dropped, which only happens if the engine itself was
        // dropped — there is no task left to report progress to.
        let _ = self.submit_tx.send(Job {
            id,
            work,
            timeout,
            cancellation,
        });
        id
    }

    /// Flip the task's cancellation token. Cooperative: the worker observes
    /// it at its next boundary check (spec §4.3). A no-op on an already
    /// terminal task.
    pub fn cancel(&self, task_id: TaskId) -> ServiceResult<()> {
        let tasks = self.tasks.lock().unwrap();
        let record = tasks
            .get(&task_id)
            .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;
        if record.state.is_terminal() {
            return Err(ServiceError::TaskAlreadyTerminal(task_id.to_string()));
        }
        drop(tasks);

        if let Some(token) = self.cancellations.lock().unwrap().get(&task_id) {
            token.cancel();
        }
        Ok(())
    }

    pub fn get_task_status(&self, task_id: TaskId) -> ServiceResult<TaskRecord> {
        self.tasks
            .lock()
            .unwrap()
            .get(&task_id)
            .cloned()
            .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))
    }

    pub fn list_active(&self) -> Vec<TaskRecord> {
        self.tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| !t.state.is_terminal())
            .cloned()
            .collect()
    }

    pub fn list_by_type(&self, task_type: TaskType) -> Vec<TaskRecord> {
        self.tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| std::mem::discriminant(&t.task_type) == std::mem::discriminant(&task_type))
            .cloned()
            .collect()
    }

    /// Remove terminal tasks whose `ended_at` is older than the reap
    /// window (spec §4.3 "Listing & reaping"). Intended to be driven by a
    /// periodic `tokio::time::interval` in `server`.
    pub fn reap(&self) -> usize {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.reap_window).unwrap();
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|_, record| {
            !(record.state.is_terminal() && record.ended_at.map(|t| t < cutoff).unwrap_or(false))
        });
        let removed = before - tasks.len();
        if removed > 0 {
            info!(removed, "reaped terminal tasks");
        }
        removed
    }
}

impl Default for TaskEngine {
    fn default() -> Self {
        TaskEngine::new()
    }
}

fn err_code(err: &ServiceError) -> &'static str {
    use registry_core::ErrorCode;
    err.error_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Immediate(serde_json::Value);

    #[async_trait]
    impl TaskWork for Immediate {
        async fn run(
            self: Box<Self>,
            _progress: ProgressReporter,
            _cancellation: CancellationToken,
        ) -> ServiceResult<serde_json::Value> {
            Ok(self.0)
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl TaskWork for AlwaysFails {
        async fn run(
            self: Box<Self>,
            _progress: ProgressReporter,
            _cancellation: CancellationToken,
        ) -> ServiceResult<serde_json::Value> {
            Err(ServiceError::InvalidArgument("boom".into()))
        }
    }

    struct WaitsForCancellation;

    #[async_trait]
    impl TaskWork for WaitsForCancellation {
        async fn run(
            self: Box<Self>,
            _progress: ProgressReporter,
            cancellation: CancellationToken,
        ) -> ServiceResult<serde_json::Value> {
            cancellation.cancelled().await;
            Ok(serde_json::json!({}))
        }
    }

    async fn wait_for_terminal(engine: &TaskEngine, id: TaskId) -> TaskRecord {
        for _ in 0..200 {
            let record = engine.get_task_status(id).unwrap();
            if record.state.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task never reached a terminal state");
    }

    #[tokio::test]
    async fn a_submitted_task_completes_and_carries_its_result() {
        let engine = TaskEngine::with_concurrency(2, DEFAULT_REAP_WINDOW);
        let id = engine.submit(
            TaskType::Statistics,
            Box::new(Immediate(serde_json::json!({"ok": true}))),
        );
        let record = wait_for_terminal(&engine, id).await;
        assert_eq!(record.state, TaskState::Completed);
        assert_eq!(record.result, Some(serde_json::json!({"ok": true})));
    }

    #[tokio::test]
    async fn a_failing_task_carries_an_error_payload() {
        let engine = TaskEngine::with_concurrency(2, DEFAULT_REAP_WINDOW);
        let id = engine.submit(TaskType::Compare, Box::new(AlwaysFails));
        let record = wait_for_terminal(&engine, id).await;
        assert_eq!(record.state, TaskState::Failed);
        assert_eq!(record.error.unwrap().error_code, "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn cancelling_a_task_transitions_it_to_cancelled() {
        let engine = TaskEngine::with_concurrency(2, DEFAULT_REAP_WINDOW);
        let id = engine.submit(TaskType::Migration, Box::new(WaitsForCancellation));
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.cancel(id).unwrap();
        let record = wait_for_terminal(&engine, id).await;
        assert_eq!(record.state, TaskState::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_an_already_terminal_task_is_rejected() {
        let engine = TaskEngine::with_concurrency(2, DEFAULT_REAP_WINDOW);
        let id = engine.submit(TaskType::Statistics, Box::new(Immediate(serde_json::json!(1))));
        wait_for_terminal(&engine, id).await;
        let err = engine.cancel(id).unwrap_err();
        assert!(matches!(err, ServiceError::TaskAlreadyTerminal(_)));
    }

    #[tokio::test]
    async fn get_task_status_on_unknown_id_is_task_not_found() {
        let engine = TaskEngine::with_concurrency(2, DEFAULT_REAP_WINDOW);
        let err = engine.get_task_status(TaskId::new()).unwrap_err();
        assert!(matches!(err, ServiceError::TaskNotFound(_)));
    }
}
