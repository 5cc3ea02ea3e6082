//! The progress reporter handed to every running task (spec §4.3 "Progress").

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use registry_core::{ProgressReport, TaskId, TaskRecord};
use tracing::trace;

/// Minimum interval between persisted progress updates for a single task
/// (spec §4.3: "reports are coalesced at most every 250ms per task").
const COALESCE_INTERVAL: Duration = Duration::from_millis(250);

pub(crate) type TaskMap = Arc<Mutex<std::collections::HashMap<TaskId, TaskRecord>>>;

/// Handed to a running task's work closure so it can publish progress
/// without holding the task map lock itself.
#[derive(Clone)]
pub struct ProgressReporter {
    task_id: TaskId,
    tasks: TaskMap,
    last_report: Arc<Mutex<Instant>>,
}

impl ProgressReporter {
    pub(crate) fn new(task_id: TaskId, tasks: TaskMap) -> Self {
        ProgressReporter {
            task_id,
            tasks,
            last_report: Arc::new(Mutex::new(Instant::now() - COALESCE_INTERVAL)),
        }
    }

    /// Publish progress. Percent is clamped to the task's current value or
    /// higher (monotonic, spec §4.3) and updates are coalesced to at most
    /// one per [`COALESCE_INTERVAL`]; the final call before completion
    /// should go through [`ProgressReporter::force_report`] instead.
    pub fn report(&self, report: ProgressReport) {
        let mut last = self.last_report.lock().unwrap();
        if last.elapsed() < COALESCE_INTERVAL {
            return;
        }
        *last = Instant::now();
        drop(last);
        self.force_report(report);
    }

    pub fn force_report(&self, report: ProgressReport) {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(record) = tasks.get_mut(&self.task_id) {
            let percent = report.percent.max(record.progress_percent);
            trace!(task_id = %self.task_id, percent, "progress update");
            record.progress_percent = percent;
            record.progress_message = report.message;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use registry_core::TaskType;

    fn new_map_with_task(task_id: TaskId) -> TaskMap {
        let mut map = std::collections::HashMap::new();
        map.insert(task_id, TaskRecord::new(TaskType::Migration, Utc::now()));
        Arc::new(Mutex::new(map))
    }

    #[test]
    fn force_report_never_decreases_percent() {
        let id = TaskId::new();
        let tasks = new_map_with_task(id);
        let reporter = ProgressReporter::new(id, tasks.clone());
        reporter.force_report(ProgressReport::new(50, "halfway"));
        reporter.force_report(ProgressReport::new(10, "rewound"));
        let record = tasks.lock().unwrap().get(&id).unwrap().clone();
        assert_eq!(record.progress_percent, 50);
    }

    #[test]
    fn report_is_coalesced_within_the_window() {
        let id = TaskId::new();
        let tasks = new_map_with_task(id);
        let reporter = ProgressReporter::new(id, tasks.clone());
        reporter.force_report(ProgressReport::new(5, "start"));
        // Immediately-following `report` call should be dropped by the
        // coalescing window rather than overwrite the message.
        reporter.report(ProgressReport::new(6, "too soon"));
        let record = tasks.lock().unwrap().get(&id).unwrap().clone();
        assert_eq!(record.progress_message, "start");
    }
}
