//! Process table of the simulation runtime.
//!
//! Processes are plain `async` blocks returning `Result<(), SimError>`. The
//! runtime never polls them on its own initiative: a process is polled only
//! when the scheduler pops an event carrying its waker, so every resumption
//! happens in `(time, sequence)` order and the clock is already at the
//! event's timestamp when the process runs.
//!
//! Suspension points are [`crate::Timeout`] and [`crate::resource::Acquire`].
//! Both register the process's waker with the scheduler before returning
//! `Pending`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use tracing::{debug, trace};

use crate::context::SpawnedTask;
use crate::error::SimError;
use crate::logging::process_span;
use crate::types::TaskId;

/// Boxed body of a simulated process.
pub type ProcessFuture = Pin<Box<dyn Future<Output = Result<(), SimError>>>>;

/// How a process affects the run's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// An ordinary process, e.g. one patient.
    Process,
    /// A source of new processes. The run counts as `Running` while any
    /// generator is alive and as `Draining` afterwards.
    Generator,
}

/// A suspended process.
struct Task {
    name: String,
    kind: TaskKind,
    future: ProcessFuture,
}

/// Result of polling one process.
pub(crate) enum PollOutcome {
    Pending,
    Completed,
    Failed { name: String, error: SimError },
    // Stale wake for a process that already finished.
    Unknown,
}

/// All live processes of one simulation.
#[derive(Default)]
pub(crate) struct ProcessTable {
    tasks: HashMap<TaskId, Task>,
    live_generators: usize,
}

impl ProcessTable {
    pub(crate) fn insert(&mut self, spawned: SpawnedTask) {
        if spawned.kind == TaskKind::Generator {
            self.live_generators += 1;
        }
        self.tasks.insert(
            spawned.id,
            Task {
                name: spawned.name,
                kind: spawned.kind,
                future: spawned.future,
            },
        );
    }

    /// Poll `id` once with `waker`, removing it if it finished.
    pub(crate) fn poll(&mut self, id: TaskId, waker: &Waker) -> PollOutcome {
        let Some(task) = self.tasks.get_mut(&id) else {
            trace!(task = %id, "Ignoring wake for finished process");
            return PollOutcome::Unknown;
        };

        let span = process_span(&task.name, id);
        let _enter = span.enter();
        trace!("Polling process");

        let mut cx = Context::from_waker(waker);
        let result = match task.future.as_mut().poll(&mut cx) {
            Poll::Pending => return PollOutcome::Pending,
            Poll::Ready(result) => result,
        };

        let Some(task) = self.tasks.remove(&id) else {
            return PollOutcome::Unknown;
        };
        if task.kind == TaskKind::Generator {
            self.live_generators -= 1;
        }
        match result {
            Ok(()) => {
                debug!(remaining = self.tasks.len(), "Process completed");
                PollOutcome::Completed
            }
            Err(error) => PollOutcome::Failed {
                name: task.name,
                error,
            },
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn live_generators(&self) -> usize {
        self.live_generators
    }

    /// Names of every live process, ordered by task id.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut ids: Vec<&TaskId> = self.tasks.keys().collect();
        ids.sort();
        ids.into_iter().map(|id| self.tasks[id].name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waker::{task_waker, ReadyQueue};

    fn spawned(id: u64, name: &str, kind: TaskKind, future: ProcessFuture) -> SpawnedTask {
        SpawnedTask {
            id: TaskId(id),
            name: name.to_string(),
            kind,
            future,
        }
    }

    #[test]
    fn test_completed_process_is_removed() {
        let ready: ReadyQueue = Default::default();
        let mut table = ProcessTable::default();
        table.insert(spawned(0, "gen", TaskKind::Generator, Box::pin(async { Ok::<(), SimError>(()) })));
        assert_eq!(table.len(), 1);
        assert_eq!(table.live_generators(), 1);

        let waker = task_waker(TaskId(0), ready);
        assert!(matches!(table.poll(TaskId(0), &waker), PollOutcome::Completed));
        assert_eq!(table.len(), 0);
        assert_eq!(table.live_generators(), 0);
        assert!(matches!(table.poll(TaskId(0), &waker), PollOutcome::Unknown));
    }

    #[test]
    fn test_failed_process_reports_name() {
        let ready: ReadyQueue = Default::default();
        let mut table = ProcessTable::default();
        table.insert(spawned(
            3,
            "patient-3",
            TaskKind::Process,
            Box::pin(async { Err::<(), SimError>(SimError::InvalidDuration(-2.0)) }),
        ));

        match table.poll(TaskId(3), &task_waker(TaskId(3), ready)) {
            PollOutcome::Failed { name, error } => {
                assert_eq!(name, "patient-3");
                assert_eq!(error, SimError::InvalidDuration(-2.0));
            }
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn test_names_sorted_by_id() {
        let mut table = ProcessTable::default();
        for (id, name) in [(2, "c"), (0, "a"), (1, "b")] {
            let body = std::future::pending::<Result<(), SimError>>();
            table.insert(spawned(id, name, TaskKind::Process, Box::pin(body)));
        }
        assert_eq!(table.names(), vec!["a", "b", "c"]);
    }
}
