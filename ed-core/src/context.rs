//! Per-run simulation context.
//!
//! A [`SimContext`] is a cheap, cloneable handle on the state shared by every
//! process of one run: the scheduler (and with it the clock), the random
//! source and the queue of newly spawned processes. It is handed to processes
//! explicitly; nothing here is global, so two simulations on the same thread
//! never observe each other.
//!
//! # Example
//!
//! ```
//! use edsim_core::{Simulation, SimTime};
//!
//! let mut sim = Simulation::new(42);
//! let ctx = sim.context();
//! sim.spawn("sleeper", {
//!     let ctx = ctx.clone();
//!     async move {
//!         ctx.timeout(5.0).await?;
//!         assert_eq!(ctx.now(), SimTime::new(5.0)?);
//!         Ok(())
//!     }
//! });
//! sim.run().unwrap();
//! ```

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use tracing::debug;

use crate::async_runtime::{ProcessFuture, TaskKind};
use crate::dists::{ArrivalPattern, ServiceTimeDistribution};
use crate::error::SimError;
use crate::randomness::SimRng;
use crate::scheduler::{ClockRef, Scheduler};
use crate::types::{EventId, TaskId};
use crate::waker::{drain_ready, task_waker, ReadyQueue};
use crate::SimTime;

/// A process spawned but not yet picked up by the runtime.
pub(crate) struct SpawnedTask {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) kind: TaskKind,
    pub(crate) future: ProcessFuture,
}

struct Shared {
    scheduler: RefCell<Scheduler>,
    rng: RefCell<SimRng>,
    spawned: RefCell<Vec<SpawnedTask>>,
    next_task_id: Cell<u64>,
    ready: ReadyQueue,
}

/// Cloneable handle on the state of one simulation run.
#[derive(Clone)]
pub struct SimContext {
    shared: Rc<Shared>,
}

impl SimContext {
    pub(crate) fn new(rng: SimRng) -> Self {
        Self {
            shared: Rc::new(Shared {
                scheduler: RefCell::new(Scheduler::default()),
                rng: RefCell::new(rng),
                spawned: RefCell::new(Vec::new()),
                next_task_id: Cell::new(0),
                ready: ReadyQueue::default(),
            }),
        }
    }

    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.shared.scheduler.borrow().time()
    }

    /// Read-only view of the clock.
    pub fn clock(&self) -> ClockRef {
        self.shared.scheduler.borrow().clock()
    }

    /// Seed of this run's random source.
    pub fn seed(&self) -> u64 {
        self.shared.rng.borrow().seed()
    }

    /// Number of events waiting in the scheduler.
    pub fn pending_events(&self) -> usize {
        self.shared.scheduler.borrow().len()
    }

    /// Suspend the calling process for `delay` time units.
    ///
    /// A zero delay still yields: the process resumes at the same instant,
    /// after every event already pending for it.
    pub fn timeout(&self, delay: f64) -> Timeout {
        Timeout::new(self.clone(), Deadline::After(delay))
    }

    /// Suspend the calling process until the clock reads `at`.
    ///
    /// Resolves to [`crate::EventError::NonCausal`] if `at` already lies in the past.
    pub fn timeout_until(&self, at: SimTime) -> Timeout {
        Timeout::new(self.clone(), Deadline::At(at))
    }

    /// Start a new process at the current time.
    ///
    /// The process is queued behind everything already pending for this
    /// instant and runs until its first suspension point when its turn comes.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> TaskId
    where
        F: Future<Output = Result<(), SimError>> + 'static,
    {
        self.spawn_task(name.into(), TaskKind::Process, Box::pin(future))
    }

    /// Start a new generator process, see [`TaskKind::Generator`].
    pub fn spawn_generator<F>(&self, name: impl Into<String>, future: F) -> TaskId
    where
        F: Future<Output = Result<(), SimError>> + 'static,
    {
        self.spawn_task(name.into(), TaskKind::Generator, Box::pin(future))
    }

    fn spawn_task(&self, name: String, kind: TaskKind, future: ProcessFuture) -> TaskId {
        let id = TaskId(self.shared.next_task_id.get());
        self.shared.next_task_id.set(id.0 + 1);

        let event = self.schedule_now(self.waker_for(id));
        debug!(task = %id, name = %name, ?kind, start_event = %event, "Spawned process");

        self.shared.spawned.borrow_mut().push(SpawnedTask {
            id,
            name,
            kind,
            future,
        });
        id
    }

    /// Run `f` with exclusive access to the random source.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut SimRng) -> T) -> T {
        f(&mut self.shared.rng.borrow_mut())
    }

    /// Draw one service time.
    pub fn service_time(&self, dist: &dyn ServiceTimeDistribution) -> f64 {
        self.with_rng(|rng| rng.service_time(dist))
    }

    /// Draw one inter-arrival gap.
    pub fn interarrival(&self, pattern: &dyn ArrivalPattern) -> f64 {
        self.with_rng(|rng| rng.interarrival(pattern))
    }

    pub(crate) fn schedule_at(&self, at: SimTime, waker: Waker) -> Result<EventId, SimError> {
        self.shared.scheduler.borrow_mut().schedule_at(at, waker)
    }

    pub(crate) fn schedule_now(&self, waker: Waker) -> EventId {
        self.shared.scheduler.borrow_mut().schedule_now(waker)
    }

    pub(crate) fn with_scheduler<T>(&self, f: impl FnOnce(&mut Scheduler) -> T) -> T {
        f(&mut self.shared.scheduler.borrow_mut())
    }

    pub(crate) fn waker_for(&self, task: TaskId) -> Waker {
        task_waker(task, self.shared.ready.clone())
    }

    pub(crate) fn take_ready(&self) -> Vec<TaskId> {
        drain_ready(&self.shared.ready)
    }

    pub(crate) fn spawned_len(&self) -> usize {
        self.shared.spawned.borrow().len()
    }

    pub(crate) fn take_spawned(&self) -> Vec<SpawnedTask> {
        std::mem::take(&mut *self.shared.spawned.borrow_mut())
    }
}

#[derive(Debug, Clone, Copy)]
enum Deadline {
    After(f64),
    At(SimTime),
}

/// A future that completes once the clock reaches its deadline.
///
/// Created by [`SimContext::timeout`] and [`SimContext::timeout_until`].
#[must_use = "a timeout does nothing unless awaited"]
pub struct Timeout {
    ctx: SimContext,
    deadline: Deadline,
    target: Option<SimTime>,
}

impl Timeout {
    fn new(ctx: SimContext, deadline: Deadline) -> Self {
        Self {
            ctx,
            deadline,
            target: None,
        }
    }
}

impl Future for Timeout {
    type Output = Result<(), SimError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let now = self.ctx.now();
        match self.target {
            Some(target) if now >= target => Poll::Ready(Ok(())),
            Some(_) => Poll::Pending,
            None => {
                let target = match self.deadline {
                    Deadline::After(delay) => match now.after(delay) {
                        Ok(target) => target,
                        Err(e) => return Poll::Ready(Err(e)),
                    },
                    Deadline::At(at) => at,
                };
                if let Err(e) = self.ctx.schedule_at(target, cx.waker().clone()) {
                    return Poll::Ready(Err(e));
                }
                self.target = Some(target);
                Poll::Pending
            }
        }
    }
}
