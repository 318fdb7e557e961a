//! Core discrete event simulation engine.
//!
//! This crate provides the building blocks for process-oriented discrete
//! event simulation: simulated time, an event scheduler with deterministic
//! tie-breaking, a single-threaded runtime for `async` process bodies, FIFO
//! resources, distributions and a seeded random source.
//!
//! # Architecture Overview
//!
//! - [`Simulation`]: owns the process table and drives the event loop. Use it
//!   to spawn the initial processes and run to completion.
//! - [`SimContext`]: a cloneable handle on one run's clock, scheduler and
//!   random source. Processes capture it to wait, draw random numbers and
//!   spawn further processes.
//! - [`Resource`]: a finite-capacity unit pool with a FIFO waiting queue.
//!
//! # Basic Usage
//!
//! ```rust
//! use edsim_core::{Resource, Simulation};
//!
//! let mut sim = Simulation::new(7);
//! let ctx = sim.context();
//! let desk = Resource::new(&ctx, "desk", 1).unwrap();
//!
//! for i in 0..3 {
//!     let (ctx, desk) = (ctx.clone(), desk.clone());
//!     sim.spawn(format!("customer-{i}"), async move {
//!         let permit = desk.acquire().await;
//!         ctx.timeout(1.5).await?;
//!         permit.release()
//!     });
//! }
//!
//! let report = sim.run().unwrap();
//! assert_eq!(report.final_time.as_f64(), 4.5);
//! ```
//!
//! # Time Model
//!
//! All timing uses [`SimTime`], which represents simulation time (not
//! wall-clock time). Events at the same instant run in the order they were
//! scheduled, so a run is fully determined by its seed.

pub mod async_runtime;
pub mod context;
pub mod dists;
pub mod error;
pub mod execute;
pub mod logging;
pub mod randomness;
pub mod resource;
pub mod scheduler;
pub mod time;
pub mod types;
mod waker;

use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use crate::async_runtime::{PollOutcome, ProcessTable};
use crate::logging::{diagnostics, events, simulation_span};

pub use async_runtime::{ProcessFuture, TaskKind};
pub use context::{SimContext, Timeout};
pub use dists::{
    ArrivalPattern, Chance, ConstantServiceTime, PoissonArrivals, ServiceTimeDistribution,
    Triangular, TriangularParams, WeightedChoice,
};
pub use error::{DistributionError, EventError, ResourceError, SimError};
pub use execute::{Execute, Executor};
pub use logging::{
    init_detailed_simulation_logging, init_simulation_logging, init_simulation_logging_with_level,
    process_span,
};
pub use randomness::SimRng;
pub use resource::{Acquire, Permit, Resource, ResourceStats};
pub use scheduler::{ClockRef, EventEntry, Scheduler};
pub use time::SimTime;
pub use types::{EventId, TaskId};

/// Lifecycle of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimulationState {
    /// Nothing has been executed yet.
    Idle,
    /// At least one generator process is still alive.
    Running,
    /// All generators have finished; remaining events are being processed.
    Draining,
    /// The event queue ran dry. Final.
    Terminated,
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimulationState::Idle => "idle",
            SimulationState::Running => "running",
            SimulationState::Draining => "draining",
            SimulationState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Summary of an executed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub final_time: SimTime,
    pub events_processed: u64,
    /// Processes still suspended when the run terminated.
    pub stranded_processes: usize,
    pub state: SimulationState,
}

/// Simulation struct that puts the scheduler, the random source and the
/// processes together.
///
/// See the [crate-level documentation](index.html) for more information.
pub struct Simulation {
    ctx: SimContext,
    processes: ProcessTable,
    state: SimulationState,
    stranded: usize,
}

impl Default for Simulation {
    /// A simulation seeded with `0`.
    fn default() -> Self {
        Self::new(0)
    }
}

impl Simulation {
    /// Create a simulation whose random source is seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self::with_rng(SimRng::seeded(seed))
    }

    /// Create a simulation with a fresh random seed; see [`Simulation::seed`].
    pub fn from_entropy() -> Self {
        Self::with_rng(SimRng::from_entropy())
    }

    fn with_rng(rng: SimRng) -> Self {
        Self {
            ctx: SimContext::new(rng),
            processes: ProcessTable::default(),
            state: SimulationState::Idle,
            stranded: 0,
        }
    }

    /// Returns a handle on this run's clock, scheduler and random source.
    #[must_use]
    pub fn context(&self) -> SimContext {
        self.ctx.clone()
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.ctx.now()
    }

    /// Returns a ClockRef for reading the simulation time.
    pub fn clock(&self) -> ClockRef {
        self.ctx.clock()
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// The seed the random source was created with.
    pub fn seed(&self) -> u64 {
        self.ctx.seed()
    }

    /// Start a process at the current time. See [`SimContext::spawn`].
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> TaskId
    where
        F: std::future::Future<Output = Result<(), SimError>> + 'static,
    {
        self.ctx.spawn(name, future)
    }

    /// Start a generator process. See [`SimContext::spawn_generator`].
    pub fn spawn_generator<F>(&mut self, name: impl Into<String>, future: F) -> TaskId
    where
        F: std::future::Future<Output = Result<(), SimError>> + 'static,
    {
        self.ctx.spawn_generator(name, future)
    }

    /// Number of processes spawned and not yet finished.
    pub fn live_processes(&self) -> usize {
        self.processes.len() + self.ctx.spawned_len()
    }

    /// Returns the time of the next scheduled event, or None if no events are scheduled.
    pub fn peek_next_event_time(&self) -> Option<SimTime> {
        self.ctx.with_scheduler(|s| s.peek().map(|e| e.time()))
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        self.ctx.pending_events() > 0
    }

    pub fn events_processed(&self) -> u64 {
        self.ctx.with_scheduler(|s| s.events_processed())
    }

    /// Performs one step of the simulation: pops the next event, advances the
    /// clock and resumes the process waiting on it until its next suspension
    /// point.
    ///
    /// Returns `Ok(true)` if an event was processed and `Ok(false)` once the
    /// simulation has terminated. A process error terminates the run and is
    /// returned.
    pub fn step(&mut self) -> Result<bool, SimError> {
        if self.state == SimulationState::Terminated {
            return Ok(false);
        }
        self.absorb_spawned();
        if self.state == SimulationState::Idle {
            self.update_state();
        }

        let event = match self.ctx.with_scheduler(|s| s.pop()) {
            Ok(event) => event,
            Err(error) => {
                self.set_state(SimulationState::Terminated);
                return Err(error);
            }
        };
        let Some(event) = event else {
            self.terminate();
            return Ok(false);
        };

        trace!(event_id = %event.id(), time = %event.time(), "Processing simulation step");
        event.resume();

        for task in self.ctx.take_ready() {
            let waker = self.ctx.waker_for(task);
            if let PollOutcome::Failed { name, error } = self.processes.poll(task, &waker) {
                diagnostics::run_aborted(&name, &error, self.time());
                self.set_state(SimulationState::Terminated);
                return Err(error);
            }
        }

        self.absorb_spawned();

        // Wakes raised while polling become events at the current instant.
        for task in self.ctx.take_ready() {
            self.ctx.schedule_now(self.ctx.waker_for(task));
        }

        self.update_state();
        Ok(true)
    }

    /// Runs the simulation with the given executor.
    ///
    /// The stopping condition and other execution details depend on the executor used.
    /// See [`Execute`] and [`Executor`] for more details.
    pub fn execute<E: Execute>(&mut self, executor: E) -> Result<RunReport, SimError> {
        let span = simulation_span("simulation", self.seed());
        let _enter = span.enter();

        events::simulation_started(self.seed(), None);
        executor.execute(self)?;
        events::simulation_completed(self.time(), self.events_processed());

        Ok(self.report())
    }

    /// Runs the simulation until no events are left.
    pub fn run(&mut self) -> Result<RunReport, SimError> {
        self.execute(Executor::unbound())
    }

    /// Summary of the run so far.
    pub fn report(&self) -> RunReport {
        RunReport {
            seed: self.seed(),
            final_time: self.time(),
            events_processed: self.events_processed(),
            stranded_processes: self.stranded,
            state: self.state,
        }
    }

    fn absorb_spawned(&mut self) {
        for spawned in self.ctx.take_spawned() {
            self.processes.insert(spawned);
        }
    }

    fn update_state(&mut self) {
        let next = if self.processes.live_generators() > 0 {
            SimulationState::Running
        } else {
            SimulationState::Draining
        };
        self.set_state(next);
    }

    fn terminate(&mut self) {
        self.stranded = self.processes.len();
        if self.stranded > 0 {
            diagnostics::stranded_processes(&self.processes.names(), self.time());
        }
        self.set_state(SimulationState::Terminated);
    }

    fn set_state(&mut self, next: SimulationState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, time = %self.time(), "Simulation state changed");
            self.state = next;
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        // Unabsorbed process bodies hold the context they live in.
        drop(self.ctx.take_spawned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_state_display() {
        assert_eq!(SimulationState::Idle.to_string(), "idle");
        assert_eq!(SimulationState::Terminated.to_string(), "terminated");
    }

    #[test]
    fn test_empty_simulation_terminates() {
        let mut sim = Simulation::default();
        assert_eq!(sim.state(), SimulationState::Idle);
        assert!(!sim.step().unwrap());
        assert_eq!(sim.state(), SimulationState::Terminated);
        assert!(!sim.step().unwrap());
    }

    #[test]
    fn test_generator_keeps_run_in_running_state() {
        let mut sim = Simulation::new(3);
        let ctx = sim.context();
        let states = Rc::new(RefCell::new(Vec::new()));

        sim.spawn_generator("gen", {
            let ctx = ctx.clone();
            async move {
                ctx.timeout(1.0).await?;
                ctx.spawn("child", {
                    let ctx = ctx.clone();
                    async move { ctx.timeout(5.0).await }
                });
                Ok(())
            }
        });

        while sim.step().unwrap() {
            states.borrow_mut().push(sim.state());
        }

        assert_eq!(
            *states.borrow(),
            vec![
                SimulationState::Running,
                SimulationState::Draining,
                SimulationState::Draining,
                SimulationState::Draining,
            ]
        );
        assert_eq!(sim.state(), SimulationState::Terminated);
        assert_eq!(sim.time(), SimTime::new(6.0).unwrap());
    }

    #[test]
    fn test_report() {
        let mut sim = Simulation::new(11);
        let ctx = sim.context();
        sim.spawn("p", async move { ctx.timeout(2.5).await });
        let report = sim.run().unwrap();
        assert_eq!(report.seed, 11);
        assert_eq!(report.final_time, SimTime::new(2.5).unwrap());
        assert_eq!(report.events_processed, 2);
        assert_eq!(report.stranded_processes, 0);
        assert_eq!(report.state, SimulationState::Terminated);
    }
}
