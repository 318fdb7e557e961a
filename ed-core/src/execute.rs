use crate::error::SimError;
use crate::{SimTime, Simulation};

/// Simulation execution trait.
pub trait Execute {
    /// Executes the simulation until some stopping condition is reached.
    /// The condition is implementation-specific.
    ///
    /// The first error raised by a process aborts execution and is returned.
    fn execute(self, sim: &mut Simulation) -> Result<(), SimError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndCondition {
    Time(SimTime),
    NoEvents,
    Steps(usize),
}

/// Executor is used for simple execution of an entire simulation.
///
/// See the crate level documentation for examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    end_condition: EndCondition,
}

impl Executor {
    /// Simulation will end only once there is no available events in the queue.
    #[must_use]
    pub fn unbound() -> Self {
        Self {
            end_condition: EndCondition::NoEvents,
        }
    }

    /// Simulation will process every event up to and including `time`, and
    /// stop before the first event scheduled later than that.
    /// It may terminate early if no events are available.
    #[must_use]
    pub fn timed(time: SimTime) -> Self {
        Self {
            end_condition: EndCondition::Time(time),
        }
    }

    /// Simulation will execute exactly this many steps, unless we run out of events.
    #[must_use]
    pub fn steps(steps: usize) -> Self {
        Self {
            end_condition: EndCondition::Steps(steps),
        }
    }

    /// Registers a side effect that is called _after_ each simulation step.
    #[must_use]
    pub fn side_effect<F>(self, func: F) -> ExecutorWithSideEffect<F>
    where
        F: Fn(&Simulation),
    {
        ExecutorWithSideEffect {
            end_condition: self.end_condition,
            side_effect: func,
        }
    }
}

impl Execute for Executor {
    fn execute(self, sim: &mut Simulation) -> Result<(), SimError> {
        run_with(sim, self.end_condition, |_| {})
    }
}

pub struct ExecutorWithSideEffect<F>
where
    F: Fn(&Simulation),
{
    end_condition: EndCondition,
    side_effect: F,
}

impl<F> Execute for ExecutorWithSideEffect<F>
where
    F: Fn(&Simulation),
{
    fn execute(self, sim: &mut Simulation) -> Result<(), SimError> {
        run_with(sim, self.end_condition, self.side_effect)
    }
}

fn run_with<F>(sim: &mut Simulation, end_condition: EndCondition, side_effect: F) -> Result<(), SimError>
where
    F: Fn(&Simulation),
{
    let step_fn = |sim: &mut Simulation| -> Result<bool, SimError> {
        let stepped = sim.step()?;
        if stepped {
            side_effect(sim);
        }
        Ok(stepped)
    };
    match end_condition {
        EndCondition::Time(time) => execute_until(sim, time, step_fn),
        EndCondition::NoEvents => execute_until_empty(sim, step_fn),
        EndCondition::Steps(steps) => execute_steps(sim, steps, step_fn),
    }
}

fn execute_until_empty<F>(sim: &mut Simulation, step: F) -> Result<(), SimError>
where
    F: Fn(&mut Simulation) -> Result<bool, SimError>,
{
    while step(sim)? {}
    Ok(())
}

fn execute_until<F>(sim: &mut Simulation, time: SimTime, step: F) -> Result<(), SimError>
where
    F: Fn(&mut Simulation) -> Result<bool, SimError>,
{
    while sim.peek_next_event_time().is_some_and(|t| t <= time) {
        step(sim)?;
    }
    if sim.peek_next_event_time().is_none() {
        // Nothing left at all: let the simulation settle into `Terminated`.
        step(sim)?;
    }
    Ok(())
}

fn execute_steps<F>(sim: &mut Simulation, steps: usize, step: F) -> Result<(), SimError>
where
    F: Fn(&mut Simulation) -> Result<bool, SimError>,
{
    for _ in 0..steps {
        if !step(sim)? {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::SimulationState;
    use std::cell::Cell;
    use std::rc::Rc;

    fn t(value: f64) -> SimTime {
        SimTime::new(value).unwrap()
    }

    /// A process ticking every 2 time units, ten times in total.
    fn ticking_sim(counter: Rc<Cell<usize>>) -> Simulation {
        let mut sim = Simulation::default();
        let ctx = sim.context();
        sim.spawn("ticker", async move {
            loop {
                counter.set(counter.get() + 1);
                if counter.get() >= 10 {
                    return Ok(());
                }
                ctx.timeout(2.0).await?;
            }
        });
        sim
    }

    #[test]
    fn test_create_executor() {
        assert_eq!(
            Executor::unbound(),
            Executor {
                end_condition: EndCondition::NoEvents
            }
        );
        assert_eq!(
            Executor::timed(SimTime::zero()),
            Executor {
                end_condition: EndCondition::Time(SimTime::zero())
            }
        );
        assert_eq!(
            Executor::steps(7),
            Executor {
                end_condition: EndCondition::Steps(7)
            }
        );
    }

    #[test]
    fn test_steps() {
        let counter = Rc::new(Cell::new(0));
        let mut sim = ticking_sim(counter.clone());
        Executor::steps(10).execute(&mut sim).unwrap();
        assert_eq!(counter.get(), 10);
    }

    #[test]
    fn test_steps_stops_before() {
        let counter = Rc::new(Cell::new(0));
        let mut sim = ticking_sim(counter.clone());
        // After 10 steps there are no events, so it will not execute all 100
        Executor::steps(100).execute(&mut sim).unwrap();
        assert_eq!(counter.get(), 10);
        assert_eq!(sim.state(), SimulationState::Terminated);
    }

    #[test]
    fn test_timed() {
        let counter = Rc::new(Cell::new(0));
        let mut sim = ticking_sim(counter.clone());
        Executor::timed(t(6.0)).execute(&mut sim).unwrap();
        assert_eq!(counter.get(), 4);
        assert_eq!(sim.time(), t(6.0));
        assert_eq!(sim.peek_next_event_time(), Some(t(8.0)));
    }

    #[test]
    fn test_timed_clock_stops_early() {
        let counter = Rc::new(Cell::new(0));
        let mut sim = ticking_sim(counter.clone());
        Executor::timed(t(5.0)).execute(&mut sim).unwrap();
        assert_eq!(counter.get(), 3);
        assert_eq!(sim.time(), t(4.0));
    }

    #[test]
    fn test_timed_past_last_event_terminates() {
        let counter = Rc::new(Cell::new(0));
        let mut sim = ticking_sim(counter.clone());
        Executor::timed(t(100.0)).execute(&mut sim).unwrap();
        assert_eq!(counter.get(), 10);
        assert_eq!(sim.time(), t(18.0));
        assert_eq!(sim.state(), SimulationState::Terminated);
    }

    #[test]
    fn test_side_effect_runs_after_each_step() {
        let counter = Rc::new(Cell::new(0));
        let mut sim = ticking_sim(counter);
        let observed = Cell::new(0);
        Executor::unbound()
            .side_effect(|_| observed.set(observed.get() + 1))
            .execute(&mut sim)
            .unwrap();
        assert_eq!(observed.get(), 10);
    }

    #[test]
    fn test_error_aborts_execution() {
        let mut sim = Simulation::default();
        let ctx = sim.context();
        sim.spawn("bad", async move { ctx.timeout(-1.0).await });
        let err = Executor::unbound().execute(&mut sim).unwrap_err();
        assert_eq!(err, SimError::InvalidDuration(-1.0));
    }
}
