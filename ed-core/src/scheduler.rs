use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;
use std::task::Waker;

use tracing::trace;

use crate::error::{EventError, SimError};
use crate::types::EventId;
use crate::SimTime;

/// Entry type stored in the scheduler: the time a suspended process should
/// resume, the sequence number that orders it among events at the same
/// instant, and the continuation itself.
///
/// The continuation is the waker of the suspended process; resuming the
/// entry wakes it and the runtime polls the process once.
pub struct EventEntry {
    id: EventId,
    time: SimTime,
    waker: Waker,
}

impl EventEntry {
    /// Sequence number of this event.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Instant at which this event fires.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Hand control back to the suspended process.
    pub fn resume(self) {
        self.waker.wake();
    }
}

impl fmt::Debug for EventEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEntry")
            .field("id", &self.id)
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.time == other.time
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordering: smallest `(time, id)` first.
///
/// `BinaryHeap` is a max-heap, so the natural ordering is reversed.
impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

type Clock = Rc<Cell<SimTime>>;

/// This struct exposes only immutable access to the simulation clock.
/// The clock itself is owned by the scheduler, while others can obtain `ClockRef`
/// to read the current simulation time.
///
/// # Example
///
/// ```
/// # use edsim_core::Scheduler;
/// let scheduler = Scheduler::default();
/// let clock_ref = scheduler.clock();
/// assert_eq!(clock_ref.time(), scheduler.time());
/// ```
#[derive(Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock.get()
    }
}

/// Scheduler keeps the current time and the set of pending events.
///
/// Events are dispatched in `(time, id)` order. Ids come from one
/// monotonically increasing counter, so events scheduled for the same
/// instant resume in the order they were scheduled.
pub struct Scheduler {
    next_event_id: u64,
    events: BinaryHeap<EventEntry>,
    clock: Clock,
    processed: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            next_event_id: 0,
            events: BinaryHeap::default(),
            clock: Rc::new(Cell::new(SimTime::zero())),
            processed: 0,
        }
    }
}

impl Scheduler {
    /// Schedules `waker` to be resumed at the absolute time `at`.
    ///
    /// Fails with [`EventError::NonCausal`] if `at` lies before the current time.
    pub fn schedule_at(&mut self, at: SimTime, waker: Waker) -> Result<EventId, SimError> {
        let now = self.time();
        if at < now {
            return Err(EventError::NonCausal {
                requested: at.as_f64(),
                current: now.as_f64(),
            }
            .into());
        }
        Ok(self.push(at, waker))
    }

    /// Schedules `waker` to be resumed `delay` units after the current time.
    pub fn schedule(&mut self, delay: f64, waker: Waker) -> Result<EventId, SimError> {
        let at = self.time().after(delay)?;
        Ok(self.push(at, waker))
    }

    /// Schedules `waker` to be resumed at the current time, after every event
    /// already pending for this instant.
    pub fn schedule_now(&mut self, waker: Waker) -> EventId {
        let now = self.time();
        self.push(now, waker)
    }

    fn push(&mut self, time: SimTime, waker: Waker) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        trace!(event_id = %id, time = %time, "Event scheduled");
        self.events.push(EventEntry { id, time, waker });
        id
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock.get()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Rc::clone(&self.clock),
        }
    }

    /// Returns a reference to the next scheduled event or `None` if none are left.
    pub fn peek(&self) -> Option<&EventEntry> {
        self.events.peek()
    }

    /// Removes the next scheduled event and advances the clock to its time.
    ///
    /// Returns `Ok(None)` when no events are left. An event stamped before the
    /// current time is an invariant violation and is reported as
    /// [`EventError::NonCausal`] without moving the clock.
    pub fn pop(&mut self) -> Result<Option<EventEntry>, SimError> {
        let Some(entry) = self.events.pop() else {
            return Ok(None);
        };
        let now = self.time();
        if entry.time < now {
            return Err(EventError::NonCausal {
                requested: entry.time.as_f64(),
                current: now.as_f64(),
            }
            .into());
        }
        self.clock.set(entry.time);
        self.processed += 1;
        Ok(Some(entry))
    }

    /// Returns `true` if no events are pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Number of events popped so far.
    pub fn events_processed(&self) -> u64 {
        self.processed
    }

    /// The id the next scheduled event will receive.
    pub fn next_event_id(&self) -> EventId {
        EventId(self.next_event_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::waker::{drain_ready, task_waker, ReadyQueue};
    use crate::TaskId;

    fn t(value: f64) -> SimTime {
        SimTime::new(value).unwrap()
    }

    #[test]
    fn test_clock_ref() {
        let clock = Clock::new(Cell::new(t(1.0)));
        let clock_ref = ClockRef::from(clock);
        assert_eq!(clock_ref.time(), t(1.0));
    }

    #[test]
    fn test_fifo_at_same_time() {
        let ready: ReadyQueue = Default::default();
        let mut scheduler = Scheduler::default();

        for task in 0..3 {
            scheduler
                .schedule_at(t(10.0), task_waker(TaskId(task), ready.clone()))
                .unwrap();
        }

        let mut ids = Vec::new();
        while let Some(entry) = scheduler.pop().unwrap() {
            ids.push(entry.id());
            entry.resume();
        }

        assert_eq!(ids, vec![EventId(0), EventId(1), EventId(2)]);
        assert_eq!(drain_ready(&ready), vec![TaskId(0), TaskId(1), TaskId(2)]);
    }

    #[test]
    fn test_time_ordering_advances_clock() {
        let ready: ReadyQueue = Default::default();
        let mut scheduler = Scheduler::default();
        assert_eq!(scheduler.time(), SimTime::zero());
        assert!(scheduler.is_empty());

        scheduler.schedule_at(t(30.0), task_waker(TaskId(0), ready.clone())).unwrap();
        scheduler.schedule_at(t(10.0), task_waker(TaskId(1), ready.clone())).unwrap();
        scheduler.schedule(20.0, task_waker(TaskId(2), ready.clone())).unwrap();
        assert_eq!(scheduler.len(), 3);

        let clock = scheduler.clock();
        let mut times = Vec::new();
        while let Some(entry) = scheduler.pop().unwrap() {
            assert_eq!(clock.time(), entry.time());
            times.push(entry.time().as_f64());
        }

        assert_eq!(times, vec![10.0, 20.0, 30.0]);
        assert_eq!(scheduler.time(), t(30.0));
        assert_eq!(scheduler.events_processed(), 3);
    }

    #[test]
    fn test_schedule_is_relative_to_clock() {
        let ready: ReadyQueue = Default::default();
        let mut scheduler = Scheduler::default();

        scheduler.schedule_at(t(5.0), task_waker(TaskId(0), ready.clone())).unwrap();
        scheduler.pop().unwrap();

        scheduler.schedule(2.0, task_waker(TaskId(0), ready.clone())).unwrap();
        let entry = scheduler.pop().unwrap().unwrap();
        assert_eq!(entry.time(), t(7.0));
    }

    #[test]
    fn test_schedule_in_past_is_rejected() {
        let ready: ReadyQueue = Default::default();
        let mut scheduler = Scheduler::default();
        scheduler.schedule_at(t(10.0), task_waker(TaskId(0), ready.clone())).unwrap();
        scheduler.pop().unwrap();

        let err = scheduler
            .schedule_at(t(3.0), task_waker(TaskId(0), ready.clone()))
            .unwrap_err();
        assert_eq!(
            err,
            SimError::Event(EventError::NonCausal { requested: 3.0, current: 10.0 })
        );
        assert!(scheduler.schedule(-1.0, task_waker(TaskId(0), ready)).is_err());
    }

    #[test]
    fn test_schedule_now_goes_after_pending_same_instant_events() {
        let ready: ReadyQueue = Default::default();
        let mut scheduler = Scheduler::default();
        scheduler.schedule_at(SimTime::zero(), task_waker(TaskId(0), ready.clone())).unwrap();
        scheduler.schedule_now(task_waker(TaskId(1), ready.clone()));

        scheduler.pop().unwrap().unwrap().resume();
        scheduler.schedule_now(task_waker(TaskId(2), ready.clone()));
        while let Some(entry) = scheduler.pop().unwrap() {
            entry.resume();
        }

        assert_eq!(drain_ready(&ready), vec![TaskId(0), TaskId(1), TaskId(2)]);
    }

    #[test]
    fn test_event_entry_cmp() {
        let ready: ReadyQueue = Default::default();
        let entry = |id: u64, time: f64| EventEntry {
            id: EventId(id),
            time: t(time),
            waker: task_waker(TaskId(0), ready.clone()),
        };

        // Earlier time wins, so it compares greater in the reversed ordering.
        assert_eq!(entry(5, 0.0).cmp(&entry(1, 1.0)), Ordering::Greater);
        // Same time: lower id wins.
        assert_eq!(entry(0, 1.0).cmp(&entry(1, 1.0)), Ordering::Greater);
        assert_eq!(entry(3, 2.0).cmp(&entry(1, 1.0)), Ordering::Less);
    }

    #[test]
    fn test_empty_scheduler() {
        let mut scheduler = Scheduler::default();
        assert!(scheduler.peek().is_none());
        assert!(scheduler.pop().unwrap().is_none());
        assert_eq!(scheduler.next_event_id(), EventId(0));
    }
}
