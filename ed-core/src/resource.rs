//! Finite-capacity resource with a FIFO waiting queue.
//!
//! A [`Resource`] hands out at most `capacity` units at a time. Requests that
//! cannot be served immediately wait in arrival order; every release passes
//! the freed unit straight to the head of the queue, so a later request can
//! never overtake an earlier one.
//!
//! Grants are always delivered through the scheduler: even an immediate grant
//! yields once, so every process requesting at the same instant resumes in
//! the order it was scheduled.
//!
//! ```rust,ignore
//! let desk = Resource::new(&ctx, "registration", 1)?;
//! let permit = desk.acquire().await;
//! ctx.timeout(0.5).await?;
//! permit.release()?;
//! ```

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use serde::Serialize;
use tracing::{error, trace};

use crate::context::SimContext;
use crate::error::{ResourceError, SimError};
use crate::SimTime;

/// Usage counters collected over the lifetime of a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceStats {
    /// Units handed out.
    pub grants: u64,
    /// Highest number of simultaneous holders observed.
    pub peak_held: usize,
    /// Longest waiting queue observed.
    pub peak_queue: usize,
    /// Sum over all grants of the time spent between request and grant.
    pub total_wait: f64,
}

impl ResourceStats {
    /// Mean waiting time per grant, 0 when nothing was granted.
    pub fn mean_wait(&self) -> f64 {
        if self.grants == 0 {
            0.0
        } else {
            self.total_wait / self.grants as f64
        }
    }
}

struct Waiter {
    waiter_id: u64,
    requested_at: SimTime,
    waker: Waker,
}

struct State {
    capacity: usize,
    held: usize,
    next_waiter_id: u64,

    // FIFO queue of outstanding requests.
    queue: VecDeque<Waiter>,

    // Waiters that were handed a unit and removed from the queue, but whose
    // futures have not yet observed the grant.
    granted: HashSet<u64>,

    stats: ResourceStats,
}

impl State {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            held: 0,
            next_waiter_id: 0,
            queue: VecDeque::new(),
            granted: HashSet::new(),
            stats: ResourceStats::default(),
        }
    }

    fn grant_locked(&mut self, waited: f64) {
        self.held += 1;
        self.stats.grants += 1;
        self.stats.total_wait += waited;
        self.stats.peak_held = self.stats.peak_held.max(self.held);
    }

    /// Give back one unit. If anyone is waiting, the unit moves to the head
    /// of the queue and its waker is returned for scheduling.
    fn release_locked(&mut self, now: SimTime) -> Result<Option<Waker>, ()> {
        if self.held == 0 {
            return Err(());
        }
        self.held -= 1;

        let Some(waiter) = self.queue.pop_front() else {
            return Ok(None);
        };
        self.grant_locked(now - waiter.requested_at);
        self.granted.insert(waiter.waiter_id);
        Ok(Some(waiter.waker))
    }

    fn remove_waiter_locked(&mut self, waiter_id: u64) -> Option<Waiter> {
        let pos = self.queue.iter().position(|w| w.waiter_id == waiter_id)?;
        self.queue.remove(pos)
    }
}

/// A shared, finite-capacity resource.
///
/// Cloning yields another handle on the same units and queue.
#[derive(Clone)]
pub struct Resource {
    name: Rc<str>,
    state: Rc<RefCell<State>>,
    ctx: SimContext,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("capacity", &state.capacity)
            .field("held", &state.held)
            .field("queued", &state.queue.len())
            .finish()
    }
}

impl Resource {
    /// Create a resource with `capacity` units.
    ///
    /// A capacity of zero is rejected with [`ResourceError::ZeroCapacity`].
    pub fn new(ctx: &SimContext, name: impl Into<String>, capacity: usize) -> Result<Self, SimError> {
        let name: String = name.into();
        if capacity == 0 {
            return Err(ResourceError::ZeroCapacity { resource: name }.into());
        }
        Ok(Self {
            name: Rc::from(name),
            state: Rc::new(RefCell::new(State::new(capacity))),
            ctx: ctx.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.state.borrow().capacity
    }

    /// Units currently held.
    pub fn held(&self) -> usize {
        self.state.borrow().held
    }

    /// Requests currently waiting for a unit.
    pub fn queue_len(&self) -> usize {
        self.state.borrow().queue.len()
    }

    pub fn stats(&self) -> ResourceStats {
        self.state.borrow().stats.clone()
    }

    /// Request one unit.
    ///
    /// The returned future resolves to a [`Permit`] once the unit is granted.
    /// Dropping the future before that gives up the place in the queue (or
    /// the unit, if it was already handed over).
    pub fn acquire(&self) -> Acquire {
        Acquire {
            resource: self.clone(),
            stage: Stage::Init,
        }
    }

    /// Give back one unit, handing it to the earliest waiter if there is one.
    ///
    /// The woken waiter resumes at the current time, after every event
    /// already pending for this instant. Releasing a resource nobody holds
    /// fails with [`ResourceError::ReleaseWithoutHolder`].
    pub fn release(&self) -> Result<(), SimError> {
        let now = self.ctx.now();
        let next = self.state.borrow_mut().release_locked(now).map_err(|()| {
            ResourceError::ReleaseWithoutHolder {
                resource: self.name.to_string(),
            }
        })?;

        trace!(resource = %self.name, time = %now, handed_over = next.is_some(), "Resource released");
        if let Some(waker) = next {
            self.ctx.schedule_now(waker);
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Stage {
    Init,
    // Granted on the first poll; waiting for the yield event.
    Yielding,
    Queued(u64),
    Done,
}

/// Future returned by [`Resource::acquire`].
#[must_use = "a resource request does nothing unless awaited"]
pub struct Acquire {
    resource: Resource,
    stage: Stage,
}

impl Acquire {
    fn permit(&mut self) -> Permit {
        self.stage = Stage::Done;
        Permit {
            resource: self.resource.clone(),
            released: false,
        }
    }
}

impl Future for Acquire {
    type Output = Permit;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let now = self.resource.ctx.now();
        match self.stage {
            Stage::Init => {
                let mut state = self.resource.state.borrow_mut();
                if state.queue.is_empty() && state.held < state.capacity {
                    state.grant_locked(0.0);
                    drop(state);
                    trace!(resource = %self.resource.name, time = %now, "Resource granted");
                    self.resource.ctx.schedule_now(cx.waker().clone());
                    self.stage = Stage::Yielding;
                } else {
                    let waiter_id = state.next_waiter_id;
                    state.next_waiter_id += 1;
                    state.queue.push_back(Waiter {
                        waiter_id,
                        requested_at: now,
                        waker: cx.waker().clone(),
                    });
                    state.stats.peak_queue = state.stats.peak_queue.max(state.queue.len());
                    drop(state);
                    trace!(resource = %self.resource.name, time = %now, waiter_id, "Resource request queued");
                    self.stage = Stage::Queued(waiter_id);
                }
                Poll::Pending
            }
            Stage::Yielding => Poll::Ready(self.permit()),
            Stage::Queued(waiter_id) => {
                let mut state = self.resource.state.borrow_mut();
                if state.granted.remove(&waiter_id) {
                    drop(state);
                    trace!(resource = %self.resource.name, time = %now, waiter_id, "Resource granted");
                    return Poll::Ready(self.permit());
                }
                if let Some(w) = state.queue.iter_mut().find(|w| w.waiter_id == waiter_id) {
                    w.waker = cx.waker().clone();
                }
                Poll::Pending
            }
            // Polling after completion never resolves again.
            Stage::Done => Poll::Pending,
        }
    }
}

impl Drop for Acquire {
    fn drop(&mut self) {
        let holds_unit = match self.stage {
            Stage::Init | Stage::Done => false,
            Stage::Yielding => true,
            Stage::Queued(waiter_id) => {
                let mut state = self.resource.state.borrow_mut();
                if state.granted.remove(&waiter_id) {
                    true
                } else {
                    state.remove_waiter_locked(waiter_id);
                    false
                }
            }
        };
        if holds_unit {
            if let Err(e) = self.resource.release() {
                error!(resource = %self.resource.name, error = %e, "Failed to return unit of abandoned request");
            }
        }
    }
}

/// One granted unit of a [`Resource`].
///
/// The unit goes back when the permit is released or dropped.
#[must_use = "dropping a permit releases the unit immediately"]
pub struct Permit {
    resource: Resource,
    released: bool,
}

impl Permit {
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Return the unit, reporting an invariant violation as an error.
    pub fn release(mut self) -> Result<(), SimError> {
        self.released = true;
        self.resource.release()
    }
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("resource", &self.resource.name)
            .finish()
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.resource.release() {
            error!(resource = %self.resource.name, error = %e, "Failed to release permit");
        }
    }
}
