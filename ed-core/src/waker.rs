//! Task wakers for the simulation runtime.
//!
//! A waker created here does not poll anything by itself: waking it only
//! appends the task id to the runtime's ready queue. The runtime decides
//! when that turns into a poll, which keeps every resumption on the
//! scheduler's event order.
//!
//! ```rust,ignore
//! let waker = task_waker(task_id, ready.clone());
//! let mut cx = Context::from_waker(&waker);
//! let _ = future.as_mut().poll(&mut cx);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::task::{RawWaker, RawWakerVTable, Waker};

use crate::types::TaskId;

/// Queue of tasks that have been woken and are waiting to be polled.
pub(crate) type ReadyQueue = Arc<Mutex<VecDeque<TaskId>>>;

/// Arc-wrapped waker data for cheap cloning.
struct TaskWakerData {
    task: TaskId,
    ready: ReadyQueue,
}

impl TaskWakerData {
    fn wake(&self) {
        let mut queue = match self.ready.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue.push_back(self.task);
    }
}

static TASK_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(
    task_waker_clone,
    task_waker_wake,
    task_waker_wake_by_ref,
    task_waker_drop,
);

unsafe fn task_waker_clone(data: *const ()) -> RawWaker {
    Arc::increment_strong_count(data as *const TaskWakerData);
    RawWaker::new(data, &TASK_WAKER_VTABLE)
}

unsafe fn task_waker_wake(data: *const ()) {
    let arc = Arc::from_raw(data as *const TaskWakerData);
    arc.wake();
}

unsafe fn task_waker_wake_by_ref(data: *const ()) {
    let waker_data = &*(data as *const TaskWakerData);
    waker_data.wake();
}

unsafe fn task_waker_drop(data: *const ()) {
    drop(Arc::from_raw(data as *const TaskWakerData));
}

/// Create a waker that marks `task` ready when woken.
pub(crate) fn task_waker(task: TaskId, ready: ReadyQueue) -> Waker {
    let arc = Arc::new(TaskWakerData { task, ready });
    let raw_waker = RawWaker::new(Arc::into_raw(arc) as *const (), &TASK_WAKER_VTABLE);
    // SAFETY: the vtable functions above treat `data` as the pointer produced
    // by `Arc::into_raw` and keep the reference count balanced.
    unsafe { Waker::from_raw(raw_waker) }
}

/// Remove and return every task currently marked ready, in wake order.
pub(crate) fn drain_ready(ready: &ReadyQueue) -> Vec<TaskId> {
    let mut queue = match ready.lock() {
        Ok(queue) => queue,
        Err(poisoned) => poisoned.into_inner(),
    };
    queue.drain(..).collect()
}
