//! Execution contexts for delivering work now or after a delay.
//!
//! Time based operators (`throttle`, `delay`, `interval`) read the clock through
//! [`Scheduler::now`] and defer work through [`Scheduler::schedule_after`], so the
//! same pipeline can run against real time or against a [`VirtualTimeScheduler`]
//! in tests.

mod event_loop;
mod tokio_scheduler;
mod virtual_time;

use std::{
    cmp::Ordering,
    sync::Arc,
    time::{Duration, Instant},
};

pub use event_loop::EventLoopScheduler;
pub use tokio_scheduler::TokioScheduler;
pub use virtual_time::VirtualTimeScheduler;

use crate::subscription::subscribe::{Disposable, Subscription, SubscriptionHandle};

/// Unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send>;

/// A context that runs tasks now or later.
///
/// Disposing the `Subscription` returned by `schedule`/`schedule_after` cancels
/// the task if it has not started yet.
pub trait Scheduler: Send + Sync + 'static {
    /// The scheduler's notion of the current time.
    fn now(&self) -> Instant;

    /// Runs `task` after `delay`.
    fn schedule_after(&self, delay: Duration, task: Task) -> Subscription;

    /// Runs `task` as soon as possible.
    fn schedule(&self, task: Task) -> Subscription {
        self.schedule_after(Duration::ZERO, task)
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Subscription {
        (**self).schedule_after(delay, task)
    }

    fn schedule(&self, task: Task) -> Subscription {
        (**self).schedule(task)
    }
}

/// Runs every task on the calling thread before `schedule` returns.
///
/// Delayed tasks block the caller for the delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Subscription {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        task();
        Subscription::empty()
    }
}

/// A task waiting in a time ordered queue.
///
/// Orders as a min-heap entry: earlier due time first, then FIFO by sequence.
pub(crate) struct ScheduledTask {
    pub(crate) due: Instant,
    pub(crate) seq: u64,
    pub(crate) task: Task,
    pub(crate) disposable: Disposable,
}

impl ScheduledTask {
    pub(crate) fn run(self) {
        if self.is_cancelled() {
            tracing::trace!(seq = self.seq, "skipping cancelled task");
            return;
        }
        (self.task)();
        self.disposable.dispose();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.disposable.is_disposed()
    }

    pub(crate) fn subscription(&self) -> Subscription {
        Subscription::from_parts(self.disposable.clone(), SubscriptionHandle::Nil)
    }
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
