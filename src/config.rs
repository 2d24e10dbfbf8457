//! Configuration types for schedulers and replaying subjects.

use std::time::Duration;

/// Default name of the event loop worker thread.
pub const DEFAULT_EVENT_LOOP_THREAD_NAME: &str = "rx-event-loop";

/// Default time the event loop sleeps when no task is queued.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(50);

/// Initial buffer capacity of replaying subjects created with an unbounded buffer.
pub const DEFAULT_REPLAY_CAPACITY: usize = 16;

/// Upper bound on pre-allocated replay buffer slots.
pub const MAX_REPLAY_PREALLOCATION: usize = 1024;

/// Configuration for an [`EventLoopScheduler`](crate::scheduler::EventLoopScheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLoopConfig {
    /// Name given to the worker thread.
    pub thread_name: String,

    /// Longest time the worker blocks waiting for new work when the queue is empty.
    pub idle_wait: Duration,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_EVENT_LOOP_THREAD_NAME.to_owned(),
            idle_wait: DEFAULT_IDLE_WAIT,
        }
    }
}

impl EventLoopConfig {
    /// Sets the worker thread name.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets the idle wait. A zero duration is raised to one millisecond.
    #[must_use]
    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait.max(Duration::from_millis(1));
        self
    }
}

/// Buffer settings shared by replaying subjects and `share_replay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Slots reserved up front when the buffer is unbounded.
    pub initial_capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_REPLAY_CAPACITY,
        }
    }
}

impl ReplayConfig {
    /// Sets the initial capacity of unbounded buffers.
    #[must_use]
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity.min(MAX_REPLAY_PREALLOCATION);
        self
    }

    /// Capacity to reserve for a buffer that keeps at most `bound` values.
    #[must_use]
    pub fn capacity_for(&self, bound: Option<usize>) -> usize {
        match bound {
            Some(n) => n.min(MAX_REPLAY_PREALLOCATION),
            None => self.initial_capacity,
        }
    }
}
