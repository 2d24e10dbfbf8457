use std::{
    collections::BinaryHeap,
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread::{self, ThreadId},
    time::{Duration, Instant},
};

use super::{ScheduledTask, Scheduler, Task};
use crate::{
    config::EventLoopConfig,
    subscription::subscribe::{Disposable, Subscription},
};

struct Inner {
    tx: mpsc::Sender<ScheduledTask>,
    seq: AtomicU64,
    thread_id: ThreadId,
}

/// Serial scheduler backed by one dedicated worker thread.
///
/// Tasks run one at a time in due-time order, FIFO among tasks due at the same
/// instant. This is the crate's stand-in for a UI main thread: every value
/// delivered through `observe_on(event_loop)` reaches its subscriber on the
/// worker thread and in order.
///
/// The worker exits once every handle is dropped; tasks still queued then are
/// discarded.
#[derive(Clone)]
pub struct EventLoopScheduler(Arc<Inner>);

impl EventLoopScheduler {
    /// Spawns the worker thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn new(config: EventLoopConfig) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<ScheduledTask>();
        let idle_wait = config.idle_wait;
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run_loop(&rx, idle_wait))?;
        tracing::debug!(thread = %config.thread_name, "event loop started");
        Ok(EventLoopScheduler(Arc::new(Inner {
            tx,
            seq: AtomicU64::new(0),
            thread_id: handle.thread().id(),
        })))
    }

    /// Returns `true` when called from the worker thread.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.0.thread_id
    }
}

fn run_loop(rx: &mpsc::Receiver<ScheduledTask>, idle_wait: Duration) {
    let mut queue: BinaryHeap<ScheduledTask> = BinaryHeap::new();
    loop {
        let now = Instant::now();
        while queue.peek().is_some_and(|t| t.due <= now) {
            if let Some(task) = queue.pop() {
                task.run();
            }
        }

        let wait = queue
            .peek()
            .map_or(idle_wait, |t| t.due.saturating_duration_since(now).min(idle_wait));

        match rx.recv_timeout(wait) {
            Ok(task) => {
                queue.retain(|t| !t.is_cancelled());
                queue.push(task);
                while let Ok(task) = rx.try_recv() {
                    queue.push(task);
                }
            }
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!(discarded = queue.len(), "event loop stopped");
                return;
            }
        }
    }
}

impl Scheduler for EventLoopScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Subscription {
        let entry = ScheduledTask {
            due: Instant::now() + delay,
            seq: self.0.seq.fetch_add(1, Ordering::Relaxed),
            task,
            disposable: Disposable::new(),
        };
        let subscription = entry.subscription();
        if self.0.tx.send(entry).is_err() {
            tracing::warn!("event loop worker is gone, task dropped");
            subscription.disposable().dispose();
        }
        subscription
    }
}
