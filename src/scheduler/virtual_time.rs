use std::{
    collections::BinaryHeap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use super::{ScheduledTask, Scheduler, Task};
use crate::{
    subscription::subscribe::{Disposable, Subscription},
    util::LockExt,
};

struct VirtualState {
    origin: Instant,
    clock: Duration,
    queue: BinaryHeap<ScheduledTask>,
    seq: u64,
}

/// Scheduler with a manually driven clock, for deterministic tests of time based
/// operators.
///
/// Nothing runs until the clock is moved with [`advance_by`], [`advance_to`] or
/// [`flush`]. Tasks then run synchronously on the calling thread in due-time
/// order, with the clock set to each task's due time while it runs.
///
/// [`advance_by`]: struct.VirtualTimeScheduler.html#method.advance_by
/// [`advance_to`]: struct.VirtualTimeScheduler.html#method.advance_to
/// [`flush`]: struct.VirtualTimeScheduler.html#method.flush
#[derive(Clone)]
pub struct VirtualTimeScheduler(Arc<Mutex<VirtualState>>);

impl VirtualTimeScheduler {
    /// Creates a scheduler with its clock at zero.
    #[must_use]
    pub fn new() -> Self {
        VirtualTimeScheduler(Arc::new(Mutex::new(VirtualState {
            origin: Instant::now(),
            clock: Duration::ZERO,
            queue: BinaryHeap::new(),
            seq: 0,
        })))
    }

    /// Virtual time elapsed since creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.0.locked().clock
    }

    /// Number of tasks waiting to run. Cancelled tasks are not counted.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.0
            .locked()
            .queue
            .iter()
            .filter(|t| !t.is_cancelled())
            .count()
    }

    /// Moves the clock forward by `by`, running every task that falls due.
    pub fn advance_by(&self, by: Duration) {
        let target = self.elapsed() + by;
        self.run_until(Some(target));
    }

    /// Moves the clock to `elapsed`, measured from creation. Moving backwards is
    /// ignored.
    pub fn advance_to(&self, elapsed: Duration) {
        if elapsed < self.elapsed() {
            tracing::trace!(?elapsed, "virtual clock cannot move backwards");
            return;
        }
        self.run_until(Some(elapsed));
    }

    /// Runs every queued task, including tasks scheduled while flushing.
    pub fn flush(&self) {
        self.run_until(None);
    }

    fn run_until(&self, target: Option<Duration>) {
        loop {
            let task = {
                let mut state = self.0.locked();
                let origin = state.origin;
                let due = state.queue.peek().map(|t| t.due.duration_since(origin));
                match due {
                    Some(due) if target.map_or(true, |t| due <= t) => {
                        state.clock = state.clock.max(due);
                        state.queue.pop()
                    }
                    _ => None,
                }
            };
            match task {
                Some(task) => task.run(),
                None => break,
            }
        }
        if let Some(target) = target {
            let mut state = self.0.locked();
            state.clock = state.clock.max(target);
        }
    }
}

impl Default for VirtualTimeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for VirtualTimeScheduler {
    fn now(&self) -> Instant {
        let state = self.0.locked();
        state.origin + state.clock
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Subscription {
        let mut state = self.0.locked();
        let entry = ScheduledTask {
            due: state.origin + state.clock + delay,
            seq: state.seq,
            task,
            disposable: Disposable::new(),
        };
        state.seq += 1;
        let subscription = entry.subscription();
        state.queue.retain(|t| !t.is_cancelled());
        state.queue.push(entry);
        subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<(u64, Duration)>>>, id: u64, s: &VirtualTimeScheduler) -> Task {
        let log = Arc::clone(log);
        let s = s.clone();
        Box::new(move || log.lock().unwrap().push((id, s.elapsed())))
    }

    #[test]
    fn nothing_runs_until_advanced() {
        let s = VirtualTimeScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        s.schedule(recorder(&log, 1, &s));

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(s.pending(), 1);

        s.advance_by(Duration::ZERO);
        assert_eq!(*log.lock().unwrap(), vec![(1, Duration::ZERO)]);
    }

    #[test]
    fn advance_runs_only_due_tasks_at_their_time() {
        let s = VirtualTimeScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        s.schedule_after(Duration::from_millis(300), recorder(&log, 3, &s));
        s.schedule_after(Duration::from_millis(100), recorder(&log, 1, &s));

        s.advance_by(Duration::from_millis(200));
        assert_eq!(*log.lock().unwrap(), vec![(1, Duration::from_millis(100))]);
        assert_eq!(s.elapsed(), Duration::from_millis(200));

        s.advance_to(Duration::from_millis(300));
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn cancelled_tasks_are_dropped_from_the_queue() {
        let s = VirtualTimeScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for id in 0..10 {
            let task = s.schedule_after(Duration::from_secs(1), recorder(&log, id, &s));
            task.disposable().dispose();
        }
        assert_eq!(s.pending(), 0);

        s.schedule_after(Duration::from_secs(1), recorder(&log, 10, &s));
        assert_eq!(s.0.locked().queue.len(), 1);

        s.flush();
        assert_eq!(*log.lock().unwrap(), vec![(10, Duration::from_secs(1))]);
    }

    #[test]
    fn flush_runs_tasks_scheduled_while_flushing() {
        let s = VirtualTimeScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = recorder(&log, 2, &s);
        let s_c = s.clone();
        s.schedule_after(
            Duration::from_millis(10),
            Box::new(move || {
                s_c.schedule_after(Duration::from_millis(10), inner);
            }),
        );

        s.flush();

        assert_eq!(*log.lock().unwrap(), vec![(2, Duration::from_millis(20))]);
    }
}
