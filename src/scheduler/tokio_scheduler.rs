use std::time::{Duration, Instant};

use tokio::runtime::Handle;

use super::{Scheduler, Task};
use crate::subscription::subscribe::{Subscription, SubscriptionHandle, UnsubscribeLogic};

/// Runs tasks on a Tokio runtime.
///
/// Each task is spawned as its own Tokio task, so tasks scheduled from different
/// threads may run concurrently on a multi-threaded runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Uses the given runtime.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        TokioScheduler { handle }
    }

    /// Uses the runtime the caller is running on.
    ///
    /// Returns `None` outside a Tokio runtime.
    #[must_use]
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(TokioScheduler::new)
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> Subscription {
        let join = self.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task();
        });
        let abort = join.abort_handle();
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || abort.abort())),
            SubscriptionHandle::JoinTask(join),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test]
    async fn delayed_task_runs_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_c = Arc::clone(&runs);

        let start = Instant::now();
        let s = scheduler.schedule_after(
            Duration::from_millis(20),
            Box::new(move || {
                runs_c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        s.join_concurrent().await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn disposed_task_is_aborted() {
        let scheduler = TokioScheduler::current().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_c = Arc::clone(&runs);

        let s = scheduler.schedule_after(
            Duration::from_millis(30),
            Box::new(move || {
                runs_c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        s.disposable().dispose();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
