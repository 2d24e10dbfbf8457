//! Constructors for common sources.

use std::{
    error::Error,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::runtime::Handle;

use crate::{
    observer::Observer,
    scheduler::Scheduler,
    subscription::subscribe::{
        Subscribeable, Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic,
    },
    util::LockExt,
    ErrorArc, Observable, RxError,
};

impl<T: 'static> Observable<T> {
    /// Emits `value` and completes.
    pub fn just(value: T) -> Self
    where
        T: Clone + Send + Sync,
    {
        Observable::new(move |mut o| {
            o.next(value.clone());
            o.complete();
            Subscription::empty()
        })
    }

    /// Emits every item of `values` in order and completes.
    pub fn of(values: Vec<T>) -> Self
    where
        T: Clone + Send + Sync,
    {
        Self::from_iter(values)
    }

    /// Emits every item of `iter` in order and completes.
    ///
    /// Emission stops early once the subscriber is closed, so an endless
    /// iterator can be bounded with `take`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    {
        Observable::new(move |mut o| {
            for v in iter.clone() {
                if o.is_closed() {
                    return Subscription::empty();
                }
                o.next(v);
            }
            o.complete();
            Subscription::empty()
        })
    }

    /// Completes immediately without emitting.
    #[must_use]
    pub fn empty() -> Self {
        Observable::new(|mut o| {
            o.complete();
            Subscription::empty()
        })
    }

    /// Never emits and never terminates.
    #[must_use]
    pub fn never() -> Self {
        Observable::new(|_| Subscription::empty())
    }

    /// Terminates every subscriber with `error`.
    #[must_use]
    pub fn error(error: ErrorArc) -> Self {
        Observable::new(move |mut o| {
            o.error(Arc::clone(&error));
            Subscription::empty()
        })
    }

    /// Calls `factory` on every subscription and subscribes to the observable it
    /// returns.
    pub fn deferred<F>(factory: F) -> Self
    where
        F: Fn() -> Observable<T> + Send + Sync + 'static,
    {
        Observable::new(move |o| factory().subscribe(o))
    }

    /// Emits the value of `result` and completes, or errors with its error.
    pub fn from_result<E>(result: Result<T, E>) -> Self
    where
        T: Clone + Send + Sync,
        E: Error + Send + Sync + 'static,
    {
        let result = result.map_err(|e| Arc::new(e) as ErrorArc);
        Observable::new(move |mut o| {
            match &result {
                Ok(v) => {
                    o.next(v.clone());
                    o.complete();
                }
                Err(e) => o.error(Arc::clone(e)),
            }
            Subscription::empty()
        })
    }

    /// A source that produces exactly one value or one error.
    ///
    /// `producer` runs once per subscription and receives a [`SingleEmitter`]. The
    /// emitter may be moved to another thread, for example into the completion
    /// callback of a network request. Resolving it with `success` emits the value
    /// and completes; `failure` errors. Dropping it unresolved errors with
    /// [`RxError::NoElements`].
    pub fn single<F>(producer: F) -> Self
    where
        T: Send,
        F: Fn(SingleEmitter<T>) -> Subscription + Send + Sync + 'static,
    {
        Observable::new(move |o| {
            producer(SingleEmitter {
                subscriber: Some(Arc::new(Mutex::new(o))),
            })
        })
    }

    /// Runs the future made by `factory` on the current Tokio runtime and emits
    /// its result as a single value.
    ///
    /// Disposing the subscription aborts the task. Subscribing outside a Tokio
    /// runtime errors with [`RxError::Source`].
    pub fn from_future<F, Fut, E>(factory: F) -> Self
    where
        T: Send,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Error + Send + Sync + 'static,
    {
        Observable::new(move |mut o| {
            let handle = match Handle::try_current() {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!("from_future subscribed outside a Tokio runtime");
                    o.error(RxError::source("from_future", e).into_arc());
                    return Subscription::empty();
                }
            };
            let future = factory();
            let join = handle.spawn(async move {
                match future.await {
                    Ok(v) => {
                        o.next(v);
                        o.complete();
                    }
                    Err(e) => o.error(Arc::new(e)),
                }
            });
            let abort = join.abort_handle();
            Subscription::new(
                UnsubscribeLogic::Logic(Box::new(move || abort.abort())),
                SubscriptionHandle::JoinTask(join),
            )
        })
    }
}

impl Observable<i64> {
    /// Emits `count` consecutive integers starting at `start`, then completes.
    ///
    /// The sequence stops early at `i64::MAX`.
    #[must_use]
    pub fn range(start: i64, count: u64) -> Self {
        Observable::new(move |mut o| {
            let count = usize::try_from(count).unwrap_or(usize::MAX);
            for v in (start..=i64::MAX).take(count) {
                if o.is_closed() {
                    return Subscription::empty();
                }
                o.next(v);
            }
            o.complete();
            Subscription::empty()
        })
    }
}

impl Observable<u64> {
    /// Emits `0, 1, 2, ...`, one value every `period`, on `scheduler`.
    ///
    /// Never completes on its own; bound it with `take` or `take_until`, or
    /// unsubscribe. Requires a scheduler that runs tasks asynchronously.
    pub fn interval<S>(period: Duration, scheduler: S) -> Self
    where
        S: Scheduler + Clone,
    {
        Observable::new(move |o| {
            let o = Arc::new(Mutex::new(o));
            tick(Arc::clone(&o), 0, period, scheduler.clone())
        })
    }
}

fn tick<S: Scheduler + Clone>(
    o: Arc<Mutex<Subscriber<u64>>>,
    n: u64,
    period: Duration,
    scheduler: S,
) -> Subscription {
    let next_scheduler = scheduler.clone();
    scheduler.schedule_after(
        period,
        Box::new(move || {
            let mut subscriber = o.locked();
            if subscriber.is_closed() {
                return;
            }
            subscriber.next(n);
            drop(subscriber);
            tick(o, n + 1, period, next_scheduler);
        }),
    )
}

/// Resolves a [`single`](Observable::single) source exactly once.
pub struct SingleEmitter<T> {
    subscriber: Option<Arc<Mutex<Subscriber<T>>>>,
}

impl<T> SingleEmitter<T> {
    /// Emits `value` and completes.
    pub fn success(mut self, value: T) {
        if let Some(s) = self.subscriber.take() {
            let mut s = s.locked();
            s.next(value);
            s.complete();
        }
    }

    /// Errors with `error`.
    pub fn failure(mut self, error: impl Error + Send + Sync + 'static) {
        if let Some(s) = self.subscriber.take() {
            s.locked().error(Arc::new(error));
        }
    }

    /// Returns `true` if the subscriber was disposed and resolving is pointless.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.subscriber
            .as_ref()
            .map_or(true, |s| s.locked().is_closed())
    }
}

impl<T> Drop for SingleEmitter<T> {
    fn drop(&mut self) {
        if let Some(s) = self.subscriber.take() {
            tracing::debug!("single emitter dropped without a result");
            s.locked().error(RxError::NoElements.into_arc());
        }
    }
}
