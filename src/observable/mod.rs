//! The `observable` module provides the building blocks for creating and manipulating
//! observables.
//!
//! An [`Observable`] is a cold description of a stream: every call to `subscribe`
//! runs its subscribe function again for the new [`Subscriber`]. Operators live on
//! the [`ObservableExt`] extension trait, which is implemented for everything that
//! can be subscribed to, subjects and relays included.
//!
//! # Cancellation
//!
//! Each subscriber owns a [`Disposable`]. Operators that forward to one
//! downstream share the downstream's disposable with the subscriber they hand
//! upstream, so disposing the final subscription, or the downstream terminating
//! early as with `take`, closes the whole chain at once. Synchronous producers
//! poll [`Subscriber::is_closed`] between emissions; asynchronous producers
//! return an [`UnsubscribeLogic`] that stops them.

mod event;
mod factories;
pub mod multicast;
mod serialized;

#[cfg(test)]
mod tests;

use std::{
    error::Error,
    fmt::Debug,
    mem,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

pub use event::Event;
pub use factories::SingleEmitter;

use crate::{
    collaborators::Binder,
    observer::Observer,
    scheduler::Scheduler,
    subjects::Relay,
    subscription::subscribe::{
        Disposable, Subscribeable, Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic,
    },
    util::LockExt,
    ErrorArc, RxError,
};

use multicast::Connectable;
use serialized::Serialized;

/// The `Observable` struct represents a source of values that can be observed
/// and transformed.
///
/// # Example: synchronous `Observable`
///
/// Emits values and completes before `subscribe` returns. Polling `is_closed`
/// lets operators such as `take` stop the loop early.
///
/// ```no_run
/// use rxcore::subscribe::{Subscriber, Subscription};
/// use rxcore::{Observable, ObservableExt, Observer, Subscribeable};
///
/// let mut numbers = Observable::new(|mut subscriber| {
///     for i in 1..=10 {
///         if subscriber.is_closed() {
///             break;
///         }
///         subscriber.next(i);
///     }
///     subscriber.complete();
///     Subscription::empty()
/// });
///
/// numbers
///     .take(3)
///     .subscribe(Subscriber::on_next(|v| println!("Emitted {}", v)));
/// ```
///
/// # Example: asynchronous `Observable` with `unsubscribe`
///
/// Emits from an OS thread and returns a `Subscription` whose unsubscribe logic
/// signals the thread to stop.
///
/// ```no_run
/// use std::{sync::mpsc, thread, time::Duration};
///
/// use rxcore::subscribe::{
///     Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic, Unsubscribeable,
/// };
/// use rxcore::{Observable, ObservableExt, Observer, Subscribeable};
///
/// let observable = Observable::new(|mut o| {
///     let (tx, rx) = mpsc::channel::<()>();
///     let join_handle = thread::spawn(move || {
///         for i in 0..10_000 {
///             if rx.try_recv().is_ok() || o.is_closed() {
///                 break;
///             }
///             o.next(i);
///             thread::sleep(Duration::from_millis(1));
///         }
///         o.complete();
///     });
///     Subscription::new(
///         UnsubscribeLogic::Logic(Box::new(move || {
///             let _ = tx.send(());
///         })),
///         SubscriptionHandle::JoinThread(join_handle),
///     )
/// });
///
/// let subscription = observable
///     .map(|v| format!("Mapped {}", v))
///     .subscribe(Subscriber::on_next(|v| println!("{}", v)));
///
/// thread::sleep(Duration::from_millis(20));
/// subscription.unsubscribe();
/// ```
pub struct Observable<T> {
    subscribe_fn: Box<dyn FnMut(Subscriber<T>) -> Subscription + Send + Sync>,
}

impl<T> Observable<T> {
    /// Creates a new `Observable` with the provided subscribe function.
    ///
    /// The subscribe function runs once per subscription. It delivers values to
    /// the `Subscriber` and returns a `Subscription` carrying the logic that stops
    /// the producer and, for asynchronous producers, a handle to await it. The
    /// returned teardown is attached to the subscriber's disposable, so it also
    /// runs when the subscriber terminates or is disposed.
    pub fn new(sf: impl FnMut(Subscriber<T>) -> Subscription + Send + Sync + 'static) -> Self {
        Observable {
            subscribe_fn: Box::new(sf),
        }
    }
}

impl<T: 'static> Subscribeable for Observable<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        let disposable = v.disposable();
        let inner = (self.subscribe_fn)(v);
        let handle = disposable.adopt(inner);
        Subscription::from_parts(disposable, handle)
    }
}

type Shared<T> = Arc<Mutex<Subscriber<T>>>;

/// Moves a downstream subscriber behind a lock so several callbacks can reach it.
fn share<U>(o: Subscriber<U>) -> (Disposable, Shared<U>) {
    (o.disposable(), Arc::new(Mutex::new(o)))
}

/// Builds an upstream subscriber that hands values to `on_next` and forwards
/// terminal events to `o` unchanged.
fn forward<T, U: 'static>(o: &Shared<U>, mut on_next: impl FnMut(T) + Send + 'static) -> Subscriber<T> {
    let o_cloned_e = Arc::clone(o);
    let o_cloned_c = Arc::clone(o);
    Subscriber::new(
        move |v| on_next(v),
        move |observable_error| o_cloned_e.locked().error(observable_error),
        move || o_cloned_c.locked().complete(),
    )
}

/// Upstream subscriber for operators with exactly one downstream. Shares the
/// downstream's disposable.
fn lift<T, U: 'static>(
    o: Subscriber<U>,
    mut on_next: impl FnMut(T, &mut Subscriber<U>) + Send + 'static,
) -> Subscriber<T> {
    let (d, o_shared) = share(o);
    let o_cloned = Arc::clone(&o_shared);
    forward(&o_shared, move |v| on_next(v, &mut o_cloned.locked())).chained(d)
}

/// Live sources of a merging operator.
struct MergeState {
    remaining: usize,
    sources: Vec<Disposable>,
}

impl MergeState {
    fn shared(owner: &Disposable) -> Arc<Mutex<MergeState>> {
        let state = Arc::new(Mutex::new(MergeState {
            remaining: 0,
            sources: Vec::new(),
        }));
        let state_c = Arc::clone(&state);
        owner.add_teardown(UnsubscribeLogic::Logic(Box::new(move || {
            let sources = mem::take(&mut state_c.locked().sources);
            for source in sources {
                source.dispose();
            }
        })));
        state
    }

    fn track(&mut self, source: Disposable) {
        self.remaining += 1;
        self.sources.retain(|s| !s.is_disposed());
        self.sources.push(source);
    }

    /// Returns `true` when the last live source finished.
    fn finish_one(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

/// Subscriber for one source of a merge. Completes `o` once every tracked
/// source completed.
fn merged<T: Send + 'static>(o: &Serialized<T>, state: &Arc<Mutex<MergeState>>) -> Subscriber<T> {
    let (o_cloned_n, o_cloned_e, o_cloned_c) = (o.clone(), o.clone(), o.clone());
    let state_c = Arc::clone(state);
    let s = Subscriber::new(
        move |v| o_cloned_n.next(v),
        move |observable_error| o_cloned_e.error(observable_error),
        move || {
            let done = state_c.locked().finish_one();
            if done {
                o_cloned_c.complete();
            }
        },
    );
    state.locked().track(s.disposable());
    s
}

fn subscribe_tracking<S: Subscribeable + ?Sized>(
    source: &mut S,
    s: Subscriber<S::ObsType>,
) -> SubscriptionHandle {
    source.subscribe(s).take_handle()
}

/// Pending timer of a `timeout`, replaced on every item.
struct TimeoutTimer {
    generation: AtomicU64,
    current: Mutex<Option<Disposable>>,
}

impl TimeoutTimer {
    /// Cancels the previous timer, if any, and starts a new one for `armed_at`.
    fn arm<T: 'static, S: Scheduler>(
        self: &Arc<Self>,
        o: &Shared<T>,
        owner: &Disposable,
        armed_at: u64,
        due: Duration,
        scheduler: &S,
    ) {
        self.cancel();
        let o = Arc::clone(o);
        let timer = Arc::clone(self);
        let s = scheduler.schedule_after(
            due,
            Box::new(move || {
                if timer.generation.load(Ordering::Acquire) == armed_at {
                    tracing::debug!(?due, "timeout elapsed");
                    o.locked().error(RxError::Timeout.into_arc());
                }
            }),
        );
        let s = s.disposable();
        let previous = self.current.locked().replace(s.clone());
        if let Some(previous) = previous {
            previous.dispose();
        }
        // The owner may have been disposed while the timer was being armed.
        if owner.is_disposed() {
            s.dispose();
        }
    }

    fn cancel(&self) {
        let current = self.current.locked().take();
        if let Some(current) = current {
            current.dispose();
        }
    }
}

/// The `ObservableExt` trait provides a set of extension methods that can be applied
/// to observables to transform and manipulate their behavior.
///
/// It is implemented for every [`Subscribeable`], so subjects, relays and
/// `Connectable` observables can be chained the same way as `Observable`.
pub trait ObservableExt<T: 'static>: Subscribeable<ObsType = T> {
    /// Transforms the items emitted by the observable using a transformation
    /// function.
    fn map<U, F>(mut self, f: F) -> Observable<U>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
        U: 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            self.subscribe(lift(o, move |v, o| o.next(f(v))))
        })
    }

    /// Filters the items emitted by the observable based on a predicate function.
    ///
    /// Only items for which the predicate function returns `true` will be emitted
    /// by the resulting observable.
    fn filter<P>(mut self, predicate: P) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Observable::new(move |o| {
            let predicate = Arc::clone(&predicate);
            self.subscribe(lift(o, move |v, o| {
                if predicate(&v) {
                    o.next(v);
                }
            }))
        })
    }

    /// Maps every item and drops the ones mapped to `None`.
    fn filter_map<U, F>(mut self, f: F) -> Observable<U>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(T) -> Option<U> + Send + Sync + 'static,
        U: 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            self.subscribe(lift(o, move |v, o| {
                if let Some(u) = f(v) {
                    o.next(u);
                }
            }))
        })
    }

    /// Maps every item with a fallible function.
    ///
    /// The first `Err` is delivered downstream as an [`RxError::Operator`] error
    /// and the source is disposed.
    fn try_map<U, E, F>(mut self, f: F) -> Observable<U>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
        E: Error + Send + Sync + 'static,
        U: 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            self.subscribe(lift(o, move |v, o| match f(v) {
                Ok(u) => o.next(u),
                Err(e) => o.error(RxError::operator("try_map", e).into_arc()),
            }))
        })
    }

    /// Suppresses items equal to the previously delivered one. The first item
    /// always passes.
    fn distinct_until_changed(mut self) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: PartialEq + Clone + Send,
    {
        Observable::new(move |o| {
            let mut last: Option<T> = None;
            self.subscribe(lift(o, move |v: T, o| {
                if last.as_ref() != Some(&v) {
                    last = Some(v.clone());
                    o.next(v);
                }
            }))
        })
    }

    /// Suppresses items whose key equals the key of the previously delivered item.
    fn distinct_until_changed_by<K, F>(mut self, key: F) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
        K: PartialEq + Send + 'static,
    {
        let key = Arc::new(key);
        Observable::new(move |o| {
            let key = Arc::clone(&key);
            let mut last: Option<K> = None;
            self.subscribe(lift(o, move |v: T, o| {
                let k = key(&v);
                if last.as_ref() != Some(&k) {
                    last = Some(k);
                    o.next(v);
                }
            }))
        })
    }

    /// Delivers the first item of every `window` immediately and drops the rest.
    ///
    /// Leading edge only: dropped items are never delivered later. Windows are
    /// measured with `scheduler.now()`, so a [`VirtualTimeScheduler`] makes the
    /// operator deterministic.
    ///
    /// [`VirtualTimeScheduler`]: crate::scheduler::VirtualTimeScheduler
    fn throttle<S>(mut self, window: Duration, scheduler: S) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        S: Scheduler + Clone,
    {
        Observable::new(move |o| {
            let scheduler = scheduler.clone();
            let mut window_start: Option<Instant> = None;
            self.subscribe(lift(o, move |v, o| {
                let now = scheduler.now();
                let open = window_start
                    .map_or(true, |start| now.saturating_duration_since(start) >= window);
                if open {
                    window_start = Some(now);
                    o.next(v);
                }
            }))
        })
    }

    /// Skips the first `n` items emitted by the observable and then emits the rest.
    fn skip(mut self, n: usize) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Observable::new(move |o| {
            let mut n = n;
            self.subscribe(lift(o, move |v, o| {
                if n > 0 {
                    n -= 1;
                    return;
                }
                o.next(v);
            }))
        })
    }

    /// Skips items while `predicate` holds. The first item failing the predicate
    /// and everything after it pass.
    fn skip_while<P>(mut self, predicate: P) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Observable::new(move |o| {
            let predicate = Arc::clone(&predicate);
            let mut skipping = true;
            self.subscribe(lift(o, move |v, o| {
                if skipping && predicate(&v) {
                    return;
                }
                skipping = false;
                o.next(v);
            }))
        })
    }

    /// Drops items until `trigger` emits its first item.
    ///
    /// Dropped items are not buffered. The trigger is disposed after its first
    /// item; a trigger error terminates the stream.
    fn skip_until<O, U>(mut self, mut trigger: O) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        O: Subscribeable<ObsType = U> + Send + Sync + 'static,
        T: Send,
        U: 'static,
    {
        Observable::new(move |o| {
            let (d, o_shared) = Serialized::new(o);
            let open = Arc::new(AtomicBool::new(false));
            let trigger_slot: Arc<Mutex<Option<Disposable>>> = Arc::new(Mutex::new(None));

            let open_t = Arc::clone(&open);
            let slot = Arc::clone(&trigger_slot);
            let o_cloned_te = o_shared.clone();
            let mut t = Subscriber::on_next(move |_: U| {
                open_t.store(true, Ordering::Release);
                if let Some(td) = slot.locked().take() {
                    td.dispose();
                }
            });
            t.on_error(move |observable_error| o_cloned_te.error(observable_error));
            let t = t.child_of(&d);
            *trigger_slot.locked() = Some(t.disposable());
            trigger.subscribe(t);

            let (o_cloned_n, o_cloned_e) = (o_shared.clone(), o_shared.clone());
            let u = Subscriber::new(
                move |v| {
                    if open.load(Ordering::Acquire) {
                        o_cloned_n.next(v);
                    }
                },
                move |observable_error| o_cloned_e.error(observable_error),
                move || o_shared.complete(),
            );
            self.subscribe(u.chained(d))
        })
    }

    /// Emits at most the first `n` items emitted by the observable, then
    /// completes and disposes the source.
    ///
    /// `take(0)` completes immediately without subscribing to the source.
    fn take(mut self, n: usize) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Observable::new(move |mut o| {
            if n == 0 {
                o.complete();
                return Subscription::empty();
            }
            let mut remaining = n;
            self.subscribe(lift(o, move |v, o| {
                if remaining == 0 {
                    return;
                }
                remaining -= 1;
                o.next(v);
                if remaining == 0 {
                    o.complete();
                }
            }))
        })
    }

    /// Emits items while `predicate` holds and completes at the first item that
    /// fails it.
    fn take_while<P>(mut self, predicate: P) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Observable::new(move |o| {
            let predicate = Arc::clone(&predicate);
            self.subscribe(lift(o, move |v, o| {
                if predicate(&v) {
                    o.next(v);
                } else {
                    o.complete();
                }
            }))
        })
    }

    /// Emits items until `trigger` emits, then completes.
    fn take_until<O, U>(mut self, mut trigger: O) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        O: Subscribeable<ObsType = U> + Send + Sync + 'static,
        T: Send,
        U: 'static,
    {
        Observable::new(move |o| {
            let (d, o_shared) = Serialized::new(o);

            let (o_cloned_tn, o_cloned_te) = (o_shared.clone(), o_shared.clone());
            let mut t = Subscriber::on_next(move |_: U| o_cloned_tn.complete());
            t.on_error(move |observable_error| o_cloned_te.error(observable_error));
            trigger.subscribe(t.child_of(&d));

            let (o_cloned_n, o_cloned_e) = (o_shared.clone(), o_shared.clone());
            let u = Subscriber::new(
                move |v| o_cloned_n.next(v),
                move |observable_error| o_cloned_e.error(observable_error),
                move || o_shared.complete(),
            );
            self.subscribe(u.chained(d))
        })
    }

    /// Turns every notification into an [`Event`] value. The resulting stream
    /// completes right after the source's terminal event.
    fn materialize(mut self) -> Observable<Event<T>>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Observable::new(move |o| {
            let (d, o_shared) = share(o);
            let o_cloned_n = Arc::clone(&o_shared);
            let o_cloned_e = Arc::clone(&o_shared);
            let u = Subscriber::new(
                move |v| o_cloned_n.locked().next(Event::Next(v)),
                move |observable_error| {
                    let mut o = o_cloned_e.locked();
                    o.next(Event::Error(observable_error));
                    o.complete();
                },
                move || {
                    let mut o = o_shared.locked();
                    o.next(Event::Completed);
                    o.complete();
                },
            );
            self.subscribe(u.chained(d))
        })
    }

    /// Turns a stream of [`Event`] values back into notifications.
    fn dematerialize<U>(mut self) -> Observable<U>
    where
        Self: Sized + Send + Sync + 'static,
        T: Into<Event<U>>,
        U: 'static,
    {
        Observable::new(move |o| {
            self.subscribe(lift(o, move |v: T, o| Into::<Event<U>>::into(v).deliver(o)))
        })
    }

    /// Merges the current observable with a vector of observables, emitting items
    /// from all of them concurrently.
    ///
    /// Completes once every source completed. The first error terminates the
    /// merged stream and disposes every other source.
    fn merge(mut self, mut sources: Vec<Observable<T>>) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: Send,
    {
        Observable::new(move |o| {
            let (d, o_shared) = Serialized::new(o);
            let state = MergeState::shared(&d);

            // Track every source before subscribing so an early completion cannot
            // complete the merged stream.
            let first = merged(&o_shared, &state);
            let rest: Vec<_> = sources.iter().map(|_| merged(&o_shared, &state)).collect();

            let mut handles = Vec::with_capacity(sources.len() + 1);
            handles.push(subscribe_tracking(&mut self, first));
            for (source, s) in sources.iter_mut().zip(rest) {
                handles.push(subscribe_tracking(source, s));
            }
            Subscription::new(UnsubscribeLogic::Nil, SubscriptionHandle::all(handles))
        })
    }

    /// Merges the current observable with another observable, emitting items from
    /// both concurrently.
    fn merge_one(self, source: Observable<T>) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: Send,
    {
        self.merge(vec![source])
    }

    /// Maps every item to an inner observable and merges all inner observables
    /// concurrently.
    ///
    /// Earlier inner observables are never cancelled. Completes once the source
    /// and every inner observable completed.
    fn flat_map<R, F>(mut self, project: F) -> Observable<R>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(T) -> Observable<R> + Send + Sync + 'static,
        R: Send + 'static,
    {
        let project = Arc::new(project);
        Observable::new(move |o| {
            let project = Arc::clone(&project);
            let (d, o_shared) = Serialized::new(o);
            let state = MergeState::shared(&d);

            let o_cloned_e = o_shared.clone();
            let o_cloned_c = o_shared.clone();
            let state_c = Arc::clone(&state);
            let outer_state = Arc::clone(&state);
            let u = Subscriber::new(
                move |v| {
                    let mut inner_observable = project(v);
                    let inner_subscriber = merged(&o_shared, &state);
                    inner_observable.subscribe(inner_subscriber);
                },
                move |observable_error| o_cloned_e.error(observable_error),
                move || {
                    let done = state_c.locked().finish_one();
                    if done {
                        o_cloned_c.complete();
                    }
                },
            );
            outer_state.locked().track(u.disposable());
            self.subscribe(u)
        })
    }

    /// Maps every item to an inner observable, disposing the previous inner
    /// observable before subscribing to the new one.
    ///
    /// Only events of the most recent inner observable pass. Completes once the
    /// source completed and the latest inner observable completed.
    fn flat_map_latest<R, F>(mut self, project: F) -> Observable<R>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(T) -> Observable<R> + Send + Sync + 'static,
        R: Send + 'static,
    {
        struct Latest {
            current: Option<Disposable>,
            generation: u64,
            outer_done: bool,
        }

        let project = Arc::new(project);
        Observable::new(move |o| {
            let project = Arc::clone(&project);
            let (d, o_shared) = Serialized::new(o);
            let latest = Arc::new(Mutex::new(Latest {
                current: None,
                generation: 0,
                outer_done: false,
            }));

            let latest_d = Arc::clone(&latest);
            d.add_teardown(UnsubscribeLogic::Logic(Box::new(move || {
                if let Some(current) = latest_d.locked().current.take() {
                    current.dispose();
                }
            })));

            let o_cloned_e = o_shared.clone();
            let o_cloned_c = o_shared.clone();
            let latest_c = Arc::clone(&latest);
            let u = Subscriber::new(
                move |v| {
                    let mut inner_observable = project(v);

                    let o_cloned_n = o_shared.clone();
                    let o_cloned_ie = o_shared.clone();
                    let o_cloned_ic = o_shared.clone();
                    let latest_ic = Arc::clone(&latest);
                    let generation = latest.locked().generation + 1;
                    let inner_subscriber = Subscriber::new(
                        move |k| o_cloned_n.next(k),
                        move |observable_error| o_cloned_ie.error(observable_error),
                        move || {
                            let done = {
                                let mut st = latest_ic.locked();
                                if st.generation != generation {
                                    return;
                                }
                                st.current = None;
                                st.outer_done
                            };
                            if done {
                                o_cloned_ic.complete();
                            }
                        },
                    );

                    let previous = {
                        let mut st = latest.locked();
                        st.generation = generation;
                        st.current.replace(inner_subscriber.disposable())
                    };
                    if let Some(previous) = previous {
                        previous.dispose();
                    }
                    inner_observable.subscribe(inner_subscriber);
                },
                move |observable_error| o_cloned_e.error(observable_error),
                move || {
                    let done = {
                        let mut st = latest_c.locked();
                        st.outer_done = true;
                        st.current.is_none()
                    };
                    if done {
                        o_cloned_c.complete();
                    }
                },
            );
            self.subscribe(u.child_of(&d))
        })
    }

    /// Combines the latest items of both sources with `f` whenever either emits,
    /// once both have emitted at least once.
    ///
    /// Completes when both sources completed. An error from either terminates
    /// the stream immediately.
    fn combine_latest<O, U, R, F>(mut self, mut other: O, f: F) -> Observable<R>
    where
        Self: Sized + Send + Sync + 'static,
        O: Subscribeable<ObsType = U> + Send + Sync + 'static,
        F: Fn(&T, &U) -> R + Send + Sync + 'static,
        T: Send,
        U: Send + 'static,
        R: Send + 'static,
    {
        struct Combine<A, B> {
            left: Option<A>,
            right: Option<B>,
            completed: u8,
        }

        let f = Arc::new(f);
        Observable::new(move |o| {
            let (d, o_shared) = Serialized::new(o);
            let state = Arc::new(Mutex::new(Combine {
                left: None,
                right: None,
                completed: 0,
            }));

            let complete_one = {
                let state = Arc::clone(&state);
                let o_shared = o_shared.clone();
                move || {
                    let done = {
                        let mut st = state.locked();
                        st.completed += 1;
                        st.completed == 2
                    };
                    if done {
                        o_shared.complete();
                    }
                }
            };

            let (f_l, state_l, o_l) = (Arc::clone(&f), Arc::clone(&state), o_shared.clone());
            let mut left = Subscriber::on_next(move |v: T| {
                let combined = {
                    let mut st = state_l.locked();
                    st.left = Some(v);
                    match (&st.left, &st.right) {
                        (Some(l), Some(r)) => Some(f_l(l, r)),
                        _ => None,
                    }
                };
                if let Some(c) = combined {
                    o_l.next(c);
                }
            });
            let o_le = o_shared.clone();
            left.on_error(move |observable_error| o_le.error(observable_error));
            left.on_complete(complete_one.clone());

            let (f_r, state_r, o_r) = (Arc::clone(&f), Arc::clone(&state), o_shared.clone());
            let mut right = Subscriber::on_next(move |v: U| {
                let combined = {
                    let mut st = state_r.locked();
                    st.right = Some(v);
                    match (&st.left, &st.right) {
                        (Some(l), Some(r)) => Some(f_r(l, r)),
                        _ => None,
                    }
                };
                if let Some(c) = combined {
                    o_r.next(c);
                }
            });
            let o_re = o_shared.clone();
            right.on_error(move |observable_error| o_re.error(observable_error));
            right.on_complete(complete_one);

            let handles = vec![
                subscribe_tracking(&mut self, left.child_of(&d)),
                subscribe_tracking(&mut other, right.child_of(&d)),
            ];
            Subscription::new(UnsubscribeLogic::Nil, SubscriptionHandle::all(handles))
        })
    }

    /// Combines every item with the latest item of `other`.
    ///
    /// Items arriving before `other` emitted anything are dropped. Completion of
    /// `other` is ignored; its errors terminate the stream.
    fn with_latest_from<O, U, R, F>(mut self, mut other: O, f: F) -> Observable<R>
    where
        Self: Sized + Send + Sync + 'static,
        O: Subscribeable<ObsType = U> + Send + Sync + 'static,
        F: Fn(T, &U) -> R + Send + Sync + 'static,
        U: Send + 'static,
        R: 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            let (d, o_shared) = share(o);
            let latest: Arc<Mutex<Option<U>>> = Arc::new(Mutex::new(None));

            let latest_o = Arc::clone(&latest);
            let o_cloned_e = Arc::clone(&o_shared);
            let mut sampled = Subscriber::on_next(move |v| *latest_o.locked() = Some(v));
            sampled.on_error(move |observable_error| o_cloned_e.locked().error(observable_error));
            other.subscribe(sampled.child_of(&d));

            let o_cloned = Arc::clone(&o_shared);
            let u = forward(&o_shared, move |v| {
                let combined = latest.locked().as_ref().map(|l| f(v, l));
                if let Some(c) = combined {
                    o_cloned.locked().next(c);
                }
            });
            self.subscribe(u.chained(d))
        })
    }

    /// Collects every item and emits them as one `Vec` when the source completes.
    ///
    /// Emits nothing if the source never completes.
    fn to_array(mut self) -> Observable<Vec<T>>
    where
        Self: Sized + Send + Sync + 'static,
        T: Send,
    {
        Observable::new(move |o| {
            let (d, o_shared) = share(o);
            let buffer = Arc::new(Mutex::new(Vec::new()));
            let buffer_c = Arc::clone(&buffer);
            let o_cloned_e = Arc::clone(&o_shared);
            let u = Subscriber::new(
                move |v| buffer.locked().push(v),
                move |observable_error| o_cloned_e.locked().error(observable_error),
                move || {
                    let values = mem::take(&mut *buffer_c.locked());
                    let mut o = o_shared.locked();
                    o.next(values);
                    o.complete();
                },
            );
            self.subscribe(u.chained(d))
        })
    }

    /// Emits the running accumulation of `f` over the items, starting from `seed`.
    fn scan<A, F>(mut self, seed: A, f: F) -> Observable<A>
    where
        Self: Sized + Send + Sync + 'static,
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            let mut acc = Some(seed.clone());
            self.subscribe(lift(o, move |v, o| {
                if let Some(current) = acc.take() {
                    let next = f(current, v);
                    acc = Some(next.clone());
                    o.next(next);
                }
            }))
        })
    }

    /// Emits `value` before the items of the source.
    fn start_with(mut self, value: T) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: Clone + Send + Sync,
    {
        Observable::new(move |mut o| {
            o.next(value.clone());
            if o.is_closed() {
                return Subscription::empty();
            }
            self.subscribe(o)
        })
    }

    /// Calls `f` with every item before passing it on.
    fn tap<F>(mut self, f: F) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            self.subscribe(lift(o, move |v, o| {
                f(&v);
                o.next(v);
            }))
        })
    }

    /// Logs subscription, every notification and disposal at `debug` level,
    /// tagged with `label`.
    fn debug(mut self, label: impl Into<String>) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: Debug,
    {
        let label: Arc<str> = Arc::from(label.into());
        Observable::new(move |o| {
            tracing::debug!(label = %label, "subscribed");
            let (d, o_shared) = share(o);
            let label_d = Arc::clone(&label);
            d.add_teardown(UnsubscribeLogic::Logic(Box::new(move || {
                tracing::debug!(label = %label_d, "disposed");
            })));

            let (label_n, label_e, label_c) = (Arc::clone(&label), Arc::clone(&label), Arc::clone(&label));
            let o_cloned_n = Arc::clone(&o_shared);
            let o_cloned_e = Arc::clone(&o_shared);
            let u = Subscriber::new(
                move |v| {
                    tracing::debug!(label = %label_n, value = ?v, "next");
                    o_cloned_n.locked().next(v);
                },
                move |observable_error| {
                    tracing::debug!(label = %label_e, error = %observable_error, "error");
                    o_cloned_e.locked().error(observable_error);
                },
                move || {
                    tracing::debug!(label = %label_c, "completed");
                    o_shared.locked().complete();
                },
            );
            self.subscribe(u.chained(d))
        })
    }

    /// Replaces an error with the observable returned by `handler`.
    fn catch_error<F>(mut self, handler: F) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(ErrorArc) -> Observable<T> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Observable::new(move |o| {
            let handler = Arc::clone(&handler);
            let (d, o_shared) = share(o);
            let d_fallback = d.clone();
            let o_cloned_n = Arc::clone(&o_shared);
            let o_cloned_c = Arc::clone(&o_shared);
            let u = Subscriber::new(
                move |v| o_cloned_n.locked().next(v),
                move |observable_error| {
                    tracing::debug!(error = %observable_error, "catch_error switching to fallback");
                    let mut fallback = handler(observable_error);
                    let o_cloned_f = Arc::clone(&o_shared);
                    let s = forward(&o_shared, move |v| o_cloned_f.locked().next(v));
                    fallback.subscribe(s.chained(d_fallback.clone()));
                },
                move || o_cloned_c.locked().complete(),
            );
            self.subscribe(u.child_of(&d))
        })
    }

    /// Replaces an error with `value` followed by completion.
    fn catch_and_return(self, value: T) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: Clone + Send + Sync,
    {
        self.catch_error(move |_| Observable::just(value.clone()))
    }

    /// Fails with [`RxError::Timeout`] if no item arrives within `due` of
    /// subscribing or of the previous item.
    fn timeout<S>(mut self, due: Duration, scheduler: S) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        S: Scheduler + Clone,
    {
        Observable::new(move |o| {
            let scheduler = scheduler.clone();
            let (d, o_shared) = share(o);
            let timer = Arc::new(TimeoutTimer {
                generation: AtomicU64::new(0),
                current: Mutex::new(None),
            });
            let timer_d = Arc::clone(&timer);
            d.add_teardown(UnsubscribeLogic::Logic(Box::new(move || timer_d.cancel())));
            timer.arm(&o_shared, &d, 0, due, &scheduler);

            let (timer_n, timer_e, timer_c) =
                (Arc::clone(&timer), Arc::clone(&timer), Arc::clone(&timer));
            let d_n = d.clone();
            let o_cloned_n = Arc::clone(&o_shared);
            let o_cloned_e = Arc::clone(&o_shared);
            let o_cloned_c = Arc::clone(&o_shared);
            let u = Subscriber::new(
                move |v| {
                    let armed_at = timer_n.generation.fetch_add(1, Ordering::AcqRel) + 1;
                    o_cloned_n.locked().next(v);
                    timer_n.arm(&o_cloned_n, &d_n, armed_at, due, &scheduler);
                },
                move |observable_error| {
                    timer_e.generation.fetch_add(1, Ordering::AcqRel);
                    timer_e.cancel();
                    o_cloned_e.locked().error(observable_error);
                },
                move || {
                    timer_c.generation.fetch_add(1, Ordering::AcqRel);
                    timer_c.cancel();
                    o_cloned_c.locked().complete();
                },
            );
            self.subscribe(u.chained(d))
        })
    }

    /// Shifts every item and the completion by `duration` on `scheduler`.
    /// Errors are delivered without delay.
    fn delay<S>(mut self, duration: Duration, scheduler: S) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        S: Scheduler + Clone,
        T: Send,
    {
        Observable::new(move |o| {
            let (s_n, s_c) = (scheduler.clone(), scheduler.clone());
            let (d, o_shared) = share(o);
            let o_cloned_n = Arc::clone(&o_shared);
            let o_cloned_e = Arc::clone(&o_shared);
            let u = Subscriber::new(
                move |v| {
                    let o = Arc::clone(&o_cloned_n);
                    s_n.schedule_after(duration, Box::new(move || o.locked().next(v)));
                },
                move |observable_error| o_cloned_e.locked().error(observable_error),
                move || {
                    let o = Arc::clone(&o_shared);
                    s_c.schedule_after(duration, Box::new(move || o.locked().complete()));
                },
            );
            self.subscribe(u.child_of(&d))
        })
    }

    /// Delivers every notification through `scheduler`.
    ///
    /// With a serial scheduler such as `EventLoopScheduler` notifications keep
    /// their order and always arrive on the scheduler's thread.
    fn observe_on<S>(mut self, scheduler: S) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        S: Scheduler + Clone,
        T: Send,
    {
        Observable::new(move |o| {
            let (s_n, s_e, s_c) = (scheduler.clone(), scheduler.clone(), scheduler.clone());
            let (d, o_shared) = share(o);
            let o_cloned_n = Arc::clone(&o_shared);
            let o_cloned_e = Arc::clone(&o_shared);
            let u = Subscriber::new(
                move |v| {
                    let o = Arc::clone(&o_cloned_n);
                    s_n.schedule(Box::new(move || o.locked().next(v)));
                },
                move |observable_error| {
                    let o = Arc::clone(&o_cloned_e);
                    s_e.schedule(Box::new(move || o.locked().error(observable_error)));
                },
                move || {
                    let o = Arc::clone(&o_shared);
                    s_c.schedule(Box::new(move || o.locked().complete()));
                },
            );
            self.subscribe(u.child_of(&d))
        })
    }

    /// Performs the subscription to the source on `scheduler`.
    fn subscribe_on<S>(self, scheduler: S) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        S: Scheduler + Clone,
    {
        let source = Arc::new(Mutex::new(self));
        Observable::new(move |o| {
            let source = Arc::clone(&source);
            let d = o.disposable();
            scheduler.schedule(Box::new(move || {
                if d.is_disposed() {
                    return;
                }
                let s = source.locked().subscribe(o);
                d.adopt(s);
            }))
        })
    }

    /// Shares one subscription to this source between every subscriber, started
    /// by [`Connectable::connect`].
    fn publish(self) -> Connectable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: Clone + Send,
    {
        Connectable::new(self.into_observable())
    }

    /// Shares one subscription to this source while at least one subscriber is
    /// attached, replaying the last `buffer` items to late subscribers.
    ///
    /// The source is disposed when the last subscriber leaves and subscribed
    /// again, with an empty buffer, by the next subscriber.
    fn share_replay(self, buffer: usize) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        T: Clone + Send,
    {
        multicast::share_replay(self.into_observable(), buffer)
    }

    /// Hides the concrete source type behind `Observable`.
    fn into_observable(mut self) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Observable::new(move |o| self.subscribe(o))
    }

    /// Subscribes with a `next` handler only.
    fn subscribe_next(&mut self, f: impl FnMut(T) + Send + 'static) -> Subscription {
        self.subscribe(Subscriber::on_next(f))
    }

    /// Subscribes with handlers for every notification.
    fn subscribe_all(
        &mut self,
        next: impl FnMut(T) + Send + 'static,
        error: impl FnMut(ErrorArc) + Send + 'static,
        complete: impl FnMut() + Send + 'static,
    ) -> Subscription {
        self.subscribe(Subscriber::new(next, error, complete))
    }

    /// Delivers every item to `binder`'s setter on the binder's scheduler.
    ///
    /// Errors are logged and end the binding.
    fn bind_to(&mut self, binder: &Binder<T>) -> Subscription
    where
        T: Send,
    {
        let binder = binder.clone();
        let mut s = Subscriber::on_next(move |v| binder.on_next(v));
        s.on_error(|observable_error| {
            tracing::error!(error = %observable_error, "binding received an error");
        });
        self.subscribe(s)
    }

    /// Forwards every item into `relay`.
    ///
    /// Relays cannot terminate, so completion is ignored and errors are logged.
    fn bind_to_relay<R: Relay<T>>(&mut self, relay: &R) -> Subscription {
        let relay = relay.clone();
        let mut s = Subscriber::on_next(move |v| relay.accept(v));
        s.on_error(|observable_error| {
            tracing::error!(error = %observable_error, "relay binding received an error");
        });
        self.subscribe(s)
    }
}

impl<O, T: 'static> ObservableExt<T> for O where O: Subscribeable<ObsType = T> {}
