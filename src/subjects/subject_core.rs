use std::{
    collections::VecDeque,
    mem,
    sync::{Arc, Mutex, Weak},
    time::{Duration, Instant},
};

use crate::{
    observable::Event,
    observer::Observer,
    subscription::subscribe::{
        Disposable, Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic,
    },
    util::LockExt,
};

use super::BufSize;

type SharedSubscriber<T> = Arc<Mutex<Subscriber<T>>>;

/// What a subject keeps around for subscribers that arrive later.
pub(crate) enum Retention<T> {
    /// Nothing is replayed.
    None,

    /// The current value, replayed on subscribe.
    Latest(T),

    /// The most recent values, optionally expiring after `window`.
    Buffer {
        values: VecDeque<(T, Instant)>,
        size: BufSize,
        window: Option<Duration>,
    },
}

impl<T: Clone> Retention<T> {
    pub(crate) fn buffer(size: BufSize, window: Option<Duration>, capacity: usize) -> Self {
        Retention::Buffer {
            values: VecDeque::with_capacity(capacity),
            size,
            window,
        }
    }

    fn record(&mut self, v: &T) {
        match self {
            Retention::None => (),
            Retention::Latest(current) => *current = v.clone(),
            Retention::Buffer { values, size, .. } => match *size {
                BufSize::Unbounded => values.push_back((v.clone(), Instant::now())),
                BufSize::Bounded(0) => (),
                BufSize::Bounded(n) => {
                    while values.len() >= n {
                        values.pop_front();
                    }
                    values.push_back((v.clone(), Instant::now()));
                }
            },
        }
    }

    fn replay(&mut self) -> Vec<T> {
        match self {
            Retention::None => Vec::new(),
            Retention::Latest(current) => vec![current.clone()],
            Retention::Buffer { values, window, .. } => {
                if let Some(window) = *window {
                    values.retain(|(_, at)| at.elapsed() <= window);
                }
                values.iter().map(|(v, _)| v.clone()).collect()
            }
        }
    }
}

enum Op<T> {
    Emit(Event<T>),
    Attach(SharedSubscriber<T>, Disposable),
}

enum Delivery<T> {
    Fanout(Vec<SharedSubscriber<T>>, Event<T>),
    Replay(SharedSubscriber<T>, Vec<T>, Option<Event<T>>),
    Skip,
}

impl<T: Clone> Delivery<T> {
    fn run(self) {
        match self {
            Delivery::Fanout(observers, event) => {
                for o in observers {
                    event.clone().deliver(&mut *o.locked());
                }
            }
            Delivery::Replay(o, values, terminal) => {
                let mut o = o.locked();
                for v in values {
                    o.next(v);
                }
                if let Some(t) = terminal {
                    t.deliver(&mut *o);
                }
            }
            Delivery::Skip => (),
        }
    }
}

struct Entry<T> {
    disposable: Disposable,
    subscriber: SharedSubscriber<T>,
}

struct CoreState<T> {
    observers: Vec<Entry<T>>,
    terminal: Option<Event<T>>,
    retention: Retention<T>,
    closed: bool,
    delivering: bool,
    pending: VecDeque<Op<T>>,
}

impl<T: Clone> CoreState<T> {
    fn prepare(&mut self, op: Op<T>) -> Delivery<T> {
        if self.closed {
            tracing::trace!("subject closed, dropping operation");
            return Delivery::Skip;
        }
        match op {
            Op::Emit(event) => {
                if self.terminal.is_some() {
                    tracing::trace!("subject already terminated, ignoring event");
                    return Delivery::Skip;
                }
                match &event {
                    Event::Next(v) => {
                        self.retention.record(v);
                        let observers = self
                            .observers
                            .iter()
                            .map(|e| Arc::clone(&e.subscriber))
                            .collect();
                        Delivery::Fanout(observers, event)
                    }
                    Event::Error(_) | Event::Completed => {
                        tracing::debug!(
                            errored = matches!(event, Event::Error(_)),
                            observers = self.observers.len(),
                            "subject terminated"
                        );
                        self.terminal = Some(event.clone());
                        let observers = mem::take(&mut self.observers)
                            .into_iter()
                            .map(|e| e.subscriber)
                            .collect();
                        Delivery::Fanout(observers, event)
                    }
                }
            }
            Op::Attach(o, disposable) => {
                if let Some(terminal) = &self.terminal {
                    return Delivery::Replay(o, Vec::new(), Some(terminal.clone()));
                }
                let replay = self.retention.replay();
                self.observers.push(Entry {
                    disposable,
                    subscriber: Arc::clone(&o),
                });
                Delivery::Replay(o, replay, None)
            }
        }
    }
}

/// Resets the delivery flag if a subscriber callback unwinds mid delivery.
struct DeliveryGuard<'a, T>(&'a Mutex<CoreState<T>>);

impl<T> Drop for DeliveryGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut state = self.0.locked();
            state.delivering = false;
            state.pending.clear();
        }
    }
}

/// Shared, serialized state behind every subject and relay.
///
/// All emissions and subscriber attachments pass through one queue. The thread
/// that finds the queue idle becomes the deliverer and drains it; any emission
/// arriving meanwhile, from another thread or reentrantly from a callback, is
/// appended and delivered in order by that same thread. One event's fan-out
/// therefore always completes before the next event starts, and no lock is
/// held while user callbacks run.
pub(crate) struct SubjectCore<T>(Arc<Mutex<CoreState<T>>>);

impl<T> Clone for SubjectCore<T> {
    fn clone(&self) -> Self {
        SubjectCore(Arc::clone(&self.0))
    }
}

impl<T: Clone + Send + 'static> SubjectCore<T> {
    pub(crate) fn new(retention: Retention<T>) -> Self {
        SubjectCore(Arc::new(Mutex::new(CoreState {
            observers: Vec::with_capacity(16),
            terminal: None,
            retention,
            closed: false,
            delivering: false,
            pending: VecDeque::new(),
        })))
    }

    pub(crate) fn emit(&self, event: Event<T>) {
        self.dispatch(Op::Emit(event));
    }

    /// Registers `v`, replaying retained values to it before any live event.
    pub(crate) fn attach(&self, v: Subscriber<T>) -> Subscription {
        let disposable = v.disposable();
        if self.0.locked().closed {
            return Subscription::new(UnsubscribeLogic::Nil, SubscriptionHandle::Nil);
        }
        let shared = Arc::new(Mutex::new(v));
        let weak: Weak<Mutex<CoreState<T>>> = Arc::downgrade(&self.0);
        let detached = Arc::downgrade(&shared);

        disposable.add_teardown(UnsubscribeLogic::Logic(Box::new(move || {
            if let Some(state) = weak.upgrade() {
                state
                    .locked()
                    .observers
                    .retain(|e| Arc::as_ptr(&e.subscriber) != detached.as_ptr());
            }
        })));

        self.dispatch(Op::Attach(shared, disposable.clone()));
        Subscription::from_parts(disposable, SubscriptionHandle::Nil)
    }

    fn dispatch(&self, op: Op<T>) {
        {
            let mut state = self.0.locked();
            state.pending.push_back(op);
            if state.delivering {
                return;
            }
            state.delivering = true;
        }
        let _guard = DeliveryGuard(&self.0);
        loop {
            let delivery = {
                let mut state = self.0.locked();
                match state.pending.pop_front() {
                    Some(op) => state.prepare(op),
                    None => {
                        state.delivering = false;
                        return;
                    }
                }
            };
            delivery.run();
        }
    }

    pub(crate) fn latest(&self) -> Option<T> {
        match &self.0.locked().retention {
            Retention::Latest(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.0.locked().observers.len()
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.0.locked().terminal.is_some()
    }

    /// Drops every subscriber and stops accepting emissions and subscriptions.
    pub(crate) fn close(&self) {
        let observers = {
            let mut state = self.0.locked();
            state.closed = true;
            mem::take(&mut state.observers)
        };
        tracing::debug!(observers = observers.len(), "subject closed");
        for entry in observers {
            entry.disposable.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collecting(sink: Arc<Mutex<Vec<Event<i32>>>>) -> Subscriber<i32> {
        let (n, e, c) = (Arc::clone(&sink), Arc::clone(&sink), sink);
        Subscriber::new(
            move |v| n.lock().unwrap().push(Event::Next(v)),
            move |err| e.lock().unwrap().push(Event::Error(err)),
            move || c.lock().unwrap().push(Event::Completed),
        )
    }

    #[test]
    fn reentrant_emission_is_queued_after_current_fanout() {
        let core = SubjectCore::new(Retention::None);
        let order = Arc::new(Mutex::new(Vec::new()));

        let core_c = core.clone();
        let order_a = Arc::clone(&order);
        core.attach(Subscriber::on_next(move |v: i32| {
            order_a.lock().unwrap().push(("a", v));
            if v == 1 {
                core_c.emit(Event::Next(2));
            }
        }));
        let order_b = Arc::clone(&order);
        core.attach(Subscriber::on_next(move |v: i32| {
            order_b.lock().unwrap().push(("b", v));
        }));

        core.emit(Event::Next(1));

        assert_eq!(
            *order.lock().unwrap(),
            vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]
        );
    }

    #[test]
    fn bounded_buffer_keeps_most_recent() {
        let core = SubjectCore::new(Retention::buffer(BufSize::Bounded(2), None, 2));
        for v in 1..=4 {
            core.emit(Event::Next(v));
        }
        let sink = Arc::new(Mutex::new(Vec::new()));
        core.attach(collecting(Arc::clone(&sink)));

        assert_eq!(*sink.lock().unwrap(), vec![Event::Next(3), Event::Next(4)]);
    }

    #[test]
    fn disposed_subscriber_is_detached() {
        let core = SubjectCore::new(Retention::None);
        let sink = Arc::new(Mutex::new(Vec::new()));
        let s = core.attach(collecting(Arc::clone(&sink)));
        assert_eq!(core.len(), 1);

        s.disposable().dispose();
        core.emit(Event::Next(1));

        assert_eq!(core.len(), 0);
        assert!(sink.lock().unwrap().is_empty());
    }

    #[test]
    fn close_rejects_later_subscribers() {
        let core = SubjectCore::new(Retention::Latest(0));
        core.close();
        let sink = Arc::new(Mutex::new(Vec::new()));
        core.attach(collecting(Arc::clone(&sink)));
        core.emit(Event::Next(1));

        assert!(sink.lock().unwrap().is_empty());
        assert_eq!(core.len(), 0);
    }
}
