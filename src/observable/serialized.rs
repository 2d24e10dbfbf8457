use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::{
    subscription::subscribe::{Disposable, Subscriber},
    util::LockExt,
    ErrorArc,
};

use super::Event;

struct Drain<T> {
    pending: VecDeque<Event<T>>,
    delivering: bool,
}

struct Inner<T> {
    subscriber: Mutex<Subscriber<T>>,
    drain: Mutex<Drain<T>>,
}

/// Resets the drain if a subscriber callback unwinds mid delivery.
struct DrainGuard<'a, T>(&'a Mutex<Drain<T>>);

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut drain = self.0.locked();
            drain.delivering = false;
            drain.pending.clear();
        }
    }
}

/// Downstream fed by several sources at once.
///
/// Notifications arriving while another one is being delivered, reentrantly from
/// a subscriber callback or from another thread, are queued and delivered in
/// order by the thread already delivering. Only the subscriber itself is locked
/// across a callback, and only by the delivering thread.
pub(crate) struct Serialized<T>(Arc<Inner<T>>);

impl<T> Clone for Serialized<T> {
    fn clone(&self) -> Self {
        Serialized(Arc::clone(&self.0))
    }
}

impl<T> Serialized<T> {
    pub(crate) fn new(o: Subscriber<T>) -> (Disposable, Self) {
        let d = o.disposable();
        let inner = Inner {
            subscriber: Mutex::new(o),
            drain: Mutex::new(Drain {
                pending: VecDeque::new(),
                delivering: false,
            }),
        };
        (d, Serialized(Arc::new(inner)))
    }

    pub(crate) fn next(&self, v: T) {
        self.emit(Event::Next(v));
    }

    pub(crate) fn error(&self, observable_error: ErrorArc) {
        self.emit(Event::Error(observable_error));
    }

    pub(crate) fn complete(&self) {
        self.emit(Event::Completed);
    }

    fn emit(&self, event: Event<T>) {
        {
            let mut drain = self.0.drain.locked();
            drain.pending.push_back(event);
            if drain.delivering {
                return;
            }
            drain.delivering = true;
        }
        let _guard = DrainGuard(&self.0.drain);
        loop {
            let event = {
                let mut drain = self.0.drain.locked();
                match drain.pending.pop_front() {
                    Some(event) => event,
                    None => {
                        drain.delivering = false;
                        return;
                    }
                }
            };
            let mut o = self.0.subscriber.locked();
            event.deliver(&mut *o);
        }
    }
}
