use std::marker::PhantomData;

use crate::{
    observable::Event,
    observer::Observer,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    ErrorArc, Observable,
};

use super::subject_core::{Retention, SubjectCore};

/// A subject that always holds a current value.
///
/// Created with a seed. Every new subscriber first receives the current value,
/// then live events. The current value can be read synchronously with `value()`
/// from either half. After termination new subscribers receive only the terminal
/// event; the last value stays readable.
///
/// # Examples
///
/// ```no_run
/// use rxcore::{subjects::BehaviorSubject, subscribe::Subscriber, Observer, Subscribeable};
///
/// let (mut emitter, mut receiver) = BehaviorSubject::emitter_receiver("Initial value");
///
/// receiver.subscribe(Subscriber::on_next(|v| println!("1) {}", v))); // 1) Initial value
/// emitter.next("X"); // 1) X
/// assert_eq!(receiver.value(), "X");
/// ```
pub struct BehaviorSubject<T> {
    _marker: PhantomData<T>,
}

impl<T: Clone + Send + 'static> BehaviorSubject<T> {
    /// Creates a new behavior subject seeded with `value`.
    #[must_use]
    pub fn emitter_receiver(value: T) -> (BehaviorSubjectEmitter<T>, BehaviorSubjectReceiver<T>) {
        let core = SubjectCore::new(Retention::Latest(value));
        (
            BehaviorSubjectEmitter(core.clone()),
            BehaviorSubjectReceiver(core),
        )
    }
}

/// Subscribing half of a [`BehaviorSubject`].
pub struct BehaviorSubjectReceiver<T>(SubjectCore<T>);

/// Emitting half of a [`BehaviorSubject`].
pub struct BehaviorSubjectEmitter<T>(SubjectCore<T>);

impl<T> Clone for BehaviorSubjectReceiver<T> {
    fn clone(&self) -> Self {
        BehaviorSubjectReceiver(self.0.clone())
    }
}

impl<T> Clone for BehaviorSubjectEmitter<T> {
    fn clone(&self) -> Self {
        BehaviorSubjectEmitter(self.0.clone())
    }
}

fn current<T: Clone + Send + 'static>(core: &SubjectCore<T>) -> T {
    match core.latest() {
        Some(v) => v,
        None => unreachable!("behavior subject always retains its latest value"),
    }
}

impl<T: Clone + Send + 'static> BehaviorSubjectReceiver<T> {
    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> T {
        current(&self.0)
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + 'static> BehaviorSubjectEmitter<T> {
    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> T {
        current(&self.0)
    }
}

impl<T: Clone + Send + 'static> Subscribeable for BehaviorSubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        self.0.attach(v)
    }
}

impl<T: Clone + Send + 'static> Unsubscribeable for BehaviorSubjectReceiver<T> {
    fn unsubscribe(self) {
        self.0.close();
    }
}

impl<T: Clone + Send + 'static> Observer for BehaviorSubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        self.0.emit(Event::Next(v));
    }

    fn error(&mut self, e: ErrorArc) {
        self.0.emit(Event::Error(e));
    }

    fn complete(&mut self) {
        self.0.emit(Event::Completed);
    }
}

impl<T: Clone + Send + 'static> From<BehaviorSubjectEmitter<T>> for Subscriber<T> {
    fn from(value: BehaviorSubjectEmitter<T>) -> Self {
        let mut vn = value.clone();
        let mut ve = value.clone();
        let mut vc = value;
        Subscriber::new(
            move |v| vn.next(v),
            move |e| ve.error(e),
            move || vc.complete(),
        )
    }
}

impl<T: Clone + Send + 'static> From<BehaviorSubjectReceiver<T>> for Observable<T> {
    fn from(mut value: BehaviorSubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn seed_is_replayed_then_live_values() {
        let (mut emitter, mut receiver) = BehaviorSubject::emitter_receiver(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_c = Arc::clone(&seen);
        receiver.subscribe(Subscriber::on_next(move |v: i32| seen_c.lock().unwrap().push(v)));
        emitter.next(1);

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
        assert_eq!(emitter.value(), 1);
        assert_eq!(receiver.value(), 1);
    }
}
