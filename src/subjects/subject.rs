use std::marker::PhantomData;

use crate::{
    observable::Event,
    observer::Observer,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    ErrorArc, Observable,
};

use super::subject_core::{Retention, SubjectCore};

/// Multicasts values to every currently registered subscriber.
///
/// A `Subject` keeps no values. Subscribers receive only the events emitted after
/// they subscribed. Once the subject completes or errors, every later subscriber
/// immediately receives that same terminal event and nothing else.
///
/// The subject is split into a [`SubjectEmitter`], which is an `Observer`, and a
/// [`SubjectReceiver`], which can be subscribed to and supports every operator of
/// `ObservableExt`. Both halves are cheap to clone and share the same state.
///
/// # Examples
///
/// ```no_run
/// use rxcore::{subjects::Subject, subscribe::Subscriber, Observer, Subscribeable};
///
/// let (mut emitter, mut receiver) = Subject::emitter_receiver();
///
/// receiver.subscribe(Subscriber::on_next(|v: i32| println!("first: {}", v)));
/// emitter.next(1); // first: 1
///
/// receiver.subscribe(Subscriber::on_next(|v: i32| println!("second: {}", v)));
/// emitter.next(2); // first: 2, second: 2
///
/// emitter.complete();
/// emitter.next(3); // ignored
/// ```
pub struct Subject<T> {
    _marker: PhantomData<T>,
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Creates a new subject and returns its emitting and receiving halves.
    #[must_use]
    pub fn emitter_receiver() -> (SubjectEmitter<T>, SubjectReceiver<T>) {
        let core = SubjectCore::new(Retention::None);
        (SubjectEmitter(core.clone()), SubjectReceiver(core))
    }
}

/// Subscribing half of a [`Subject`].
pub struct SubjectReceiver<T>(SubjectCore<T>);

/// Emitting half of a [`Subject`].
pub struct SubjectEmitter<T>(SubjectCore<T>);

impl<T> Clone for SubjectReceiver<T> {
    fn clone(&self) -> Self {
        SubjectReceiver(self.0.clone())
    }
}

impl<T> Clone for SubjectEmitter<T> {
    fn clone(&self) -> Self {
        SubjectEmitter(self.0.clone())
    }
}

impl<T: Clone + Send + 'static> SubjectReceiver<T> {
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

    /// Returns `true` once the subject completed or errored.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.0.is_terminated()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for SubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        self.0.attach(v)
    }
}

impl<T: Clone + Send + 'static> Unsubscribeable for SubjectReceiver<T> {
    /// Disposes every registered subscriber and closes the subject. A closed subject
    /// ignores emissions and new subscriptions.
    fn unsubscribe(self) {
        self.0.close();
    }
}

impl<T: Clone + Send + 'static> Observer for SubjectEmitter<T> {
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

impl<T: Clone + Send + 'static> From<SubjectEmitter<T>> for Subscriber<T> {
    fn from(value: SubjectEmitter<T>) -> Self {
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

impl<T: Clone + Send + 'static> From<SubjectReceiver<T>> for Observable<T> {
    fn from(mut value: SubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}
