use std::{marker::PhantomData, time::Duration};

use crate::{
    config::ReplayConfig,
    observable::Event,
    observer::Observer,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    ErrorArc, Observable,
};

use super::subject_core::{Retention, SubjectCore};

/// Specifies the buffer size for replaying previous emissions in `ReplaySubject`
/// when using either [`emitter_receiver`] or [`emitter_receiver_time_aware`].
///
/// [`emitter_receiver`]: struct.ReplaySubject.html#method.emitter_receiver
/// [`emitter_receiver_time_aware`]: struct.ReplaySubject.html#method.emitter_receiver_time_aware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufSize {
    /// Specifies an infinite buffer size, allowing all emitted values to be replayed.
    Unbounded,

    /// Specifies a limited buffer size with the maximum number of values to be replayed.
    Bounded(usize),
}

impl BufSize {
    pub(crate) fn bound(self) -> Option<usize> {
        match self {
            BufSize::Unbounded => None,
            BufSize::Bounded(n) => Some(n),
        }
    }
}

/// Replays buffered values to new subscribers.
///
/// A `ReplaySubject` records the last `n` values (or every value with
/// [`BufSize::Unbounded`]) and delivers them, oldest first, to each new subscriber
/// before any live event. With [`emitter_receiver_time_aware`] values also expire
/// once they are older than the given window.
///
/// Once the subject completes or errors, new subscribers receive only the
/// terminal event, not the buffered values.
///
/// [`emitter_receiver_time_aware`]: struct.ReplaySubject.html#method.emitter_receiver_time_aware
///
/// # Examples
///
/// ```no_run
/// use rxcore::{
///     subjects::{BufSize, ReplaySubject},
///     subscribe::Subscriber,
///     Observer, Subscribeable,
/// };
///
/// let (mut emitter, mut receiver) = ReplaySubject::emitter_receiver(BufSize::Bounded(2));
///
/// emitter.next(1);
/// emitter.next(2);
/// emitter.next(3);
///
/// // Prints 2 and 3, then every later value.
/// receiver.subscribe(Subscriber::on_next(|v: i32| println!("{}", v)));
/// ```
pub struct ReplaySubject<T> {
    _marker: PhantomData<T>,
}

impl<T: Clone + Send + 'static> ReplaySubject<T> {
    /// Creates a `ReplaySubject` that replays up to `buf_size` values.
    #[must_use]
    pub fn emitter_receiver(
        buf_size: BufSize,
    ) -> (ReplaySubjectEmitter<T>, ReplaySubjectReceiver<T>) {
        Self::with_config(buf_size, None, &ReplayConfig::default())
    }

    /// Creates a `ReplaySubject` whose buffered values also expire after `window`.
    #[must_use]
    pub fn emitter_receiver_time_aware(
        buf_size: BufSize,
        window: Duration,
    ) -> (ReplaySubjectEmitter<T>, ReplaySubjectReceiver<T>) {
        Self::with_config(buf_size, Some(window), &ReplayConfig::default())
    }

    /// Creates a `ReplaySubject` with explicit buffer pre-allocation settings.
    #[must_use]
    pub fn with_config(
        buf_size: BufSize,
        window: Option<Duration>,
        config: &ReplayConfig,
    ) -> (ReplaySubjectEmitter<T>, ReplaySubjectReceiver<T>) {
        let capacity = config.capacity_for(buf_size.bound());
        let core = SubjectCore::new(Retention::buffer(buf_size, window, capacity));
        (ReplaySubjectEmitter(core.clone()), ReplaySubjectReceiver(core))
    }
}

/// Subscribing half of a [`ReplaySubject`].
pub struct ReplaySubjectReceiver<T>(SubjectCore<T>);

/// Emitting half of a [`ReplaySubject`].
pub struct ReplaySubjectEmitter<T>(SubjectCore<T>);

impl<T> Clone for ReplaySubjectReceiver<T> {
    fn clone(&self) -> Self {
        ReplaySubjectReceiver(self.0.clone())
    }
}

impl<T> Clone for ReplaySubjectEmitter<T> {
    fn clone(&self) -> Self {
        ReplaySubjectEmitter(self.0.clone())
    }
}

impl<T: Clone + Send + 'static> ReplaySubjectReceiver<T> {
    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + 'static> Subscribeable for ReplaySubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        self.0.attach(v)
    }
}

impl<T: Clone + Send + 'static> Unsubscribeable for ReplaySubjectReceiver<T> {
    fn unsubscribe(self) {
        self.0.close();
    }
}

impl<T: Clone + Send + 'static> Observer for ReplaySubjectEmitter<T> {
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

impl<T: Clone + Send + 'static> From<ReplaySubjectEmitter<T>> for Subscriber<T> {
    fn from(value: ReplaySubjectEmitter<T>) -> Self {
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

impl<T: Clone + Send + 'static> From<ReplaySubjectReceiver<T>> for Observable<T> {
    fn from(mut value: ReplaySubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}
