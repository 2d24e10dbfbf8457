use crate::{
    observable::Event,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription},
    Observable,
};

use super::subject_core::{Retention, SubjectCore};

/// A subject that can never terminate.
///
/// Relays only expose `accept`; there is no way to send `error` or `complete`
/// through them, so subscribers stay attached until they unsubscribe.
pub struct PublishRelay<T>(SubjectCore<T>);

/// A relay that always holds a current value, readable with [`value`].
///
/// [`value`]: struct.BehaviorRelay.html#method.value
pub struct BehaviorRelay<T>(SubjectCore<T>);

impl<T> Clone for PublishRelay<T> {
    fn clone(&self) -> Self {
        PublishRelay(self.0.clone())
    }
}

impl<T> Clone for BehaviorRelay<T> {
    fn clone(&self) -> Self {
        BehaviorRelay(self.0.clone())
    }
}

impl<T: Clone + Send + 'static> PublishRelay<T> {
    /// Creates a relay with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        PublishRelay(SubjectCore::new(Retention::None))
    }

    /// Delivers `v` to every current subscriber.
    pub fn accept(&self, v: T) {
        self.0.emit(Event::Next(v));
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + 'static> Default for PublishRelay<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> BehaviorRelay<T> {
    /// Creates a relay holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        BehaviorRelay(SubjectCore::new(Retention::Latest(value)))
    }

    /// Replaces the current value and delivers it to every subscriber.
    pub fn accept(&self, v: T) {
        self.0.emit(Event::Next(v));
    }

    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> T {
        match self.0.latest() {
            Some(v) => v,
            None => unreachable!("behavior relay always retains its latest value"),
        }
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accepting side shared by both relays, used by `bind_to_relay`.
pub trait Relay<T>: Clone + Send + Sync + 'static {
    fn accept(&self, v: T);
}

impl<T: Clone + Send + 'static> Relay<T> for PublishRelay<T> {
    fn accept(&self, v: T) {
        self.0.emit(Event::Next(v));
    }
}

impl<T: Clone + Send + 'static> Relay<T> for BehaviorRelay<T> {
    fn accept(&self, v: T) {
        self.0.emit(Event::Next(v));
    }
}

impl<T: Clone + Send + 'static> Subscribeable for PublishRelay<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        self.0.attach(v)
    }
}

impl<T: Clone + Send + 'static> Subscribeable for BehaviorRelay<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        self.0.attach(v)
    }
}

impl<T: Clone + Send + 'static> From<PublishRelay<T>> for Observable<T> {
    fn from(mut value: PublishRelay<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}

impl<T: Clone + Send + 'static> From<BehaviorRelay<T>> for Observable<T> {
    fn from(mut value: BehaviorRelay<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}
