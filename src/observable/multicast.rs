//! Module for handling observables with multicast capabilities.
//!
//! `Connectable` shares one subscription to its source between every subscriber,
//! starting the source only when `connect()` is called. `share_replay` does the
//! same automatically: the first subscriber connects, later subscribers receive
//! the most recent values, and the source is disposed when the last subscriber
//! leaves.

use std::sync::{Arc, Mutex};

use crate::{
    observer::Observer,
    subjects::{
        BufSize, ReplaySubject, ReplaySubjectEmitter, ReplaySubjectReceiver, Subject,
        SubjectEmitter, SubjectReceiver,
    },
    subscription::subscribe::{
        Disposable, Subscribeable, Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic,
        Unsubscribeable,
    },
    util::LockExt,
    Observable,
};

/// An observable that starts emitting to its subscribers only once connected.
///
/// Created with [`publish()`]. Subscribers registered before `connect()` receive
/// nothing until the source is connected; from then on every subscriber shares
/// the single source subscription.
///
/// [`publish()`]: ../trait.ObservableExt.html#method.publish
pub struct Connectable<T> {
    source: Arc<Mutex<Observable<T>>>,
    emitter: SubjectEmitter<T>,
    receiver: SubjectReceiver<T>,
    connection: Arc<Mutex<Option<Disposable>>>,
}

impl<T> Clone for Connectable<T> {
    fn clone(&self) -> Self {
        Connectable {
            source: Arc::clone(&self.source),
            emitter: self.emitter.clone(),
            receiver: self.receiver.clone(),
            connection: Arc::clone(&self.connection),
        }
    }
}

impl<T: Clone + Send + 'static> Connectable<T> {
    pub(crate) fn new(source: Observable<T>) -> Self {
        let (emitter, receiver) = Subject::emitter_receiver();
        Connectable {
            source: Arc::new(Mutex::new(source)),
            emitter,
            receiver,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribes the shared subject to the source.
    ///
    /// The returned subscription disconnects the source, and can be used to await
    /// an asynchronous source. Connecting twice returns an inert subscription.
    #[must_use]
    pub fn connect(&self) -> Subscription {
        let mut connection = self.connection.locked();
        if connection.is_some() {
            tracing::trace!("connectable already connected");
            return Subscription::empty();
        }
        let upstream: Subscriber<T> = self.emitter.clone().into();
        let disposable = upstream.disposable();
        *connection = Some(disposable.clone());
        drop(connection);

        tracing::trace!("connectable connecting to source");
        let mut subscription = self.source.locked().subscribe(upstream);
        let handle = subscription.take_handle();
        Subscription::from_parts(disposable, handle)
    }

    /// Returns `true` once `connect()` was called.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.locked().is_some()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for Connectable<T> {
    type ObsType = T;

    fn subscribe(&mut self, s: Subscriber<Self::ObsType>) -> Subscription {
        self.receiver.subscribe(s)
    }
}

struct ShareState<T> {
    current: Option<(ReplaySubjectEmitter<T>, ReplaySubjectReceiver<T>)>,
    connection: Option<Disposable>,
    subscribers: usize,
    generation: u64,
}

impl<T> ShareState<T> {
    fn reset(&mut self, generation: u64) -> Option<Disposable> {
        if self.generation != generation {
            return None;
        }
        self.current = None;
        self.subscribers = 0;
        self.connection.take()
    }
}

pub(crate) fn share_replay<T: Clone + Send + 'static>(
    source: Observable<T>,
    buffer: usize,
) -> Observable<T> {
    let source = Arc::new(Mutex::new(source));
    let state = Arc::new(Mutex::new(ShareState {
        current: None,
        connection: None,
        subscribers: 0,
        generation: 0,
    }));

    Observable::new(move |o| {
        let (mut receiver, connect_with, generation) = {
            let mut st = state.locked();
            let fresh = st.current.is_none();
            if fresh {
                st.generation += 1;
            }
            st.subscribers += 1;
            let (emitter, receiver) = st
                .current
                .get_or_insert_with(|| ReplaySubject::emitter_receiver(BufSize::Bounded(buffer)))
                .clone();
            (receiver, fresh.then_some(emitter), st.generation)
        };

        let mut handle = SubscriptionHandle::Nil;
        receiver.subscribe(o);

        if let Some(emitter) = connect_with {
            tracing::trace!(generation, "share_replay connecting to source");
            let mut en = emitter.clone();
            let mut ee = emitter.clone();
            let mut ec = emitter;
            let state_e = Arc::clone(&state);
            let state_c = Arc::clone(&state);
            let upstream = Subscriber::new(
                move |v| en.next(v),
                move |e| {
                    state_e.locked().reset(generation);
                    ee.error(e);
                },
                move || {
                    state_c.locked().reset(generation);
                    ec.complete();
                },
            );
            let mut subscription = source.locked().subscribe(upstream);
            handle = subscription.take_handle();

            let mut st = state.locked();
            if st.generation == generation && st.current.is_some() {
                st.connection = Some(subscription.disposable());
            } else {
                drop(st);
                subscription.unsubscribe();
            }
        }

        let state = Arc::clone(&state);
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                let stale = {
                    let mut st = state.locked();
                    if st.generation != generation {
                        return;
                    }
                    st.subscribers = st.subscribers.saturating_sub(1);
                    if st.subscribers > 0 {
                        return;
                    }
                    st.reset(generation)
                };
                if let Some(connection) = stale {
                    tracing::trace!(generation, "share_replay disconnecting from source");
                    connection.dispose();
                }
            })),
            handle,
        )
    })
}
