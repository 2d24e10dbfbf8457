use std::{
    any::Any,
    future::Future,
    mem,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle as ThreadJoinHandle,
};

use tokio::runtime;
use tokio::task::JoinHandle;

use crate::{
    observer::Observer, subscription::dispose_bag::DisposeBag, util::LockExt, ErrorArc,
};

/// A trait for types that can be subscribed to, allowing consumers to receive
/// values emitted by an observable stream.
pub trait Subscribeable {
    /// The type of items emitted by the observable stream.
    type ObsType;

    /// Subscribes to the observable stream and specifies how to handle emitted values.
    ///
    /// The implementation establishes the subscription and manages the delivery of
    /// values to the subscriber. It must return immediately for asynchronous
    /// producers; synchronous producers may emit before returning.
    ///
    /// The returned `Subscription` allows the subscriber to manage the subscription,
    /// such as unsubscribing or awaiting a background producer.
    fn subscribe(&mut self, s: Subscriber<Self::ObsType>) -> Subscription;
}

/// A trait for types that can be unsubscribed, allowing the clean release of resources
/// associated with a subscription.
pub trait Unsubscribeable {
    /// Unsubscribes from a subscription and releases associated resources.
    ///
    /// After this call no further callbacks reach the subscriber, even if the
    /// producer still has emissions in flight on another thread.
    fn unsubscribe(self);
}

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(ErrorArc) + Send>;

/// A type that acts as an observer, allowing users to handle emitted values, errors,
/// and completion when subscribing to an `Observable` or `Subject`.
///
/// Every `Subscriber` owns a [`Disposable`]. Once that disposable is disposed, or
/// once the subscriber received `error` or `complete`, all further notifications
/// are ignored.
pub struct Subscriber<NextFnType> {
    next_fn: NextFn<NextFnType>,
    complete_fn: Option<CompleteFn>,
    error_fn: Option<ErrorFn>,
    disposable: Disposable,
    stopped: bool,
}

impl<NextFnType> Subscriber<NextFnType> {
    /// Creates a new `Subscriber` instance with custom handling functions for emitted
    /// values, errors, and completion.
    pub fn new(
        next_fn: impl FnMut(NextFnType) + 'static + Send,
        error_fn: impl FnMut(ErrorArc) + 'static + Send,
        complete_fn: impl FnMut() + 'static + Send,
    ) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: Some(Box::new(complete_fn)),
            error_fn: Some(Box::new(error_fn)),
            disposable: Disposable::new(),
            stopped: false,
        }
    }

    /// Create a new Subscriber with the provided `next` function.
    pub fn on_next(next_fn: impl FnMut(NextFnType) + 'static + Send) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: None,
            error_fn: None,
            disposable: Disposable::new(),
            stopped: false,
        }
    }

    /// Set the completion function for the Subscriber.
    pub fn on_complete(&mut self, complete_fn: impl FnMut() + 'static + Send) {
        self.complete_fn = Some(Box::new(complete_fn));
    }

    /// Set the error-handling function for the Subscriber.
    pub fn on_error(&mut self, error_fn: impl FnMut(ErrorArc) + 'static + Send) {
        self.error_fn = Some(Box::new(error_fn));
    }

    /// Returns `true` once this subscriber will ignore further notifications.
    ///
    /// Synchronous producers should poll this between emissions so an operator
    /// such as `take` can stop an otherwise endless loop.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.stopped || self.disposable.is_disposed()
    }

    /// Makes this subscriber share `disposable` with the subscriber it feeds.
    ///
    /// Used by operators that forward to a single downstream: disposing either
    /// end silences both and runs the upstream teardown.
    pub(crate) fn chained(mut self, disposable: Disposable) -> Self {
        self.disposable = disposable;
        self
    }

    /// Keeps this subscriber's own disposable but disposes it together with
    /// `parent`.
    pub(crate) fn child_of(self, parent: &Disposable) -> Self {
        let child = self.disposable.clone();
        parent.add_teardown(UnsubscribeLogic::Logic(Box::new(move || child.dispose())));
        self
    }

    /// Returns a handle to this subscriber's disposable.
    ///
    /// Disposing it silences the subscriber and runs the teardown of the
    /// subscription it is attached to.
    #[must_use]
    pub fn disposable(&self) -> Disposable {
        self.disposable.clone()
    }
}

impl<T> Observer for Subscriber<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        if self.is_closed() {
            return;
        }
        (self.next_fn)(v);
    }

    fn complete(&mut self) {
        if self.is_closed() {
            return;
        }
        self.stopped = true;
        if let Some(cfn) = &mut self.complete_fn {
            (cfn)();
        }
        // Completed chains release their upstream resources.
        self.disposable.dispose();
    }

    fn error(&mut self, observable_error: ErrorArc) {
        if self.is_closed() {
            return;
        }
        self.stopped = true;
        match &mut self.error_fn {
            Some(efn) => (efn)(observable_error),
            None => tracing::warn!(error = %observable_error, "unhandled error notification"),
        }
        self.disposable.dispose();
    }
}

/// Cloneable cancellation handle.
///
/// A `Disposable` carries one `disposed` flag and a list of teardown actions.
/// `dispose` is idempotent: the first call flips the flag and runs every
/// teardown exactly once, later calls do nothing. Teardown added after disposal
/// runs immediately.
#[derive(Clone)]
pub struct Disposable(Arc<DisposableInner>);

struct DisposableInner {
    disposed: AtomicBool,
    teardown: Mutex<Vec<UnsubscribeLogic>>,
    runtime_handle: Option<runtime::Handle>,
}

impl Disposable {
    /// Creates a disposable with no teardown attached.
    #[must_use]
    pub fn new() -> Self {
        Disposable(Arc::new(DisposableInner {
            disposed: AtomicBool::new(false),
            teardown: Mutex::new(Vec::new()),
            runtime_handle: runtime::Handle::try_current().ok(),
        }))
    }

    /// Creates a disposable that runs `logic` when disposed.
    #[must_use]
    pub fn with_logic(logic: UnsubscribeLogic) -> Self {
        let d = Disposable::new();
        d.add_teardown(logic);
        d
    }

    /// Returns `true` after the first call to `dispose`.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.0.disposed.load(Ordering::Acquire)
    }

    /// Disposes this handle, running its teardown exactly once.
    pub fn dispose(&self) {
        if self.0.disposed.swap(true, Ordering::AcqRel) {
            tracing::trace!("dispose called on an already disposed handle");
            return;
        }
        let teardown = mem::take(&mut *self.0.teardown.locked());
        for logic in teardown {
            logic.run(self.0.runtime_handle.as_ref());
        }
    }

    /// Attaches teardown logic, running it right away if already disposed.
    pub fn add_teardown(&self, logic: UnsubscribeLogic) {
        if let UnsubscribeLogic::Nil = logic {
            return;
        }
        let mut teardown = self.0.teardown.locked();
        if self.is_disposed() {
            drop(teardown);
            logic.run(self.0.runtime_handle.as_ref());
            return;
        }
        teardown.push(logic);
    }

    /// Ties `subscription` to this handle, returning its join handle.
    ///
    /// A subscription sharing this very disposable is not attached to itself.
    pub(crate) fn adopt(&self, mut subscription: Subscription) -> SubscriptionHandle {
        let handle = subscription.take_handle();
        if !Arc::ptr_eq(&self.0, &subscription.disposable.0) {
            self.add_teardown(UnsubscribeLogic::Wrapped(Box::new(subscription)));
        }
        handle
    }
}

impl Default for Disposable {
    fn default() -> Self {
        Disposable::new()
    }
}

type AwaitResult<T> = Result<T, Box<dyn Any + Send>>;

/// Enumeration representing different types of handles used by `Subscription` to
/// await asynchronous tasks or threads.
pub enum SubscriptionHandle {
    /// No specific handle for task or thread awaiting.
    Nil,

    /// Holds a join handle for awaiting an asynchronous observable using Tokio task.
    JoinTask(JoinHandle<()>),

    /// Holds a join handle for awaiting an asynchronous observable using OS thread.
    JoinThread(ThreadJoinHandle<()>),

    /// Handles of every source of a combining operator such as `merge`.
    JoinAll(Vec<SubscriptionHandle>),
}

impl SubscriptionHandle {
    fn is_nil(&self) -> bool {
        match self {
            SubscriptionHandle::Nil => true,
            SubscriptionHandle::JoinAll(handles) => handles.iter().all(SubscriptionHandle::is_nil),
            _ => false,
        }
    }

    /// Collects several handles, dropping the ones with nothing to await.
    pub(crate) fn all(handles: Vec<SubscriptionHandle>) -> SubscriptionHandle {
        let mut handles: Vec<_> = handles.into_iter().filter(|h| !h.is_nil()).collect();
        match handles.len() {
            0 => SubscriptionHandle::Nil,
            1 => handles.remove(0),
            _ => SubscriptionHandle::JoinAll(handles),
        }
    }

    fn join(self) -> AwaitResult<()> {
        match self {
            SubscriptionHandle::Nil => Ok(()),
            SubscriptionHandle::JoinThread(thread_handle) => thread_handle.join(),
            SubscriptionHandle::JoinAll(handles) => {
                handles.into_iter().try_for_each(SubscriptionHandle::join)
            }
            SubscriptionHandle::JoinTask(_) => Err(Box::new(
                "handle is a Tokio task, use `join_concurrent().await` to await it",
            )),
        }
    }

    fn join_async(self) -> Pin<Box<dyn Future<Output = AwaitResult<()>> + Send>> {
        Box::pin(async move {
            match self {
                SubscriptionHandle::Nil => Ok(()),
                SubscriptionHandle::JoinTask(task_handle) => task_handle
                    .await
                    .map_err(|e| Box::new(e) as Box<dyn Any + Send>),
                SubscriptionHandle::JoinThread(thread_handle) => {
                    tokio::task::spawn_blocking(move || thread_handle.join())
                        .await
                        .map_err(|e| Box::new(e) as Box<dyn Any + Send>)?
                }
                SubscriptionHandle::JoinAll(handles) => {
                    for handle in handles {
                        handle.join_async().await?;
                    }
                    Ok(())
                }
            }
        })
    }
}

/// Represents a subscription to an observable or a subject, allowing control over
/// the subscription.
///
/// Dropping a `Subscription` does not unsubscribe; call [`unsubscribe`] or hand it
/// to a [`DisposeBag`].
///
/// [`unsubscribe`]: trait.Unsubscribeable.html#tymethod.unsubscribe
pub struct Subscription {
    disposable: Disposable,
    pub(crate) subscription_future: SubscriptionHandle,
}

impl Subscription {
    /// Creates a new Subscription instance with the specified unsubscribe logic and
    /// subscription handle.
    #[must_use]
    pub fn new(
        unsubscribe_logic: UnsubscribeLogic,
        subscription_future: SubscriptionHandle,
    ) -> Self {
        Subscription {
            disposable: Disposable::with_logic(unsubscribe_logic),
            subscription_future,
        }
    }

    /// A subscription with nothing to tear down or await.
    #[must_use]
    pub fn empty() -> Self {
        Subscription::new(UnsubscribeLogic::Nil, SubscriptionHandle::Nil)
    }

    pub(crate) fn from_parts(disposable: Disposable, subscription_future: SubscriptionHandle) -> Self {
        Subscription {
            disposable,
            subscription_future,
        }
    }

    /// Returns a cloneable handle that cancels this subscription.
    ///
    /// Useful for unsubscribing from inside one of the subscriber's own callbacks.
    #[must_use]
    pub fn disposable(&self) -> Disposable {
        self.disposable.clone()
    }

    /// Returns `true` once the subscription was unsubscribed or its stream ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.disposable.is_disposed()
    }

    /// Moves this subscription into `bag`, which disposes it on teardown.
    pub fn disposed_by(self, bag: &DisposeBag) {
        bag.insert(self);
    }

    pub(crate) fn take_handle(&mut self) -> SubscriptionHandle {
        mem::replace(&mut self.subscription_future, SubscriptionHandle::Nil)
    }

    /// Awaits the completion of the asynchronous task or thread associated with
    /// this subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if joining a thread or awaiting a task used by the
    /// observable fails.
    pub async fn join_concurrent(mut self) -> AwaitResult<()> {
        self.take_handle().join_async().await
    }

    /// Blocks until the OS thread associated with this subscription finishes.
    ///
    /// # Errors
    ///
    /// Returns an error if joining the thread fails, or if the subscription is
    /// backed by a Tokio task; await those with `join_concurrent().await`.
    pub fn join(mut self) -> AwaitResult<()> {
        self.take_handle().join()
    }
}

impl Unsubscribeable for Subscription {
    fn unsubscribe(self) {
        self.disposable.dispose();
    }
}

/// Enumerates various unsubscribe logic options for a subscription.
pub enum UnsubscribeLogic {
    /// No specific unsubscribe logic.
    Nil,

    /// If one subscription depends on another. Wrapped subscription's unsubscribe
    /// will be called upon unsubscribing.
    Wrapped(Box<Subscription>),

    /// Unsubscribe logic defined by a function.
    Logic(Box<dyn FnOnce() + Send>),

    /// Asynchronous unsubscribe logic represented by a future. Use if you need to
    /// `.await` as a part of the unsubscribe logic; it is spawned on the Tokio
    /// runtime that was current when the subscription was created.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

impl UnsubscribeLogic {
    fn run(self, runtime_handle: Option<&runtime::Handle>) {
        match self {
            UnsubscribeLogic::Nil => (),
            UnsubscribeLogic::Logic(fnc) => fnc(),
            UnsubscribeLogic::Wrapped(subscription) => subscription.unsubscribe(),
            UnsubscribeLogic::Future(future) => {
                match runtime_handle
                    .cloned()
                    .or_else(|| runtime::Handle::try_current().ok())
                {
                    Some(handle) => {
                        handle.spawn(future);
                    }
                    None => tracing::warn!(
                        "asynchronous unsubscribe logic dropped, no Tokio runtime available"
                    ),
                }
            }
        }
    }
}

impl From<Subscription> for UnsubscribeLogic {
    fn from(subscription: Subscription) -> Self {
        UnsubscribeLogic::Wrapped(Box::new(subscription))
    }
}
