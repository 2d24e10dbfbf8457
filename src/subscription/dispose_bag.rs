use std::sync::Mutex;

use crate::{
    subscription::subscribe::{Subscription, Unsubscribeable},
    util::LockExt,
};

struct BagState {
    items: Vec<Subscription>,
    disposed: bool,
}

/// Owns a group of subscriptions and disposes them together.
///
/// Dropping the bag disposes it. Items are disposed in insertion order, each
/// exactly once. A subscription inserted after the bag was disposed is disposed
/// immediately.
///
/// # Examples
///
/// ```no_run
/// use rxcore::{subscribe::Subscriber, DisposeBag, Observable, ObservableExt, Subscribeable};
///
/// let bag = DisposeBag::new();
///
/// Observable::of(vec![1, 2, 3])
///     .map(|v| v * 10)
///     .subscribe(Subscriber::on_next(|v| println!("{}", v)))
///     .disposed_by(&bag);
///
/// drop(bag);
/// ```
pub struct DisposeBag {
    state: Mutex<BagState>,
}

impl DisposeBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        DisposeBag {
            state: Mutex::new(BagState {
                items: Vec::new(),
                disposed: false,
            }),
        }
    }

    /// Takes ownership of `subscription`.
    pub fn insert(&self, subscription: Subscription) {
        let mut state = self.state.locked();
        if state.disposed {
            drop(state);
            tracing::trace!("insert into disposed bag, disposing immediately");
            subscription.unsubscribe();
            return;
        }
        state.items.push(subscription);
    }

    /// Disposes every owned subscription and marks the bag as disposed.
    pub fn dispose(&self) {
        let items = {
            let mut state = self.state.locked();
            state.disposed = true;
            std::mem::take(&mut state.items)
        };
        if !items.is_empty() {
            tracing::debug!(count = items.len(), "disposing bag");
        }
        for subscription in items {
            subscription.unsubscribe();
        }
    }

    /// Number of subscriptions currently owned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.locked().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.locked().disposed
    }
}

impl Default for DisposeBag {
    fn default() -> Self {
        DisposeBag::new()
    }
}

impl Drop for DisposeBag {
    fn drop(&mut self) {
        self.dispose();
    }
}
