//! Reactive streams for application logic.
//!
//! `rxcore` provides the push based stream model used by view models and
//! services: cold [`Observable`]s built from subscribe functions, hot
//! [`subjects`] and relays, a library of operators on [`ObservableExt`], and
//! [`scheduler`]s that decide where and when work runs.
//!
//! Every subscription is represented by a [`Subscription`](subscribe::Subscription)
//! whose [`Disposable`](subscribe::Disposable) cancels the whole operator chain.
//! Subscriptions can be grouped in a [`DisposeBag`] that disposes them together
//! when its owner goes away.
//!
//! # Example
//!
//! ```no_run
//! use rxcore::{subjects::PublishRelay, DisposeBag, ObservableExt};
//!
//! let bag = DisposeBag::new();
//! let taps = PublishRelay::new();
//!
//! taps.clone()
//!     .scan(0, |count, _: ()| count + 1)
//!     .map(|count| format!("tapped {count} times"))
//!     .subscribe_next(|label| println!("{label}"))
//!     .disposed_by(&bag);
//!
//! taps.accept(());
//! taps.accept(());
//! ```
//!
//! # Logging
//!
//! The crate logs through [`tracing`]. Disposal and subject lifecycle events are
//! emitted at `trace` and `debug` level, the `debug` operator logs every
//! notification it sees, and unhandled errors are reported at `warn`.

pub mod collaborators;
pub mod config;
mod errors;
pub mod observable;
pub mod observer;
pub mod scheduler;
pub mod subjects;
pub mod subscription;
mod util;

pub use collaborators::{Binder, FileCache, KeyValueCache, MemoryCache};
pub use errors::*;
pub use observable::{multicast::Connectable, Event, Observable, ObservableExt, SingleEmitter};
pub use observer::Observer;
pub use subscription::{
    dispose_bag::DisposeBag,
    subscribe::{self, Subscribeable, Unsubscribeable},
};
