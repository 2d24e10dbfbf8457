//! Provides structures and traits related to subscription management.
//!
//! This module includes types such as `Subscriber` for handling observed values,
//! errors, and completions, `Subscription` and `Disposable` for cancelling
//! subscriptions to observables and subjects, and `DisposeBag` for tying a group
//! of subscriptions to one owner.
//!
//! Additionally, it defines enums and traits for subscription handling, awaiting
//! asynchronous subscriptions and defining unsubscribe logic.
pub mod dispose_bag;
pub mod subscribe;
