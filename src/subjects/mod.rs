//! The `subjects` module provides various types of subjects for handling and observing
//! data streams. Subjects serve both as observers and observables, allowing multiple
//! observers to subscribe to a single source and receive updates.
//!
//! Subjects are split into emitter and receiver using the `emitter_receiver`
//! function.
//!
//! The emitter behaves as an `Observer`, enabling `next()`, `error()` and
//! `complete()` calls. It converts into a `Subscriber`, so it can be passed to the
//! `subscribe` method of another `Observable`.
//!
//! The receiver functions as an `Observable`, enabling you to use the `subscribe`
//! and `unsubscribe` methods and every operator on it.
//!
//! There are three varieties of subject, distinguished by what they replay to new
//! subscribers: `Subject` (nothing), `BehaviorSubject` (the current value) and
//! `ReplaySubject` (a bounded or unbounded buffer). `PublishRelay` and
//! `BehaviorRelay` are subjects without a terminal state.
//!
//! Emissions to one subject are serialized: if a subscriber emits into the subject
//! it is being notified by, or another thread emits concurrently, the new event is
//! delivered after the current one reached every subscriber.

mod behavior_subject;
mod relay;
mod replay_subject;
mod subject;
mod subject_core;

pub use behavior_subject::*;
pub use relay::*;
pub use replay_subject::*;
pub use subject::*;
