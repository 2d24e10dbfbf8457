use std::fmt;

use crate::{observer::Observer, ErrorArc};

/// A single notification of a stream reified as a value.
///
/// Produced by [`materialize`] and consumed by [`dematerialize`].
///
/// [`materialize`]: trait.ObservableExt.html#method.materialize
/// [`dematerialize`]: trait.ObservableExt.html#method.dematerialize
#[derive(Clone)]
pub enum Event<T> {
    /// A value.
    Next(T),

    /// Terminal failure.
    Error(ErrorArc),

    /// Terminal success.
    Completed,
}

impl<T> Event<T> {
    /// Returns `true` for `Error` and `Completed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Next(_))
    }

    /// Returns the carried value of a `Next` event.
    pub fn into_value(self) -> Option<T> {
        match self {
            Event::Next(v) => Some(v),
            _ => None,
        }
    }

    /// Delivers this event to `observer`.
    pub fn deliver<O: Observer<NextFnType = T>>(self, observer: &mut O) {
        match self {
            Event::Next(v) => observer.next(v),
            Event::Error(e) => observer.error(e),
            Event::Completed => observer.complete(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Next(v) => f.debug_tuple("Next").field(v).finish(),
            Event::Error(e) => f.debug_tuple("Error").field(&e.to_string()).finish(),
            Event::Completed => f.write_str("Completed"),
        }
    }
}

impl<T: PartialEq> PartialEq for Event<T> {
    /// Errors compare by their rendered message.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Event::Next(a), Event::Next(b)) => a == b,
            (Event::Error(a), Event::Error(b)) => a.to_string() == b.to_string(),
            (Event::Completed, Event::Completed) => true,
            _ => false,
        }
    }
}
