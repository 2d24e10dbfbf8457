use std::{error::Error, sync::Arc};

use thiserror::Error;

/// Error value carried by `error` notifications.
///
/// Errors are shared between every subscriber of a multicast source, so they are
/// reference counted rather than cloned.
pub type ErrorArc = Arc<dyn Error + Send + Sync>;

/// Errors produced by the stream core itself.
///
/// User supplied sources and operators may emit any error type wrapped in an
/// [`ErrorArc`]; `RxError` covers failures the core raises on their behalf.
#[derive(Debug, Error)]
pub enum RxError {
    /// A source observable failed while producing values.
    #[error("{name} source emitted an error")]
    Source {
        name: &'static str,
        #[source]
        source: ErrorArc,
    },

    /// A transformation function passed to an operator failed.
    #[error("{operator} operator failed")]
    Operator {
        operator: &'static str,
        #[source]
        source: ErrorArc,
    },

    /// A single-value source finished without producing its value.
    #[error("sequence completed without emitting a value")]
    NoElements,

    /// A scheduled or awaited producer did not finish in time.
    #[error("operation timed out")]
    Timeout,

    /// The persistent cache collaborator failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl RxError {
    /// Wraps an arbitrary producer failure.
    pub fn source(name: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        RxError::Source {
            name,
            source: Arc::new(source),
        }
    }

    /// Wraps a failure returned by an operator's transformation function.
    pub fn operator(operator: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        RxError::Operator {
            operator,
            source: Arc::new(source),
        }
    }

    /// Converts into the shared form used by `error` notifications.
    #[must_use]
    pub fn into_arc(self) -> ErrorArc {
        Arc::new(self)
    }
}

/// Failures of the key/value cache collaborator.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache key {0:?} contains characters that cannot be stored")]
    InvalidKey(String),

    #[error("cache i/o failed for key {key:?}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}
