//! Error taxonomy for work run under a correlation ID
//!
//! Blank identifiers are never an error: `update` ignores them so that
//! propagation cannot crash a caller just because no ID was available.

use std::io;
use tokio::time::error::Elapsed;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of work executed by [`crate::propagator::with_id`] and friends.
///
/// Returned only after the previous correlation ID has been restored.
#[derive(Debug, thiserror::Error)]
pub enum CorrelationError<E> {
    /// Expected failure of the caller's own work, passed through unchanged
    #[error(transparent)]
    Domain(E),

    /// The work did not finish within its deadline
    #[error("work timed out: {0}")]
    TimedOut(#[source] BoxError),

    /// Any other unexpected failure, including panics
    #[error("work failed: {0}")]
    Failed(#[source] BoxError),
}

impl<E> CorrelationError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }

    /// The caller's own error, if this is a domain failure
    pub fn into_domain(self) -> Option<E> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Decides how an error returned by wrapped work is reported.
///
/// The default treats the error as a domain failure and hands it back
/// untouched, so a caller's own error type only needs an empty impl:
///
/// ```
/// use correlation_id::Failure;
///
/// #[derive(Debug)]
/// struct OrderRejected;
///
/// impl Failure for OrderRejected {}
/// ```
pub trait Failure: Sized {
    fn classify(self) -> CorrelationError<Self> {
        CorrelationError::Domain(self)
    }
}

impl Failure for Elapsed {
    fn classify(self) -> CorrelationError<Self> {
        CorrelationError::TimedOut(Box::new(self))
    }
}

impl Failure for io::Error {
    fn classify(self) -> CorrelationError<Self> {
        if self.kind() == io::ErrorKind::TimedOut {
            CorrelationError::TimedOut(Box::new(self))
        } else {
            CorrelationError::Failed(Box::new(self))
        }
    }
}

impl Failure for anyhow::Error {
    fn classify(self) -> CorrelationError<Self> {
        let timed_out = self.downcast_ref::<Elapsed>().is_some()
            || self
                .downcast_ref::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::TimedOut);

        if timed_out {
            CorrelationError::TimedOut(self.into())
        } else {
            CorrelationError::Failed(self.into())
        }
    }
}

impl Failure for BoxError {
    fn classify(self) -> CorrelationError<Self> {
        let timed_out = self.downcast_ref::<Elapsed>().is_some()
            || self
                .downcast_ref::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::TimedOut);

        if timed_out {
            CorrelationError::TimedOut(self)
        } else {
            CorrelationError::Failed(self)
        }
    }
}

impl Failure for String {
    fn classify(self) -> CorrelationError<Self> {
        CorrelationError::Failed(self.into())
    }
}

impl Failure for &'static str {
    fn classify(self) -> CorrelationError<Self> {
        CorrelationError::Failed(self.into())
    }
}

/// Invalid propagation or logging configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(String),

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
