//! Solver error implementation

use std::io;
use thiserror::Error;

/// Public solver error variants.
#[derive(Debug, Error)]
pub enum SolverError {
    /// An internal invariant does not hold; the context must be discarded.
    #[error("Fatal solver error: {0}")]
    Fatal(&'static str),
    /// The query deadline expired while a phase was running.
    #[error("Query deadline exceeded")]
    Timeout,
    /// A recognised environment key carries a value other than "0" or "1".
    #[error("Invalid configuration value for {key}: {value:?}")]
    InvalidConfig {
        /// The offending environment key.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
    /// I/O and OS related errors.
    #[error("Unrecoverable error: {0}")]
    Io(#[from] io::Error),
}

impl SolverError {
    /// Flag whether the error only interrupted the current query.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Cooperative cancellation sentinel propagated out of every phase.
///
/// Phases bubble it with `?` so the cascade unwinds without publishing a
/// result; the entry point converts it into [`SolverError::Timeout`] after
/// collecting whatever optimistic proof was found on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("query deadline exceeded")]
pub struct Timeout;

impl From<Timeout> for SolverError {
    fn from(_: Timeout) -> SolverError {
        SolverError::Timeout
    }
}
