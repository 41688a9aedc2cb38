//! Crate-wide error type.
//!
//! One enum covers the whole surface: registration, decoding, matching, and the
//! tree builder all return the same kinds, so embedders can match on a single
//! type regardless of which layer raised the failure.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced by the engine, the decoder, and grammar callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A caller-supplied argument was rejected (duplicate registration,
    /// reserved state id, stream already open, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Allocation failure reported by an embedder callback or visitor. The
    /// engine itself never raises this kind.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// A lookup failed: unknown state id, empty state stack on pop, close tag
    /// not matching the open element, value with nothing to fill.
    #[error("not found: {0}")]
    NotFound(String),

    /// The instance is not in a state to perform the operation: no states
    /// registered, no active state, a second document root.
    #[error("not ready: {0}")]
    NotReady(String),

    /// An unrecognized declared encoding label.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A buffer whose byte length does not fit the code-unit size of the
    /// encoding in use (including an empty UTF-16 buffer).
    #[error("bad buffer size: {0}")]
    BadBufferSize(String),
}

impl Error {
    /// Shorthand for `NotFound` with a formatted message.
    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    /// Shorthand for `NotReady` with a formatted message.
    pub(crate) fn not_ready(message: impl Into<String>) -> Self {
        Error::NotReady(message.into())
    }

    /// Shorthand for `InvalidArgument` with a formatted message.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}
