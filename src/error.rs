//! Error types for routewire.

use thiserror::Error;

use crate::table::TableError;

/// Main error type for all routewire operations.
///
/// `TimedOut` is deliberately absent: an idle timeout is a normal serve-loop
/// outcome ([`crate::serve::ServeOutcome::TimedOut`]), not an error.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error reported by the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure inside the transport/protocol collaborator.
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection was closed underneath us.
    #[error("connection closed")]
    ConnectionClosed,

    /// Protocol violation (unexpected frame type, body overrun, etc.).
    /// Fatal to the connection.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A sized buffer reservation failed.
    #[error("allocation of {0} bytes failed")]
    Allocation(usize),

    /// An equal routing entry is already registered.
    #[error("duplicate routing key")]
    DuplicateKey,

    /// No matching routing entry.
    #[error("routing key not found")]
    NotFound,

    /// An RPC reply arrived carrying a correlation id other than the one
    /// just sent.
    #[error("correlation id mismatch: sent {sent}, received {received}")]
    CorrelationMismatch {
        /// Correlation id attached to the outgoing request.
        sent: String,
        /// Correlation id found on the reply (empty if absent).
        received: String,
    },

    /// The message/handler combination breaks the protocol contract,
    /// e.g. a reply queue was requested but the handler produced no
    /// response.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<TableError> for Error {
    fn from(err: TableError) -> Self {
        match err {
            TableError::Duplicate => Error::DuplicateKey,
            TableError::NotFound => Error::NotFound,
            TableError::Alloc(bytes) => Error::Allocation(bytes),
        }
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
