//! Error types returned by the Cryo-con client.
//!
//! [`Error`] is what every facade operation returns. It separates failures of
//! the connection itself from replies the instrument did not like, from
//! requests that were refused before anything was sent.
use crate::{attribute::Attribute, protocol as proto};
use std::sync::Arc;

/// The instrument replied, but not in a way that can be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    /// The instrument rejected the request.
    #[error("Instrument rejected command '{command}'")]
    Nack { command: String },

    /// The number of reply segments does not match the number of queries.
    #[error("Expected {expected} reply segments but received {received}")]
    SegmentCount { expected: usize, received: usize },

    /// A numeric reply that is neither a number nor a known sentinel.
    #[error("Cannot parse '{0}' as a number")]
    InvalidNumber(String),

    /// A date reply not in `"MM/DD/YYYY"` format.
    #[error("Cannot parse '{0}' as a date")]
    InvalidDate(String),

    /// A time reply not in `"HH:MM:SS"` format.
    #[error("Cannot parse '{0}' as a time")]
    InvalidTime(String),

    /// An enumerated reply (unit, type, range) the client does not know.
    #[error("Unexpected reply '{0}'")]
    InvalidEnum(String),
}

/// The request was refused before touching the wire.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UsageError {
    #[error("Attribute {0} is read-only")]
    ReadOnly(Attribute),

    #[error("Channel {0} is not managed by this controller")]
    UnknownChannel(proto::ChannelId),

    #[error("Loop {0} is not managed by this controller")]
    UnknownLoop(proto::LoopId),

    #[error("Can only set range for loop 1, not for loop {0}")]
    RangeNotSupported(proto::LoopId),

    /// Writing the attribute depends on a live read of the loop state,
    /// which a batch cannot do.
    #[error("Attribute {0} cannot be written inside a batch")]
    NotBatchable(Attribute),

    #[error("Connection '{0}' not supported")]
    UnsupportedScheme(String),

    #[error("Invalid connection url '{0}'")]
    InvalidUrl(String),

    #[error("Command of {len} characters exceeds the line limit of {limit}")]
    CommandTooLong { len: usize, limit: usize },

    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),
}

/// Represents all possible errors of a round trip with the instrument.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The connection failed. Shared so that the same failure can be
    /// reported again while further round trips are suppressed.
    #[error("Transport error: {0}")]
    Transport(Arc<std::io::Error>),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The instrument is not in a state that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The write was accepted but the value read back differs. The instrument
    /// state has changed anyway.
    #[error("Written value {written} for '{command}' differs from the one read back from instrument {read_back}")]
    ReadbackMismatch {
        command: String,
        written: String,
        read_back: String,
    },

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Value(#[from] proto::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(Arc::new(err))
    }
}

/// The result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
