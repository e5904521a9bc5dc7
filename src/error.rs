//! Crate error taxonomy.
//!
//! Every fallible core operation returns [`Error`], a thin wrapper around
//! [`ErrorKind`] carrying a stable numeric/string identifier and a
//! cross-category [`Condition`] for each variant.

use std::fmt;

use thiserror::Error as ThisError;

use crate::vocab::Condition;

/// The crate's error type.
///
/// Boxed so that `Result<T, Error>` stays small regardless of which
/// variant is in play.
#[derive(Debug, ThisError)]
#[error("{kind}")]
pub struct Error {
    kind: Box<ErrorKind>,
}

impl Error {
    /// The underlying [`ErrorKind`].
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The stable numeric identifier for wire/structured logging.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.kind.code()
    }

    /// The cross-category condition this error maps to.
    #[must_use]
    pub fn condition(&self) -> Condition {
        self.kind.condition()
    }

    /// Whether this error leaves the stream unhealthy: fatal/internal
    /// errors require the caller to drop and reconnect rather than retry.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(*self.kind, ErrorKind::Internal(_) | ErrorKind::Io(_))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind: Box::new(kind) }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        ErrorKind::Io(err).into()
    }
}

/// The specific condition an [`Error`] represents.
///
/// Each variant belongs to one of three bands: per-byte protocol errors,
/// programming errors, and fatal/internal errors.
#[derive(Debug, ThisError)]
pub enum ErrorKind {
    /// Generic RFC 854 violation / impossible state transition.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Unexpected internal failure; the stream is now unhealthy.
    #[error("internal error: {0}")]
    Internal(String),

    /// Unrecognized command byte after IAC.
    #[error("invalid command byte: {0:#04x}")]
    InvalidCommand(u8),

    /// Command in a negotiation call is not WILL/WONT/DO/DONT.
    #[error("invalid negotiation command: {0:#04x}")]
    InvalidNegotiation(u8),

    /// Option unsupported, unregistered, or rejected by predicate.
    #[error("option {0} not available")]
    OptionNotAvailable(u8),

    /// Subnegotiation sequence malformed or for an un-enabled option.
    #[error("invalid subnegotiation: {0}")]
    InvalidSubnegotiation(String),

    /// Payload exceeded `max_subneg_bytes`.
    #[error("subnegotiation overflow for option {option}: {len} > {max}")]
    SubnegotiationOverflow {
        /// The option whose subnegotiation overflowed.
        option: u8,
        /// The payload length that was buffered before the overflow.
        len: usize,
        /// The configured limit.
        max: usize,
    },

    /// Attempt to register a handler for a reserved option.
    #[error("handler forbidden for option {0}")]
    UserHandlerForbidden(u8),

    /// No handler for the requested option.
    #[error("no handler registered for option {0}")]
    UserHandlerNotFound(u8),

    /// `queue` bit set in an invalid peer state.
    #[error("queue bit set in invalid peer state for option {0}")]
    NegotiationQueueError(u8),

    /// Allocation failure.
    #[error("not enough memory")]
    NotEnoughMemory,

    /// Underlying transport I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorKind {
    /// The stable numeric identifier for this error kind.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::ProtocolViolation(_) => 1,
            Self::Internal(_) => 2,
            Self::InvalidCommand(_) => 3,
            Self::InvalidNegotiation(_) => 4,
            Self::OptionNotAvailable(_) => 5,
            Self::InvalidSubnegotiation(_) => 6,
            Self::SubnegotiationOverflow { .. } => 7,
            Self::UserHandlerForbidden(_) => 8,
            Self::UserHandlerNotFound(_) => 9,
            Self::NegotiationQueueError(_) => 10,
            Self::NotEnoughMemory => 11,
            Self::Io(_) => 12,
        }
    }

    /// The stable identifier string, for callers that want the name
    /// rather than the number.
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::ProtocolViolation(_) => "protocol_violation",
            Self::Internal(_) => "internal_error",
            Self::InvalidCommand(_) => "invalid_command",
            Self::InvalidNegotiation(_) => "invalid_negotiation",
            Self::OptionNotAvailable(_) => "option_not_available",
            Self::InvalidSubnegotiation(_) => "invalid_subnegotiation",
            Self::SubnegotiationOverflow { .. } => "subnegotiation_overflow",
            Self::UserHandlerForbidden(_) => "user_handler_forbidden",
            Self::UserHandlerNotFound(_) => "user_handler_not_found",
            Self::NegotiationQueueError(_) => "negotiation_queue_error",
            Self::NotEnoughMemory => "not_enough_memory",
            Self::Io(_) => "internal_error",
        }
    }

    /// The cross-category [`Condition`] this kind maps to.
    #[must_use]
    pub fn condition(&self) -> Condition {
        match self {
            Self::ProtocolViolation(_)
            | Self::InvalidCommand(_)
            | Self::InvalidNegotiation(_)
            | Self::InvalidSubnegotiation(_) => Condition::ProtocolError,
            Self::SubnegotiationOverflow { .. } => Condition::MessageSize,
            Self::OptionNotAvailable(_) | Self::UserHandlerNotFound(_) => {
                Condition::NotSupported
            }
            Self::Internal(_) | Self::Io(_) | Self::NotEnoughMemory => {
                Condition::StateNotRecoverable
            }
            Self::UserHandlerForbidden(_) | Self::NegotiationQueueError(_) => {
                Condition::OperationNotPermitted
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ProtocolError => "protocol-error",
            Self::MessageSize => "message-size",
            Self::NotSupported => "not-supported",
            Self::StateNotRecoverable => "state-not-recoverable",
            Self::OperationNotPermitted => "operation-not-permitted",
        };
        f.write_str(s)
    }
}

/// The crate's `Result` alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
