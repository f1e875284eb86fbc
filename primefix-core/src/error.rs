/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the PrimeFix client.
//!
//! Every layer has its own `thiserror` enum so callers can match on the
//! failure class that matters to them, and [`FixError`] rolls them all up
//! for code that only needs to propagate.

use std::ops::Range;
use thiserror::Error;

/// Result type alias using [`FixError`] as the error type.
pub type Result<T> = std::result::Result<T, FixError>;

/// Top-level error type for all PrimeFix operations.
#[derive(Debug, Error)]
pub enum FixError {
    /// Error during message decoding.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error during message encoding.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Inbound sequence number did not match the expected value.
    #[error("sequence error: {0}")]
    Sequence(#[from] SequenceError),

    /// Order parameters rejected before transmission.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Application message could not be interpreted.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error in session layer operations.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error in message store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error from underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur during FIX message decoding.
///
/// A decode failure never has side effects: the frame is dropped and the
/// session carries on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Message buffer is incomplete, need more data.
    #[error("incomplete message, need more data")]
    Incomplete,

    /// Frame violates the tag=value grammar or its declared body length.
    #[error("malformed message: {reason}")]
    Malformed {
        /// What was wrong with the frame.
        reason: String,
    },

    /// Checksum mismatch between calculated and declared values.
    #[error("checksum invalid: calculated {calculated:03}, declared {declared:03}")]
    ChecksumInvalid {
        /// Calculated checksum value.
        calculated: u8,
        /// Declared checksum value in message.
        declared: u8,
    },

    /// Tag outside the known catalog (strict mode only).
    #[error("unknown tag {tag}")]
    UnknownTag {
        /// The unrecognised tag number.
        tag: u32,
    },

    /// Invalid UTF-8 in a field value.
    #[error("invalid utf-8 in field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Actual message size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max_size: usize,
    },
}

impl DecodeError {
    /// Shorthand for a [`DecodeError::Malformed`] with the given reason.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Errors that occur during FIX message encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Missing required field during encoding.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// Field value cannot be put on the wire.
    #[error("invalid field value for tag {tag}: {reason}")]
    InvalidFieldValue {
        /// The tag number of the field.
        tag: u32,
        /// Description of why the value is invalid.
        reason: String,
    },
}

/// Outcome of validating an inbound MsgSeqNum that is not the expected one.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    /// Sequence number is higher than expected; messages were missed.
    #[error("sequence gap: expected {expected}, received {received}")]
    Gap {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },

    /// Sequence number was already processed.
    #[error("duplicate sequence: expected {expected}, received {received}")]
    Duplicate {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
}

/// Order parameters that cannot be sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Limit order without a limit price.
    #[error("limit order requires a price")]
    MissingPrice,

    /// Limit price below zero.
    #[error("price must not be negative: {price}")]
    NegativePrice {
        /// The offending price.
        price: String,
    },

    /// Quantity is zero or negative.
    #[error("quantity must be positive: {quantity}")]
    InvalidQuantity {
        /// The offending quantity.
        quantity: String,
    },

    /// Symbol is empty.
    #[error("symbol must not be empty")]
    EmptySymbol,
}

/// Errors raised while interpreting an application message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A required field is absent.
    #[error("missing required field: tag {tag}")]
    MissingField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// A field is present but its value is not valid for its type.
    #[error("invalid value for tag {tag}: {reason}")]
    InvalidValue {
        /// The tag number of the field.
        tag: u32,
        /// Description of why the value is invalid.
        reason: String,
    },

    /// The message is not of the type the parser handles.
    #[error("unexpected msg type: expected {expected}, got {actual}")]
    UnexpectedMsgType {
        /// The msg type the parser handles.
        expected: String,
        /// The msg type that was supplied.
        actual: String,
    },
}

/// Protocol failures that end the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolFatal {
    /// No response to a TestRequest.
    #[error("heartbeat timeout after {elapsed_ms} milliseconds of silence")]
    Timeout {
        /// Elapsed time in milliseconds since the last inbound message.
        elapsed_ms: u64,
    },

    /// Logon was answered with a Logout.
    #[error("logon rejected: {reason}")]
    LogonRejected {
        /// Text supplied by the counterparty.
        reason: String,
    },

    /// No Logon response within the logon timeout.
    #[error("no logon response within {timeout_ms} milliseconds")]
    LogonTimeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// Counterparty did not fill a sequence gap.
    #[error("resend of {begin}..{end} not completed in time")]
    ResendTimeout {
        /// First missing sequence number.
        begin: u64,
        /// Sequence number that revealed the gap.
        end: u64,
    },

    /// Sequence numbers cannot be reconciled.
    #[error("unrecoverable desync: {reason}")]
    Desync {
        /// Description of the desync.
        reason: String,
    },
}

/// Errors in FIX session layer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session is not in the correct state for the operation.
    #[error("invalid session state: expected {expected}, current {current}")]
    InvalidState {
        /// Expected state for the operation.
        expected: String,
        /// Current session state.
        current: String,
    },

    /// The session was terminated by a protocol failure.
    #[error("protocol fatal: {0}")]
    Fatal(#[from] ProtocolFatal),

    /// Session configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Outbound message cannot be put on the wire.
    #[error("message cannot be encoded: {0}")]
    Encode(#[from] EncodeError),
}

/// Errors in message store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to store message.
    #[error("failed to store message seq={seq_num}: {reason}")]
    StoreFailed {
        /// Sequence number of the message.
        seq_num: u64,
        /// Reason for failure.
        reason: String,
    },

    /// Range of messages not available.
    #[error("messages not available for range: {range:?}")]
    RangeNotAvailable {
        /// The requested range of sequence numbers.
        range: Range<u64>,
    },

    /// Store is corrupted.
    #[error("store corrupted: {reason}")]
    Corrupted {
        /// Description of the corruption.
        reason: String,
    },

    /// I/O error in persistent store.
    #[error("store i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::ChecksumInvalid {
            calculated: 7,
            declared: 200,
        };
        assert_eq!(
            err.to_string(),
            "checksum invalid: calculated 007, declared 200"
        );
    }

    #[test]
    fn test_fix_error_from_decode() {
        let fix_err: FixError = DecodeError::Incomplete.into();
        assert!(matches!(fix_err, FixError::Decode(DecodeError::Incomplete)));
    }

    #[test]
    fn test_sequence_error_display() {
        let err = SequenceError::Gap {
            expected: 5,
            received: 10,
        };
        assert_eq!(err.to_string(), "sequence gap: expected 5, received 10");
    }

    #[test]
    fn test_session_error_from_fatal() {
        let err: SessionError = ProtocolFatal::Timeout { elapsed_ms: 36_000 }.into();
        assert!(matches!(
            err,
            SessionError::Fatal(ProtocolFatal::Timeout { elapsed_ms: 36_000 })
        ));
        assert_eq!(
            err.to_string(),
            "protocol fatal: heartbeat timeout after 36000 milliseconds of silence"
        );
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::MissingField { tag: 37 };
        assert_eq!(err.to_string(), "missing required field: tag 37");
    }

    #[test]
    fn test_store_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StoreError = io.into();
        assert_eq!(err.to_string(), "store i/o error: gone");
    }
}
