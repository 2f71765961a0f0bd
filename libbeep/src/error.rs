// libbeep/src/error.rs

//! Crate error types.

use thiserror::Error;

use crate::types::MfcOperationError;

/// 共通エラー型
///
/// Every fallible operation in the crate returns this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A command was issued outside the state it requires, or a channel is
    /// already busy with another operation.
    #[error("invalid state for {operation}: {reason}")]
    InvalidState {
        /// Command that was refused.
        operation: &'static str,
        /// Current state or other cause.
        reason: String,
    },

    /// Underlying I/O or radio failure reported by a transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// Caller input rejected before reaching a transport.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A Mifare Classic block operation failed.
    #[error("mifare operation failed: {0}")]
    MifareOperation(#[from] MfcOperationError),

    /// The caller cancelled an exchange before its result arrived.
    #[error("{operation} cancelled")]
    Cancelled {
        /// Request whose result will not be delivered.
        operation: &'static str,
    },

    /// The transport ended a barcode batch before every slot was filled.
    #[error("incomplete barcode batch: expected {expected}, received {received}")]
    IncompleteBarcodeBatch {
        /// Announced batch size.
        expected: usize,
        /// Slots actually filled.
        received: usize,
    },

    /// A builder was finished without a transport.
    #[error("no transport configured")]
    TransportMissing,
}

/// Malformed caller input, detected before anything reaches a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A fixed-size value got the wrong number of bytes.
    #[error("invalid size: expected {expected}, got {actual}")]
    InvalidSize {
        /// Required length.
        expected: usize,
        /// Length given.
        actual: usize,
    },

    /// A number outside the half-open range `[min, max)`.
    #[error("value {value} out of range [{min}, {max})")]
    OutOfRange {
        /// Value given.
        value: i64,
        /// Inclusive lower bound.
        min: i64,
        /// Exclusive upper bound.
        max: i64,
    },

    /// A required text field is empty.
    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),

    /// A charge or refund of zero coins.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// A barcode slot beyond the announced batch size.
    #[error("index {index} out of range for batch of {size}")]
    IndexOutOfRange {
        /// Slot given.
        index: usize,
        /// Announced batch size.
        size: usize,
    },
}

impl Error {
    pub(crate) fn invalid_state(operation: &'static str, reason: impl ToString) -> Self {
        Error::InvalidState {
            operation,
            reason: reason.to_string(),
        }
    }

    /// True for precondition failures (wrong state or busy channel).
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState { .. })
    }
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;
