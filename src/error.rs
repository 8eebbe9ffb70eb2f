//! Error types for column construction, record batch encoding/decoding and
//! frame I/O.

use thiserror::Error;

use crate::types::DataType;

/// Errors that can occur while building, encoding or decoding record batches.
#[derive(Debug, Error)]
pub enum IonicError {
    /// A record batch was built with no columns.
    #[error("record batch must have at least one column")]
    EmptyBatch,

    /// A column's row count differs from the rest of the batch.
    #[error("column '{column}' has inconsistent length: expected {expected} rows, got {actual}")]
    InconsistentLength {
        /// Name of the offending column.
        column: String,
        /// Row count of the batch (taken from the first column).
        expected: usize,
        /// Row count of the offending column.
        actual: usize,
    },

    /// A value does not conform to the declared column type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The declared type.
        expected: DataType,
        /// Kind of the value that was supplied.
        found: &'static str,
    },

    /// A type code outside the known set.
    #[error("unknown type code: {0}")]
    UnknownType(u8),

    /// The encoded bytes are structurally invalid.
    #[error("malformed record batch: {0}")]
    MalformedBatch(String),

    /// A null was supplied to a column declared non-nullable.
    #[error("column '{column}' is not nullable but contains a null")]
    UnexpectedNull {
        /// Name of the offending column.
        column: String,
    },

    /// Column names must be non-empty and at most 255 UTF-8 bytes.
    #[error("invalid column name: {0:?}")]
    InvalidColumnName(String),

    /// A count or length does not fit into its wire field.
    #[error("{what} of {value} exceeds the limit of {limit}")]
    LimitExceeded {
        /// What overflowed.
        what: &'static str,
        /// The offending value.
        value: usize,
        /// The largest representable value.
        limit: usize,
    },

    /// I/O failure while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IonicError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        IonicError::MalformedBatch(msg.into())
    }

    /// Returns `value` as a `u32`, or `LimitExceeded` naming `what`.
    pub(crate) fn check_u32(what: &'static str, value: usize) -> Result<u32, Self> {
        u32::try_from(value).map_err(|_| IonicError::LimitExceeded {
            what,
            value,
            limit: u32::MAX as usize,
        })
    }
}
