//! Error types for the DB2 decoder.

use std::io;
use thiserror::Error;

/// Errors that can occur when decoding or writing a DB2 table
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid DB2 header
    #[error("Invalid DB2 header: {0}")]
    InvalidHeader(String),

    /// The file was produced for a different record layout
    #[error("Layout hash mismatch: expected {expected:#010x}, found {found:#010x}")]
    LayoutMismatch {
        /// Hash the schema was written for
        expected: u32,
        /// Hash declared by the file
        found: u32,
    },

    /// The file is shorter than its header claims
    #[error("Truncated table: header requires {expected} bytes, found {found}")]
    Truncated {
        /// Bytes required by the declared sizes
        expected: u64,
        /// Bytes actually available
        found: u64,
    },

    /// Schema validation error
    #[error("Schema validation error: {0}")]
    SchemaValidation(String),

    /// The file uses a feature this decoder does not handle
    #[error("Unsupported table feature: {0}")]
    Unsupported(String),

    /// Out of bounds error
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// Type conversion error
    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    /// A record accessor was called with an index or type the schema does not allow.
    ///
    /// This is a programming error in the caller, not a data problem.
    #[error("Invalid field access: {0}")]
    FieldAccess(String),
}

/// Result type alias for DB2 operations
pub type Result<T> = std::result::Result<T, Error>;
