//! Error types for the vmap extractor

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for extractor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A client database table could not be decoded
    #[error("Invalid table: {0}")]
    Table(#[from] wow_db2::Error),

    /// A required client database table is not in storage
    #[error("Missing client table: {0}")]
    MissingTable(String),

    /// Invalid data within a chunk
    #[error("Invalid {chunk} data: {message}")]
    InvalidChunk { chunk: String, message: String },

    /// A building, group or tile is not present in storage
    #[error("Resource not found: {0}")]
    ResourceMissing(String),

    /// A map directory name does not fit the fixed-size name buffer
    #[error("Map name too long for map {map_id}: '{name}' (limit {limit} bytes)")]
    MapNameTooLong {
        map_id: u32,
        name: String,
        limit: usize,
    },

    /// No installed locale yields a storage with a build number
    #[error("No usable locale found in client storage")]
    NoUsableLocale,

    /// The output directory holds artifacts of an earlier run
    #[error("Output directory is polluted, please use an empty directory: {0}")]
    PollutedOutput(PathBuf),

    /// The client at the given path cannot be handled
    #[error("Unsupported client: {0}")]
    UnsupportedClient(String),

    /// Storage metadata could not be read
    #[error("Storage error: {0}")]
    Storage(String),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create an invalid chunk data error
    pub fn invalid_chunk(chunk: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidChunk {
            chunk: chunk.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort the run.
    ///
    /// Missing or malformed units (buildings, groups, tiles) are skipped;
    /// everything else means the environment or the client tables cannot
    /// be trusted.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::InvalidChunk { .. } | Error::ResourceMissing(_)
        )
    }
}
