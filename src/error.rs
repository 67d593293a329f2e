//! # Errors
//!
//! Error types for every fallible surface of the crate. None of them is
//! allowed to stop the frame loop: build failures degrade to "no geometry",
//! edit failures are reported to the caller, persistence failures are logged
//! and retried on the next save.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine_state::voxels::coordinate::ChunkCoordinate;

/// Outcome of a background task that did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The worker failed (returned an error or panicked) while building.
    #[error("generation failed: {0}")]
    GenerationFailure(String),
    /// The task was cancelled before it produced a result.
    #[error("build was cancelled")]
    Cancelled,
    /// The worker pool went away before the task ran.
    #[error("worker disconnected before completing the task")]
    WorkerDisconnected,
}

/// Errors raised by block edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The edit targets a chunk that isn't loaded.
    #[error("chunk {0} is not loaded")]
    ChunkNotLoaded(ChunkCoordinate),
    /// The edit targets a height outside the chunk column.
    #[error("block height {0} is outside the world")]
    OutOfBounds(i32),
    /// Placing into a position that already holds a solid block.
    #[error("target position is already occupied")]
    Occupied,
    /// Breaking a position that holds only air.
    #[error("there is no block to break")]
    NothingToBreak,
}

/// Errors raised while saving or loading chunks.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the backing store failed.
    #[error("chunk store i/o failed at {path}: {source}")]
    Io {
        /// The file that was being accessed
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
    /// A chunk record could not be encoded or decoded.
    #[error("chunk record is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A record decoded but doesn't describe a valid chunk.
    #[error("chunk {0} has corrupt block data")]
    CorruptChunk(ChunkCoordinate),
}

/// Errors raised while loading the streaming configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file couldn't be read.
    #[error("couldn't read config {path}: {source}")]
    Io {
        /// The configuration file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
    /// The configuration isn't valid JSON for `StreamingConfig`.
    #[error("couldn't parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The configuration parsed but holds unusable values.
    #[error("invalid config: {0}")]
    Invalid(String),
}
