//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while assembling or packaging a video.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(String),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        output: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("No chunks found in {0}")]
    NoChunks(PathBuf),

    #[error("Chunk name has no numeric ordinal: {0}")]
    InvalidChunkName(PathBuf),

    #[error("Chunks {first} and {second} share ordinal {ordinal}")]
    DuplicateChunk {
        ordinal: u64,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Chunk entry is not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("Failed to read chunk {path}: {source}")]
    ChunkRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write chunk {path} to merged file: {source}")]
    ChunkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        output: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            output,
            exit_code,
        }
    }
}
