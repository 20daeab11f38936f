//! Media handling for the conversion worker.
//!
//! This crate provides:
//! - Ordered reassembly of uploaded chunk files
//! - Type-safe FFmpeg command building
//! - A subprocess runner capturing combined output, with optional timeout
//! - MPEG-DASH packaging behind the [`Transcoder`] trait

pub mod chunks;
pub mod command;
pub mod error;
pub mod transcoder;

pub use chunks::{chunk_ordinal, list_chunks, merge_chunks, Chunk, MergedFile};
pub use command::{check_ffmpeg, CommandOutput, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use transcoder::{DashTranscoder, Transcoder};
