//! Shared data models for the video conversion worker.
//!
//! This crate provides Serde-serializable types for:
//! - Conversion jobs received from the broker
//! - Confirmation messages published after a successful conversion
//! - The on-disk layout of a job's chunks and output package

pub mod job;
pub mod layout;
pub mod video;

// Re-export common types
pub use job::{ConversionConfirmation, ConversionJob};
pub use layout::{JobPaths, CHUNK_EXTENSION, DASH_DIR, MANIFEST_FILE, MERGED_FILE};
pub use video::VideoId;
