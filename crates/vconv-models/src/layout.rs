//! Filesystem layout of a conversion job.
//!
//! ```text
//! <root>/<video_id>/*.chunk              uploaded chunks
//! <root>/<video_id>/merged.mp4           reassembled source (removed after packaging)
//! <root>/<video_id>/mpeg-dash/output.mpd manifest plus segment files
//! ```

use std::path::{Path, PathBuf};

use crate::VideoId;

/// Extension of uploaded chunk files.
pub const CHUNK_EXTENSION: &str = "chunk";

/// File name of the reassembled source video.
pub const MERGED_FILE: &str = "merged.mp4";

/// Directory holding the packaged stream.
pub const DASH_DIR: &str = "mpeg-dash";

/// File name of the streaming manifest.
pub const MANIFEST_FILE: &str = "output.mpd";

/// Resolved paths for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    chunk_dir: PathBuf,
}

impl JobPaths {
    /// Paths for `video_id` under the shared upload root.
    pub fn new(root: impl AsRef<Path>, video_id: VideoId) -> Self {
        Self {
            chunk_dir: root.as_ref().join(video_id.to_string()),
        }
    }

    /// Directory holding the uploaded chunks.
    pub fn chunk_dir(&self) -> &Path {
        &self.chunk_dir
    }

    pub fn merged_file(&self) -> PathBuf {
        self.chunk_dir.join(MERGED_FILE)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.chunk_dir.join(DASH_DIR)
    }

    pub fn manifest(&self) -> PathBuf {
        self.output_dir().join(MANIFEST_FILE)
    }
}
