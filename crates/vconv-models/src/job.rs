//! Message payloads exchanged with the broker.

use serde::{Deserialize, Serialize};

use crate::VideoId;

/// Job asking the worker to convert an uploaded video.
///
/// Unique per conversion request but not per delivery: the broker may hand
/// the same job to a worker more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Video ID
    pub video_id: VideoId,
    /// Location of the uploaded chunk set, as reported by the uploader
    #[serde(default)]
    pub path: String,
}

impl ConversionJob {
    pub fn new(video_id: impl Into<VideoId>, path: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            path: path.into(),
        }
    }

    /// Parse a job from a raw message body.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

/// Notification published once a video has been packaged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfirmation {
    /// Video ID
    pub video_id: VideoId,
    /// Directory holding the streaming manifest and segments
    pub path: String,
}

impl ConversionConfirmation {
    pub fn new(video_id: VideoId, path: impl Into<String>) -> Self {
        Self {
            video_id,
            path: path.into(),
        }
    }

    /// Serialize to a message body.
    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
