//! Ledger records and the storage trait.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use vconv_models::VideoId;

use crate::error::{LedgerError, LedgerResult};

/// Status of a processed video. Records are only written on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedStatus {
    #[default]
    Success,
}

impl ProcessedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedStatus::Success => "success",
        }
    }

    pub fn parse(s: &str) -> LedgerResult<Self> {
        match s {
            "success" => Ok(ProcessedStatus::Success),
            other => Err(LedgerError::InvalidRecord(format!(
                "unknown processed status: {}",
                other
            ))),
        }
    }
}

/// A row of `processed_videos`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRecord {
    pub video_id: VideoId,
    pub status: ProcessedStatus,
    pub processed_at: DateTime<Utc>,
}

/// Result of trying to record a successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// This call created the record.
    Recorded,
    /// A record already existed: another delivery of the job won the race.
    AlreadyRecorded,
}

/// One failure, as written to `process_errors_log`.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLogEntry {
    /// Absent when the message body could not be parsed
    pub video_id: Option<VideoId>,
    /// Pipeline step that failed (deserialize, assemble, transcode, ...)
    pub stage: String,
    /// Short description of what failed
    pub message: String,
    /// Full error text
    pub details: String,
    /// Arbitrary structured context
    pub context: Value,
    pub time: DateTime<Utc>,
}

impl ErrorLogEntry {
    pub fn new(
        video_id: Option<VideoId>,
        stage: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            video_id,
            stage: stage.into(),
            message: message.into(),
            details: details.into(),
            context: Value::Null,
            time: Utc::now(),
        }
    }

    /// Attach structured context.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// The JSON document stored in `error_details`.
    pub fn to_json(&self) -> Value {
        let mut doc = json!({
            "video_id": self.video_id.map(|id| id.get()),
            "stage": self.stage,
            "error": self.message,
            "details": self.details,
            "time": self.time.to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        if !self.context.is_null() {
            doc["context"] = self.context.clone();
        }
        doc
    }
}

/// Durable per-job outcome record.
///
/// `mark_processed` is the authoritative gate: the store enforces one record
/// per video, and [`MarkOutcome::AlreadyRecorded`] tells the caller that
/// another worker finished first. `is_processed` is a fast-path check only.
#[async_trait]
pub trait IdempotencyLedger: Send + Sync {
    /// Whether a success record exists for `video_id`.
    async fn is_processed(&self, video_id: VideoId) -> LedgerResult<bool>;

    /// Record a successful conversion with the current timestamp.
    async fn mark_processed(&self, video_id: VideoId) -> LedgerResult<MarkOutcome>;

    /// Append a failure to the audit log.
    async fn record_error(&self, entry: &ErrorLogEntry) -> LedgerResult<()>;
}
