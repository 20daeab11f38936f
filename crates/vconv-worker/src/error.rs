//! Worker error types.

use thiserror::Error;

use vconv_ledger::LedgerError;
use vconv_media::MediaError;
use vconv_queue::QueueError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to deserialize message: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Failed to merge chunks: {0}")]
    Assembly(#[source] MediaError),

    #[error("Failed to convert to MPEG-DASH: {0}")]
    Transcode(#[source] MediaError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to publish message: {0}")]
    Publish(#[source] QueueError),

    #[error("Broker connection lost: {0}")]
    BrokerConnectionLost(#[source] QueueError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Pipeline step the error belongs to, as recorded in the audit log.
    pub fn stage(&self) -> &'static str {
        match self {
            WorkerError::Deserialization(_) => "deserialize",
            WorkerError::Assembly(_) => "assemble",
            WorkerError::Transcode(_) => "transcode",
            WorkerError::Ledger(_) => "ledger",
            WorkerError::Publish(_) => "publish",
            WorkerError::BrokerConnectionLost(_) => "broker",
            WorkerError::ConfigError(_) => "config",
            WorkerError::Io(_) => "io",
        }
    }

    /// Check if error is retryable.
    ///
    /// Malformed messages, bad chunk sets and transcoder failures fail the
    /// same way on every attempt; store, broker and filesystem errors may not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkerError::Ledger(_)
                | WorkerError::Publish(_)
                | WorkerError::BrokerConnectionLost(_)
                | WorkerError::Io(_)
        )
    }

    /// Captured transcoder output, if any.
    pub fn transcoder_output(&self) -> Option<&str> {
        match self {
            WorkerError::Transcode(MediaError::FfmpegFailed {
                output: Some(output),
                ..
            }) => Some(output),
            _ => None,
        }
    }
}
