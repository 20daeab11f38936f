//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Failed to declare {what}: {source}")]
    Declare {
        what: &'static str,
        #[source]
        source: lapin::Error,
    },

    #[error("Publish failed: {0}")]
    Publish(#[source] lapin::Error),

    #[error("Consume failed: {0}")]
    Consume(#[source] lapin::Error),

    #[error("Acknowledgment failed: {0}")]
    Ack(String),

    #[error("Failed to close {what}: {source}")]
    Close {
        what: &'static str,
        #[source]
        source: lapin::Error,
    },

    #[error("Broker connection is closed")]
    Closed,

    #[error("Reconnect cancelled")]
    Cancelled,
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn ack(msg: impl Into<String>) -> Self {
        Self::Ack(msg.into())
    }

    pub fn declare(what: &'static str, source: lapin::Error) -> Self {
        Self::Declare { what, source }
    }
}
