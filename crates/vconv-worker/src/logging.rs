//! Structured logging.
//!
//! Provides tracing initialisation for the binary and a per-job logger that
//! stamps every record with the video ID and operation.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vconv_models::VideoId;

const DEFAULT_FILTER: &str = "info,lapin=warn,sqlx=warn";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches to
/// JSON output.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    video_id: VideoId,
    operation: String,
}

impl JobLogger {
    /// Create a new job logger.
    pub fn new(video_id: VideoId, operation: &str) -> Self {
        Self {
            video_id,
            operation: operation.to_string(),
        }
    }

    /// Log the start of a job operation.
    pub fn log_start(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    /// Log progress of a job operation.
    pub fn log_progress(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Job progress: {}", message
        );
    }

    /// Log a warning during a job operation.
    pub fn log_warning(&self, message: &str) {
        warn!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    /// Log an error during a job operation.
    pub fn log_error(&self, message: &str) {
        error!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    /// Log successful completion of a job operation.
    pub fn log_completion(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    /// Get the video ID.
    pub fn video_id(&self) -> VideoId {
        self.video_id
    }

    /// Get the operation name.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            video_id = %self.video_id,
            operation = %self.operation
        )
    }
}
