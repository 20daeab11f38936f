//! Per-message conversion pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, error, warn, Instrument};

use vconv_ledger::{ErrorLogEntry, IdempotencyLedger, MarkOutcome};
use vconv_media::{merge_chunks, Transcoder};
use vconv_models::{ConversionConfirmation, ConversionJob, JobPaths, VideoId};
use vconv_queue::{Delivery, Publisher, Topology};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

/// How a single delivery was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Output written, ledger updated, confirmation attempted
    Completed { video_id: VideoId, output_dir: PathBuf },
    /// The video was already converted; nothing was done
    Duplicate { video_id: VideoId },
    /// Processing stopped at `stage`
    Failed {
        video_id: Option<VideoId>,
        stage: &'static str,
        retryable: bool,
        reason: String,
    },
}

impl JobOutcome {
    fn failed(video_id: Option<VideoId>, err: &WorkerError) -> Self {
        JobOutcome::Failed {
            video_id,
            stage: err.stage(),
            retryable: err.is_retryable(),
            reason: err.to_string(),
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, JobOutcome::Failed { retryable: true, .. })
    }
}

/// Turns conversion jobs into DASH packages.
///
/// Each delivery is acknowledged exactly once, whatever the outcome. Failures
/// are written to the audit log; retryable ones are re-published to the retry
/// topology first when one is configured.
pub struct ConversionWorker {
    root_path: PathBuf,
    confirmation: Topology,
    retry: Option<Topology>,
    ledger: Arc<dyn IdempotencyLedger>,
    publisher: Arc<dyn Publisher>,
    transcoder: Arc<dyn Transcoder>,
}

impl ConversionWorker {
    pub fn new(
        root_path: impl Into<PathBuf>,
        confirmation: Topology,
        ledger: Arc<dyn IdempotencyLedger>,
        publisher: Arc<dyn Publisher>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            confirmation,
            retry: None,
            ledger,
            publisher,
            transcoder,
        }
    }

    pub fn from_config(
        config: &WorkerConfig,
        ledger: Arc<dyn IdempotencyLedger>,
        publisher: Arc<dyn Publisher>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self::new(
            config.root_path.clone(),
            config.confirmation.clone(),
            ledger,
            publisher,
            transcoder,
        )
        .with_retry(config.retry.clone())
    }

    pub fn with_retry(mut self, retry: Option<Topology>) -> Self {
        self.retry = retry;
        self
    }

    /// Process one delivery and acknowledge it.
    pub async fn handle(&self, delivery: Delivery) -> JobOutcome {
        metrics::record_received();
        if delivery.redelivered() {
            debug!(delivery_tag = delivery.delivery_tag(), "Processing redelivered message");
        }

        let outcome = self.process(delivery.body()).await;

        if outcome.is_retryable() {
            if let Some(retry) = &self.retry {
                match self.publisher.publish(retry, delivery.body()).await {
                    Ok(()) => debug!(queue = %retry.queue, "Re-published job for retry"),
                    Err(e) => error!(error = %e, queue = %retry.queue, "Failed to re-publish job"),
                }
            }
        }

        let delivery_tag = delivery.delivery_tag();
        if let Err(e) = delivery.ack().await {
            error!(delivery_tag, error = %e, "Failed to acknowledge message");
        }

        metrics::record_outcome(&outcome);
        outcome
    }

    /// Run the pipeline for one message body without settling it.
    pub async fn process(&self, body: &[u8]) -> JobOutcome {
        let job = match ConversionJob::from_slice(body) {
            Ok(job) => job,
            Err(e) => {
                let err = WorkerError::from(e);
                let context = json!({ "body": String::from_utf8_lossy(body) });
                self.record_failure(None, "Failed to deserialize message", &err, context)
                    .await;
                return JobOutcome::failed(None, &err);
            }
        };

        let logger = JobLogger::new(job.video_id, "conversion");
        let span = logger.create_span();
        self.process_job(&job, &logger).instrument(span).await
    }

    async fn process_job(&self, job: &ConversionJob, logger: &JobLogger) -> JobOutcome {
        let video_id = job.video_id;
        logger.log_start(&format!("Received conversion job (path: {})", job.path));

        match self.ledger.is_processed(video_id).await {
            Ok(true) => {
                logger.log_warning("Video already processed, skipping");
                return JobOutcome::Duplicate { video_id };
            }
            Ok(false) => {}
            Err(e) => {
                let err = WorkerError::from(e);
                self.record_failure(
                    Some(video_id),
                    "Failed to check if video was processed",
                    &err,
                    Value::Null,
                )
                .await;
                return JobOutcome::failed(Some(video_id), &err);
            }
        }

        let paths = JobPaths::new(&self.root_path, video_id);
        let output_dir = match self.convert(&paths, logger).await {
            Ok(dir) => dir,
            Err(err) => {
                let message = match &err {
                    WorkerError::Assembly(_) => "Failed to merge chunks",
                    _ => "Failed to convert to MPEG-DASH",
                };
                let mut context = json!({ "chunk_dir": paths.chunk_dir().display().to_string() });
                if let Some(output) = err.transcoder_output() {
                    context["output"] = Value::String(output.to_string());
                }
                self.record_failure(Some(video_id), message, &err, context)
                    .await;
                return JobOutcome::failed(Some(video_id), &err);
            }
        };

        match self.ledger.mark_processed(video_id).await {
            Ok(MarkOutcome::Recorded) => logger.log_progress("Video marked as processed"),
            Ok(MarkOutcome::AlreadyRecorded) => {
                logger.log_warning("Video was marked as processed by another delivery");
                return JobOutcome::Duplicate { video_id };
            }
            Err(e) => {
                let err = WorkerError::from(e);
                self.record_failure(
                    Some(video_id),
                    "Failed to mark video as processed",
                    &err,
                    Value::Null,
                )
                .await;
            }
        }

        let confirmation =
            ConversionConfirmation::new(video_id, output_dir.to_string_lossy().into_owned());
        match self.publish_confirmation(&confirmation).await {
            Ok(()) => logger.log_progress("Published confirmation message"),
            Err(e) => logger.log_error(&e.to_string()),
        }

        logger.log_completion(&format!("Output written to {}", output_dir.display()));
        JobOutcome::Completed {
            video_id,
            output_dir,
        }
    }

    /// Merge the chunks, package them, and return the output directory.
    async fn convert(&self, paths: &JobPaths, logger: &JobLogger) -> WorkerResult<PathBuf> {
        let merged = merge_chunks(paths.chunk_dir(), &paths.merged_file())
            .await
            .map_err(WorkerError::Assembly)?;
        logger.log_progress(&format!(
            "Merged {} chunks ({} bytes)",
            merged.chunk_count, merged.bytes
        ));

        let output_dir = paths.output_dir();
        tokio::fs::create_dir_all(&output_dir).await?;

        let started = Instant::now();
        let manifest = self
            .transcoder
            .package(&merged.path, &output_dir)
            .await
            .map_err(WorkerError::Transcode)?;
        metrics::record_transcode_duration(started.elapsed());
        logger.log_progress(&format!("Packaged {}", manifest.display()));

        if let Err(e) = tokio::fs::remove_file(&merged.path).await {
            logger.log_warning(&format!("Failed to remove merged file: {}", e));
        }

        Ok(output_dir)
    }

    async fn publish_confirmation(
        &self,
        confirmation: &ConversionConfirmation,
    ) -> WorkerResult<()> {
        let body = confirmation.to_vec()?;
        self.publisher
            .publish(&self.confirmation, &body)
            .await
            .map_err(WorkerError::Publish)
    }

    /// Log a failure and append it to the audit log.
    ///
    /// Audit writes are best effort; their own failures are only logged.
    async fn record_failure(
        &self,
        video_id: Option<VideoId>,
        message: &str,
        err: &WorkerError,
        context: Value,
    ) {
        error!(
            video_id = ?video_id.map(|id| id.get()),
            stage = err.stage(),
            error = %err,
            "{}", message
        );

        let entry = ErrorLogEntry::new(video_id, err.stage(), message, err.to_string())
            .with_context(context);
        if let Err(e) = self.ledger.record_error(&entry).await {
            warn!(error = %e, "Failed to record error in audit log");
        }
    }
}
