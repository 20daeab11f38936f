//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use vconv_queue::Topology;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Shared upload root; chunks for video N live in `<root_path>/N`
    pub root_path: PathBuf,
    /// Where conversion jobs are consumed from
    pub conversion: Topology,
    /// Where confirmations are published
    pub confirmation: Topology,
    /// Where retryable failures are re-published; `None` acknowledges them
    pub retry: Option<Topology>,
    /// FFmpeg binary name or path
    pub ffmpeg_bin: String,
    /// Maximum transcoder run time
    pub transcode_timeout: Option<Duration>,
    /// How long shutdown waits for the in-flight job
    pub shutdown_timeout: Duration,
    /// Prometheus exporter port
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("/media/uploads"),
            conversion: Topology::new("conversion_exchange", "conversion", "video_conversion_queue"),
            confirmation: Topology::new(
                "conversion_exchange",
                "finish-conversion",
                "video_confirmation_queue",
            ),
            retry: None,
            ffmpeg_bin: "ffmpeg".to_string(),
            transcode_timeout: None,
            shutdown_timeout: Duration::from_secs(30),
            metrics_port: None,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let exchange = env_or("CONVERSION_EXCHANGE", &defaults.conversion.exchange);
        let conversion = Topology::new(
            exchange.clone(),
            env_or("CONVERSION_KEY", &defaults.conversion.routing_key),
            env_or("CONVERSION_QUEUE", &defaults.conversion.queue),
        );
        let confirmation = Topology::new(
            env_or("CONFIRMATION_EXCHANGE", &exchange),
            env_or("CONFIRMATION_KEY", &defaults.confirmation.routing_key),
            env_or("CONFIRMATION_QUEUE", &defaults.confirmation.queue),
        );
        let retry = std::env::var("RETRY_QUEUE")
            .ok()
            .filter(|q| !q.is_empty())
            .map(|queue| {
                Topology::new(
                    exchange.clone(),
                    env_or("RETRY_KEY", "conversion-retry"),
                    queue,
                )
            });

        Self {
            root_path: std::env::var("VIDEO_ROOT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.root_path),
            conversion,
            confirmation,
            retry,
            ffmpeg_bin: env_or("FFMPEG_BIN", &defaults.ffmpeg_bin),
            transcode_timeout: std::env::var("TRANSCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            metrics_port: std::env::var("METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}
