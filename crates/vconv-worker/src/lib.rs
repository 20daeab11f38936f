//! Video conversion worker.
//!
//! This crate provides:
//! - The per-message conversion state machine ([`ConversionWorker`])
//! - The supervised consume loop with broker reconnect ([`JobExecutor`])
//! - Configuration, structured logging and metrics
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use processor::{ConversionWorker, JobOutcome};
