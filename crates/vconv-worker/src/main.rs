//! Video conversion worker binary.

use std::sync::Arc;

use tracing::{error, info, warn};

use vconv_ledger::{LedgerConfig, PgLedger};
use vconv_media::{check_ffmpeg, DashTranscoder, FfmpegRunner};
use vconv_queue::{BrokerConfig, BrokerConnection};
use vconv_worker::{logging, metrics, ConversionWorker, JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    logging::init_tracing();

    info!("Starting vconv-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(port) = config.metrics_port {
        if let Err(e) = metrics::install_exporter(port) {
            error!("{}", e);
            std::process::exit(1);
        }
        info!(port, "Metrics exporter listening");
    }

    if let Err(e) = check_ffmpeg(&config.ffmpeg_bin) {
        error!("{}", e);
        std::process::exit(1);
    }

    let ledger = match PgLedger::connect(&LedgerConfig::from_env()).await {
        Ok(ledger) => Arc::new(ledger),
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let broker = match BrokerConnection::connect(BrokerConfig::from_env()).await {
        Ok(broker) => Arc::new(broker),
        Err(e) => {
            error!("Failed to connect to broker: {}", e);
            std::process::exit(1);
        }
    };

    let mut runner = FfmpegRunner::new().with_program(config.ffmpeg_bin.clone());
    if let Some(timeout) = config.transcode_timeout {
        runner = runner.with_timeout(timeout.as_secs());
    }

    let worker = ConversionWorker::from_config(
        &config,
        ledger.clone(),
        broker.clone(),
        Arc::new(DashTranscoder::new(runner)),
    );
    let executor = Arc::new(JobExecutor::new(config.clone(), broker.clone(), worker));

    let mut run = tokio::spawn({
        let executor = Arc::clone(&executor);
        async move { executor.run().await }
    });

    let result = tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            executor.shutdown();
            match tokio::time::timeout(config.shutdown_timeout, &mut run).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "In-flight job did not finish within {:?}, abandoning it",
                        config.shutdown_timeout
                    );
                    run.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    let failed = match result {
        Ok(Ok(())) => false,
        Ok(Err(e)) => {
            error!("Executor error: {}", e);
            true
        }
        Err(e) => {
            error!("Executor task panicked: {}", e);
            true
        }
    };

    if let Err(e) = broker.close().await {
        warn!("Failed to close broker connection: {}", e);
    }
    ledger.close().await;

    if failed {
        std::process::exit(1);
    }
    info!("Worker shutdown complete");
}
