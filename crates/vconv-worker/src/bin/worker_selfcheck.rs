use std::path::Path;

use anyhow::Context;

use vconv_ledger::{LedgerConfig, PgLedger};
use vconv_media::check_ffmpeg;
use vconv_queue::{BrokerConfig, BrokerConnection};
use vconv_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with root_path={}",
        config.root_path.display()
    );
    ensure_root_path(&config.root_path).await?;

    let ffmpeg = check_ffmpeg(&config.ffmpeg_bin)?;
    println!("worker-selfcheck: ffmpeg at {}", ffmpeg.display());

    ensure_env_present(&["RABBITMQ_URL", "DATABASE_URL"])?;

    let ledger = PgLedger::connect(&LedgerConfig::from_env())
        .await
        .context("database unreachable")?;
    ledger.close().await;

    let broker = BrokerConnection::connect(BrokerConfig::from_env())
        .await
        .context("broker unreachable")?;
    broker.close().await.context("failed to close broker connection")?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_root_path(path: &Path) -> anyhow::Result<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("video root {} not accessible", path.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("video root {} is not a directory", path.display());
    }
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            anyhow::bail!("missing required env var {}", var);
        }
    }
    Ok(())
}
