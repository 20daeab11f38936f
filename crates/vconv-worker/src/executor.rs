//! Job executor.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{error, info, warn};

use vconv_queue::{MessageSource, QueueError};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::processor::ConversionWorker;

/// Consumes conversion jobs one at a time and keeps the consumer alive
/// across broker outages.
pub struct JobExecutor {
    config: WorkerConfig,
    broker: Arc<dyn MessageSource>,
    worker: ConversionWorker,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(
        config: WorkerConfig,
        broker: Arc<dyn MessageSource>,
        worker: ConversionWorker,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            broker,
            worker,
            shutdown,
        }
    }

    /// Start the executor.
    ///
    /// Returns once shutdown is requested and the in-flight job, if any, has
    /// been acknowledged.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            queue = %self.config.conversion.queue,
            root = %self.config.root_path.display(),
            "Starting job executor"
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        'consume: while !*shutdown_rx.borrow() {
            let mut deliveries = match self.broker.consume(&self.config.conversion).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to start consumer: {}", e);
                    self.recover(&mut shutdown_rx).await?;
                    continue;
                }
            };

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break 'consume;
                        }
                    }
                    next = deliveries.next() => match next {
                        Some(Ok(delivery)) => {
                            self.worker.handle(delivery).await;
                        }
                        Some(Err(e)) => {
                            warn!("Delivery stream failed: {}", e);
                            break;
                        }
                        None => {
                            warn!("Delivery stream ended");
                            break;
                        }
                    }
                }
            }

            self.recover(&mut shutdown_rx).await?;
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Signal shutdown. The executor stops after the in-flight job.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Get ready to consume again after the stream stopped.
    ///
    /// Reconnects when the broker session is gone; otherwise waits one
    /// retry delay before the consumer is recreated.
    async fn recover(&self, shutdown_rx: &mut watch::Receiver<bool>) -> WorkerResult<()> {
        if *shutdown_rx.borrow() {
            return Ok(());
        }

        if !self.broker.is_closed().await {
            tokio::select! {
                _ = tokio::time::sleep(self.broker.retry_delay()) => {}
                _ = shutdown_rx.changed() => {}
            }
            return Ok(());
        }

        warn!("Broker connection lost, reconnecting");
        metrics::record_reconnect();
        match self.broker.reconnect(shutdown_rx).await {
            Ok(()) | Err(QueueError::Cancelled) => Ok(()),
            Err(e) => Err(WorkerError::BrokerConnectionLost(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::stream;
    use tokio::sync::{Mutex, Notify};

    use vconv_ledger::MemoryLedger;
    use vconv_media::{MediaError, MediaResult, Transcoder};
    use vconv_queue::{
        reconnect_with, Acknowledger, Delivery, DeliveryStream, Publisher, QueueResult, Topology,
    };

    const RETRY_DELAY: Duration = Duration::from_millis(10);

    #[derive(Clone, Copy)]
    enum Reconnect {
        Succeed,
        Hang,
        Fail,
    }

    /// Hands out one scripted stream per `consume` call, then a stream that
    /// never yields.
    struct ScriptedSource {
        streams: Mutex<VecDeque<QueueResult<Vec<Delivery>>>>,
        closed: AtomicBool,
        reconnect: Reconnect,
        consumes: AtomicU32,
        reconnects: AtomicU32,
    }

    impl ScriptedSource {
        fn new(closed: bool, reconnect: Reconnect) -> Self {
            Self {
                streams: Mutex::new(VecDeque::new()),
                closed: AtomicBool::new(closed),
                reconnect,
                consumes: AtomicU32::new(0),
                reconnects: AtomicU32::new(0),
            }
        }

        fn then(self, next: QueueResult<Vec<Delivery>>) -> Self {
            self.streams.try_lock().unwrap().push_back(next);
            self
        }

        fn consumes(&self) -> u32 {
            self.consumes.load(Ordering::SeqCst)
        }

        fn reconnects(&self) -> u32 {
            self.reconnects.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MessageSource for ScriptedSource {
        async fn consume(&self, _topology: &Topology) -> QueueResult<DeliveryStream> {
            self.consumes.fetch_add(1, Ordering::SeqCst);
            match self.streams.lock().await.pop_front() {
                Some(Ok(deliveries)) => Ok(Box::pin(stream::iter(deliveries.into_iter().map(Ok)))),
                Some(Err(e)) => Err(e),
                None => Ok(Box::pin(stream::pending::<QueueResult<Delivery>>())),
            }
        }

        async fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        async fn reconnect(&self, cancel: &mut watch::Receiver<bool>) -> QueueResult<()> {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            match self.reconnect {
                Reconnect::Succeed => {
                    self.closed.store(false, Ordering::SeqCst);
                    Ok(())
                }
                Reconnect::Hang => {
                    reconnect_with(RETRY_DELAY, cancel, || async {
                        Err::<(), _>(QueueError::connection_failed("connection refused"))
                    })
                    .await
                }
                Reconnect::Fail => Err(QueueError::connection_failed("credentials rejected")),
            }
        }

        fn retry_delay(&self) -> Duration {
            RETRY_DELAY
        }
    }

    struct NullPublisher;

    #[async_trait]
    impl Publisher for NullPublisher {
        async fn publish(&self, _topology: &Topology, _body: &[u8]) -> QueueResult<()> {
            Ok(())
        }
    }

    struct NullTranscoder;

    #[async_trait]
    impl Transcoder for NullTranscoder {
        async fn package(&self, _input: &Path, _output_dir: &Path) -> MediaResult<PathBuf> {
            Err(MediaError::FfmpegNotFound("ffmpeg".to_string()))
        }
    }

    struct CountingAcker(Arc<AtomicU32>);

    #[async_trait]
    impl Acknowledger for CountingAcker {
        async fn ack(&self) -> QueueResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn nack(&self, _requeue: bool) -> QueueResult<()> {
            panic!("executor must not nack");
        }
    }

    /// Holds the ack until released, keeping the job in flight.
    struct GatedAcker {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        acks: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Acknowledger for GatedAcker {
        async fn ack(&self) -> QueueResult<()> {
            self.entered.notify_one();
            self.release.notified().await;
            self.acks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn nack(&self, _requeue: bool) -> QueueResult<()> {
            panic!("executor must not nack");
        }
    }

    // Malformed bodies fail before touching chunks, so no files are needed.
    fn delivery(acks: &Arc<AtomicU32>) -> Delivery {
        Delivery::new(b"not json".to_vec(), 1, false, CountingAcker(acks.clone()))
    }

    fn executor(source: Arc<ScriptedSource>) -> Arc<JobExecutor> {
        let config = WorkerConfig::default();
        let worker = ConversionWorker::from_config(
            &config,
            Arc::new(MemoryLedger::new()),
            Arc::new(NullPublisher),
            Arc::new(NullTranscoder),
        );
        Arc::new(JobExecutor::new(config, source, worker))
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_reconnects_after_connection_loss() {
        let acks = Arc::new(AtomicU32::new(0));
        let source = Arc::new(
            ScriptedSource::new(true, Reconnect::Succeed)
                .then(Ok(vec![delivery(&acks)]))
                .then(Ok(vec![delivery(&acks)])),
        );
        let executor = executor(source.clone());
        let run = tokio::spawn({
            let executor = executor.clone();
            async move { executor.run().await }
        });

        // Second stream ends on a live connection, so a third consume follows
        // without another reconnect.
        wait_until(|| source.consumes() == 3).await;
        executor.shutdown();
        run.await.unwrap().unwrap();

        assert_eq!(acks.load(Ordering::SeqCst), 2);
        assert_eq!(source.reconnects(), 1);
    }

    #[tokio::test]
    async fn test_open_connection_reconsumes_without_reconnect() {
        let source = Arc::new(ScriptedSource::new(false, Reconnect::Fail).then(Ok(Vec::new())));
        let executor = executor(source.clone());
        let run = tokio::spawn({
            let executor = executor.clone();
            async move { executor.run().await }
        });

        wait_until(|| source.consumes() == 2).await;
        executor.shutdown();
        run.await.unwrap().unwrap();

        assert_eq!(source.reconnects(), 0);
    }

    #[tokio::test]
    async fn test_consume_error_is_retried() {
        let acks = Arc::new(AtomicU32::new(0));
        let source = Arc::new(
            ScriptedSource::new(false, Reconnect::Fail)
                .then(Err(QueueError::Closed))
                .then(Ok(vec![delivery(&acks)])),
        );
        let executor = executor(source.clone());
        let run = tokio::spawn({
            let executor = executor.clone();
            async move { executor.run().await }
        });

        wait_until(|| acks.load(Ordering::SeqCst) == 1).await;
        executor.shutdown();
        run.await.unwrap().unwrap();

        assert!(source.consumes() >= 2);
        assert_eq!(source.reconnects(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_reconnect() {
        let source = Arc::new(ScriptedSource::new(true, Reconnect::Hang).then(Ok(Vec::new())));
        let executor = executor(source.clone());
        let run = tokio::spawn({
            let executor = executor.clone();
            async move { executor.run().await }
        });

        wait_until(|| source.reconnects() == 1).await;
        executor.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("executor did not stop");
        result.unwrap().unwrap();
        assert_eq!(source.consumes(), 1);
    }

    #[tokio::test]
    async fn test_failed_reconnect_stops_executor() {
        let source = Arc::new(ScriptedSource::new(true, Reconnect::Fail).then(Ok(Vec::new())));
        let executor = executor(source.clone());

        let err = executor.run().await.unwrap_err();

        assert!(matches!(err, WorkerError::BrokerConnectionLost(_)));
        assert_eq!(err.stage(), "broker");
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_job() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let acks = Arc::new(AtomicU32::new(0));
        let gated = Delivery::new(
            b"not json".to_vec(),
            1,
            false,
            GatedAcker {
                entered: entered.clone(),
                release: release.clone(),
                acks: acks.clone(),
            },
        );
        let source = Arc::new(
            ScriptedSource::new(false, Reconnect::Fail).then(Ok(vec![gated, delivery(&acks)])),
        );
        let executor = executor(source.clone());
        let run = tokio::spawn({
            let executor = executor.clone();
            async move { executor.run().await }
        });

        entered.notified().await;
        executor.shutdown();
        release.notify_one();
        run.await.unwrap().unwrap();

        // The in-flight job finished; the queued one was left for the broker.
        assert_eq!(acks.load(Ordering::SeqCst), 1);
    }
}
