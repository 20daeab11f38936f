//! In-memory ledger.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use vconv_models::VideoId;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{ErrorLogEntry, IdempotencyLedger, MarkOutcome, ProcessedRecord, ProcessedStatus};

/// Ledger kept in process memory, with the same conflict semantics as the
/// PostgreSQL table. Writes can be made to fail to simulate a store outage.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    processed: Mutex<HashMap<VideoId, ProcessedRecord>>,
    errors: Mutex<Vec<ErrorLogEntry>>,
    fail_writes: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write return [`LedgerError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn record(&self, video_id: VideoId) -> Option<ProcessedRecord> {
        self.processed.lock().await.get(&video_id).cloned()
    }

    pub async fn processed_count(&self) -> usize {
        self.processed.lock().await.len()
    }

    /// Audit log entries in insertion order.
    pub async fn errors(&self) -> Vec<ErrorLogEntry> {
        self.errors.lock().await.clone()
    }

    fn check_writable(&self) -> LedgerResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(LedgerError::unavailable("memory ledger writes disabled"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdempotencyLedger for MemoryLedger {
    async fn is_processed(&self, video_id: VideoId) -> LedgerResult<bool> {
        Ok(self.processed.lock().await.contains_key(&video_id))
    }

    async fn mark_processed(&self, video_id: VideoId) -> LedgerResult<MarkOutcome> {
        self.check_writable()?;

        let mut processed = self.processed.lock().await;
        if processed.contains_key(&video_id) {
            return Ok(MarkOutcome::AlreadyRecorded);
        }
        processed.insert(
            video_id,
            ProcessedRecord {
                video_id,
                status: ProcessedStatus::Success,
                processed_at: Utc::now(),
            },
        );
        Ok(MarkOutcome::Recorded)
    }

    async fn record_error(&self, entry: &ErrorLogEntry) -> LedgerResult<()> {
        self.check_writable()?;
        self.errors.lock().await.push(entry.clone());
        Ok(())
    }
}
