//! Idempotency ledger for conversion jobs.
//!
//! This crate provides:
//! - The [`IdempotencyLedger`] trait used by the worker
//! - A PostgreSQL implementation ([`PgLedger`])
//! - An in-memory implementation ([`MemoryLedger`]) for tests and local runs
//! - The append-only failure audit log ([`ErrorLogEntry`])

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{ErrorLogEntry, IdempotencyLedger, MarkOutcome, ProcessedRecord, ProcessedStatus};
pub use memory::MemoryLedger;
pub use postgres::{LedgerConfig, PgLedger};
