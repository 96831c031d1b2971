//! Outbound interfaces consumed by the orchestrator.

use async_trait::async_trait;
use uuid::Uuid;

use signal_core::types::{BacktestResult, Direction, Signal};
use signal_core::Result;

/// Acknowledgement of a result write.
#[derive(Debug, Clone, Copy)]
pub struct RecordAck {
    /// False when a previous run already recorded this signal; callers
    /// must not duplicate notifications in that case.
    pub fresh: bool,
}

/// Persistence and delivery boundary. Implementations persist the
/// result, mark the signal processed, and notify subscribers; delivery
/// failures are handled internally and never bubble into the backtest.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalRecordSink: Send + Sync {
    /// Record a resolved signal. Safe to call at most once per signal;
    /// retries must be idempotent.
    async fn record(&self, signal: &Signal, result: &BacktestResult) -> Result<RecordAck>;

    /// Mark a signal processed without a result (validation skip), so it
    /// is never reprocessed.
    async fn mark_skipped(&self, signal_id: Uuid) -> Result<()>;
}

/// Optional LLM enrichment. Failures degrade to a placeholder at the
/// call site; they never propagate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningAnnotator: Send + Sync {
    async fn annotate(&self, result: &BacktestResult, direction: Direction) -> Result<String>;
}
