//! Backtester
//!
//! Multi-strategy exit simulation for influencer trading signals.
//!
//! For each pending signal the orchestrator streams one immutable price
//! series through an independent evaluator per configured exit strategy
//! (trailing stop, SMA/EMA cross, dynamic target ratchet), computes the
//! realized P&L of every strategy that exited, and records the best one.
//!
//! # Example
//!
//! ```ignore
//! use backtester::BacktestOrchestrator;
//! use signal_core::types::{FallbackPolicy, StrategyConfig};
//!
//! let orchestrator = BacktestOrchestrator::new(
//!     provider,
//!     sink,
//!     Some(annotator),
//!     StrategyConfig::default_set(),
//!     FallbackPolicy::default(),
//! );
//! let summary = orchestrator.run_batch(&signals, &shutdown).await?;
//! println!("processed {} signals", summary.processed);
//! ```

pub mod evaluator;
pub mod orchestrator;
pub mod price_cache;
pub mod provider;
pub mod sink;

pub use evaluator::{SignalTerms, StrategyEvaluator};
pub use orchestrator::{BacktestOrchestrator, BatchSummary, SignalResolution};
pub use price_cache::PriceCache;
pub use provider::{HttpPriceProvider, PriceSeriesProvider};
pub use sink::{ReasoningAnnotator, RecordAck, SignalRecordSink};
