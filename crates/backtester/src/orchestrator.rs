//! Drives signals through every configured strategy and records the best
//! outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use signal_core::types::{
    BacktestResult, FallbackPolicy, PricePoint, Signal, SignalState, StrategyConfig,
    StrategyOutcome,
};
use signal_core::Result;

use crate::evaluator::{SignalTerms, StrategyEvaluator};
use crate::price_cache::PriceCache;
use crate::provider::PriceSeriesProvider;
use crate::sink::{ReasoningAnnotator, SignalRecordSink};

/// How one signal ended up after a resolution attempt.
#[derive(Debug)]
pub enum SignalResolution {
    /// Best strategy selected and handed to the sink.
    Resolved(BacktestResult),
    /// Signal was already processed by an earlier run.
    AlreadyProcessed,
    /// Validation failed; signal marked processed so it is never retried.
    Skipped { reason: String },
    /// No price data after filtering; signal left pending for a later
    /// pass.
    NoPriceData,
    /// No strategy exited and the fallback policy leaves the signal
    /// pending until more data exists or the time cutoff forces exits.
    Unresolved,
}

/// End-of-run counters logged by the batch driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub unresolved: usize,
    pub no_data: usize,
    pub failed: usize,
    pub aborted: bool,
}

/// Resolves signals end-to-end: fetch prices (cached per batch), stream
/// them through one evaluator per strategy in a single pass, select the
/// best exit, and delegate persistence/delivery to the sink.
pub struct BacktestOrchestrator {
    provider: Arc<dyn PriceSeriesProvider>,
    sink: Arc<dyn SignalRecordSink>,
    annotator: Option<Arc<dyn ReasoningAnnotator>>,
    strategies: Vec<StrategyConfig>,
    fallback: FallbackPolicy,
    cache: PriceCache,
}

impl BacktestOrchestrator {
    pub fn new(
        provider: Arc<dyn PriceSeriesProvider>,
        sink: Arc<dyn SignalRecordSink>,
        annotator: Option<Arc<dyn ReasoningAnnotator>>,
        strategies: Vec<StrategyConfig>,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            provider,
            sink,
            annotator,
            strategies,
            fallback,
            cache: PriceCache::new(),
        }
    }

    /// Process a batch sequentially. Abortable between signals via
    /// `shutdown`; a signal that already completed is never rolled back.
    /// Per-signal errors are contained; only fatal (store-level) errors
    /// abort the run.
    pub async fn run_batch(
        &self,
        signals: &[Signal],
        shutdown: &AtomicBool,
    ) -> anyhow::Result<BatchSummary> {
        // The cache lives for exactly one batch run.
        self.cache.clear();

        let mut summary = BatchSummary::default();

        for signal in signals {
            if shutdown.load(Ordering::SeqCst) {
                info!("shutdown requested, stopping batch at signal boundary");
                summary.aborted = true;
                break;
            }

            match self.resolve_signal(signal).await {
                Ok(SignalResolution::Resolved(_)) => summary.processed += 1,
                Ok(SignalResolution::AlreadyProcessed)
                | Ok(SignalResolution::Skipped { .. }) => summary.skipped += 1,
                Ok(SignalResolution::NoPriceData) => summary.no_data += 1,
                Ok(SignalResolution::Unresolved) => summary.unresolved += 1,
                Err(error) if error.is_fatal() => {
                    return Err(anyhow::Error::from(error).context("batch aborted"));
                }
                Err(error) => {
                    warn!(
                        signal_id = %signal.id,
                        error = %error,
                        "signal failed, continuing batch"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            unresolved = summary.unresolved,
            no_data = summary.no_data,
            failed = summary.failed,
            aborted = summary.aborted,
            "batch complete"
        );

        Ok(summary)
    }

    /// Resolve one signal. Re-running a processed signal is a no-op.
    pub async fn resolve_signal(&self, signal: &Signal) -> Result<SignalResolution> {
        if signal.state == SignalState::Processed {
            debug!(signal_id = %signal.id, "signal already processed, skipping");
            return Ok(SignalResolution::AlreadyProcessed);
        }

        if let Err(error) = signal.validate() {
            warn!(signal_id = %signal.id, error = %error, "invalid signal, skipping");
            self.sink.mark_skipped(signal.id).await?;
            return Ok(SignalResolution::Skipped {
                reason: error.to_string(),
            });
        }

        let series = self
            .cache
            .get_or_fetch(
                self.provider.as_ref(),
                &signal.instrument_id,
                signal.entry_time,
            )
            .await?;

        let filtered: Vec<&PricePoint> = series
            .iter()
            .filter(|p| p.timestamp >= signal.entry_time)
            .collect();

        if filtered.is_empty() {
            warn!(
                signal_id = %signal.id,
                instrument = %signal.instrument_id,
                "no price data in the signal window, leaving pending"
            );
            return Ok(SignalResolution::NoPriceData);
        }

        let terms = SignalTerms::from_signal(signal);
        let outcomes = self.simulate(&terms, &filtered);

        let result = match BacktestResult::from_outcomes(signal.id, outcomes) {
            Some(result) => result,
            None => {
                debug!(
                    signal_id = %signal.id,
                    "no strategy exited within the series, leaving pending"
                );
                return Ok(SignalResolution::Unresolved);
            }
        };

        let mut result = result;
        result.annotation = Some(self.annotate(&result, &terms).await);

        let ack = self.sink.record(signal, &result).await?;
        if !ack.fresh {
            debug!(signal_id = %signal.id, "result already recorded by an earlier run");
        }

        info!(
            signal_id = %signal.id,
            instrument = %signal.instrument_id,
            best = %result.best_strategy,
            best_pnl_pct = %result.best_pnl_pct,
            exited = result.outcomes.len(),
            "signal resolved"
        );

        Ok(SignalResolution::Resolved(result))
    }

    /// Single pass over the filtered series, O(points x strategies).
    fn simulate(&self, terms: &SignalTerms, filtered: &[&PricePoint]) -> Vec<StrategyOutcome> {
        let mut evaluators: Vec<StrategyEvaluator> = self
            .strategies
            .iter()
            .map(|config| StrategyEvaluator::new(config.clone(), terms))
            .collect();

        for point in filtered {
            let mut all_exited = true;
            for evaluator in evaluators.iter_mut() {
                evaluator.on_price(terms, point);
                all_exited &= evaluator.has_exited();
            }
            if all_exited {
                break;
            }
        }

        let mut outcomes: Vec<StrategyOutcome> = evaluators
            .iter()
            .filter_map(|evaluator| {
                evaluator.exit_price().map(|exit| {
                    StrategyOutcome::new(evaluator.name(), terms.direction, terms.entry_price, exit)
                })
            })
            .collect();

        if outcomes.is_empty() && self.fallback == FallbackPolicy::LastPrice {
            let last = filtered
                .last()
                .map(|p| p.price)
                .unwrap_or(terms.entry_price);
            outcomes = evaluators
                .iter()
                .map(|evaluator| {
                    StrategyOutcome::new(evaluator.name(), terms.direction, terms.entry_price, last)
                })
                .collect();
        }

        outcomes
    }

    async fn annotate(&self, result: &BacktestResult, terms: &SignalTerms) -> String {
        match &self.annotator {
            Some(annotator) => match annotator.annotate(result, terms.direction).await {
                Ok(sentence) => sentence,
                Err(error) => {
                    warn!(
                        signal_id = %result.signal_id,
                        error = %error,
                        "annotation failed, using placeholder"
                    );
                    delivery::placeholder_annotation(result)
                }
            },
            None => delivery::placeholder_annotation(result),
        }
    }
}
