//! Postgres-backed record sink and annotator adapter.

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use backtester::{ReasoningAnnotator, RecordAck, SignalRecordSink};
use delivery::{DeliveryReport, LlmAnnotator, Subscriber, SubscriberNotifier};
use signal_core::db::signals::SignalRepository;
use signal_core::types::{BacktestResult, Direction, Signal};
use signal_core::Result;

/// Result persistence seam so the sink can be exercised without a live
/// database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn insert_result(&self, result: &BacktestResult) -> Result<bool>;
    async fn mark_processed(&self, signal_id: Uuid) -> Result<bool>;
}

#[async_trait]
impl ResultStore for SignalRepository {
    async fn insert_result(&self, result: &BacktestResult) -> Result<bool> {
        SignalRepository::insert_result(self, result).await
    }

    async fn mark_processed(&self, signal_id: Uuid) -> Result<bool> {
        SignalRepository::mark_processed(self, signal_id).await
    }
}

/// Outbound delivery seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutcomeNotifier: Send + Sync {
    async fn notify_all(&self, subscribers: &[Subscriber], message: &str) -> Vec<DeliveryReport>;
}

#[async_trait]
impl OutcomeNotifier for SubscriberNotifier {
    async fn notify_all(&self, subscribers: &[Subscriber], message: &str) -> Vec<DeliveryReport> {
        SubscriberNotifier::notify_all(self, subscribers, message).await
    }
}

/// Persists results, flips signals to processed, and fans delivery out
/// to subscribers. Delivery problems are logged per subscriber and never
/// fail the record call.
pub struct PgRecordSink<S = SignalRepository, N = SubscriberNotifier> {
    repo: S,
    notifier: N,
    subscribers: Vec<Subscriber>,
}

impl<S: ResultStore, N: OutcomeNotifier> PgRecordSink<S, N> {
    pub fn new(repo: S, notifier: N, subscribers: Vec<Subscriber>) -> Self {
        Self {
            repo,
            notifier,
            subscribers,
        }
    }
}

#[async_trait]
impl<S: ResultStore, N: OutcomeNotifier> SignalRecordSink for PgRecordSink<S, N> {
    async fn record(&self, signal: &Signal, result: &BacktestResult) -> Result<RecordAck> {
        let fresh = self.repo.insert_result(result).await?;
        self.repo.mark_processed(signal.id).await?;

        // Only a fresh write notifies; re-runs stay silent.
        if fresh && !self.subscribers.is_empty() {
            let message = delivery::outcome_message(signal, result);
            let reports = self.notifier.notify_all(&self.subscribers, &message).await;

            let delivered = reports.iter().filter(|r| r.delivered).count();
            if delivered < reports.len() {
                warn!(
                    signal_id = %signal.id,
                    delivered,
                    total = reports.len(),
                    "some subscriber notifications failed"
                );
            } else {
                info!(signal_id = %signal.id, delivered, "subscribers notified");
            }
        }

        Ok(RecordAck { fresh })
    }

    async fn mark_skipped(&self, signal_id: Uuid) -> Result<()> {
        self.repo.mark_processed(signal_id).await?;
        Ok(())
    }
}

/// Bridges the standalone LLM client into the orchestrator's annotator
/// seam.
pub struct LlmAnnotatorAdapter {
    inner: LlmAnnotator,
}

impl LlmAnnotatorAdapter {
    pub fn new(inner: LlmAnnotator) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ReasoningAnnotator for LlmAnnotatorAdapter {
    async fn annotate(&self, result: &BacktestResult, direction: Direction) -> Result<String> {
        self.inner.annotate(result, direction).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use signal_core::types::{SignalState, StrategyOutcome};

    fn fixture() -> (Signal, BacktestResult) {
        let signal = Signal {
            id: Uuid::new_v4(),
            instrument_id: "bitcoin".to_string(),
            direction: Direction::Long,
            entry_price: Decimal::new(100, 0),
            target1: Decimal::new(110, 0),
            stop_loss: Decimal::new(95, 0),
            entry_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            max_exit_time: None,
            state: SignalState::Pending,
            author: "trader_joe".to_string(),
            source_url: None,
        };

        let result = BacktestResult::from_outcomes(
            signal.id,
            vec![StrategyOutcome {
                strategy: "trailing_stop_1pct".to_string(),
                exit_price: Decimal::new(108, 0),
                pnl_pct: Decimal::new(8, 0),
            }],
        )
        .unwrap();

        (signal, result)
    }

    fn delivered(subscribers: &[Subscriber]) -> Vec<DeliveryReport> {
        subscribers
            .iter()
            .map(|s| DeliveryReport {
                subscriber_id: s.id.clone(),
                delivered: true,
                error: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn second_record_does_not_notify_again() {
        let (signal, result) = fixture();

        // First write is fresh, the rerun finds the row already there.
        let mut store = MockResultStore::new();
        let mut fresh = true;
        store.expect_insert_result().times(2).returning(move |_| {
            let was_fresh = fresh;
            fresh = false;
            Ok(was_fresh)
        });
        store.expect_mark_processed().times(2).returning(|_| Ok(true));

        let mut notifier = MockOutcomeNotifier::new();
        notifier
            .expect_notify_all()
            .times(1)
            .returning(|subs, _| delivered(subs));

        let sink = PgRecordSink::new(store, notifier, vec![Subscriber::telegram("42")]);

        let first = sink.record(&signal, &result).await.unwrap();
        assert!(first.fresh);

        let second = sink.record(&signal, &result).await.unwrap();
        assert!(!second.fresh);
    }

    #[tokio::test]
    async fn no_subscribers_means_no_delivery_calls() {
        let (signal, result) = fixture();

        let mut store = MockResultStore::new();
        store.expect_insert_result().returning(|_| Ok(true));
        store.expect_mark_processed().returning(|_| Ok(true));

        let mut notifier = MockOutcomeNotifier::new();
        notifier.expect_notify_all().never();

        let sink = PgRecordSink::new(store, notifier, vec![]);

        let ack = sink.record(&signal, &result).await.unwrap();
        assert!(ack.fresh);
    }

    #[tokio::test]
    async fn mark_skipped_only_touches_the_store() {
        let mut store = MockResultStore::new();
        store.expect_mark_processed().times(1).returning(|_| Ok(true));

        let mut notifier = MockOutcomeNotifier::new();
        notifier.expect_notify_all().never();

        let sink = PgRecordSink::new(store, notifier, vec![Subscriber::telegram("42")]);

        sink.mark_skipped(Uuid::new_v4()).await.unwrap();
    }
}
