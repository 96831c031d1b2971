//! Batch Runner
//!
//! Resolves all pending influencer signals in one run: loads them from
//! Postgres, backtests each against its price series, records the best
//! strategy, and notifies subscribers.

mod sink;

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backtester::{BacktestOrchestrator, HttpPriceProvider, ReasoningAnnotator};
use delivery::{LlmAnnotator, RetryPolicy, Subscriber, SubscriberNotifier};
use signal_core::analytics;
use signal_core::config::Config;
use signal_core::db::{self, signals::SignalRepository};
use signal_core::types::StrategyConfig;

use sink::{LlmAnnotatorAdapter, PgRecordSink};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "batch_runner=info,backtester=info,signal_core=info,delivery=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting signal batch runner");

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let retry = RetryPolicy::new(
        config.backtest.retry_max_attempts,
        Duration::from_millis(config.backtest.retry_base_delay_ms),
    );

    let provider = HttpPriceProvider::new(
        config.price_api.base_url.clone(),
        Duration::from_secs(config.price_api.timeout_secs),
        retry.clone(),
    )?;

    let mut subscribers: Vec<Subscriber> = config
        .alerts
        .telegram_chat_ids
        .iter()
        .map(|chat_id| Subscriber::telegram(chat_id))
        .collect();
    subscribers.extend(config.alerts.webhook_urls.iter().map(|url| Subscriber::webhook(url)));

    let notifier = SubscriberNotifier::new(
        config.alerts.telegram_bot_token.clone(),
        retry.clone(),
    );

    let repo = SignalRepository::new(pool.clone());
    let record_sink = PgRecordSink::new(
        SignalRepository::new(pool.clone()),
        notifier,
        subscribers,
    );

    let annotator: Option<Arc<dyn ReasoningAnnotator>> = LlmAnnotator::from_config(&config.llm)
        .map(|inner| Arc::new(LlmAnnotatorAdapter::new(inner)) as Arc<dyn ReasoningAnnotator>);

    let orchestrator = BacktestOrchestrator::new(
        Arc::new(provider),
        Arc::new(record_sink),
        annotator,
        StrategyConfig::default_set(),
        config.backtest.fallback_policy,
    );

    // Abort cleanly at the next signal boundary on Ctrl-C.
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing current signal");
            shutdown_flag.store(true, Ordering::SeqCst);
        }
    });

    let signals = repo.fetch_pending(config.backtest.batch_limit).await?;
    info!(pending = signals.len(), "loaded pending signals");

    let summary = orchestrator.run_batch(&signals, &shutdown).await?;

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        unresolved = summary.unresolved,
        no_data = summary.no_data,
        failed = summary.failed,
        "batch runner finished"
    );

    // Updated author impact factors for every author touched this run.
    let mut authors: Vec<&str> = signals.iter().map(|s| s.author.as_str()).collect();
    authors.sort_unstable();
    authors.dedup();
    for author in authors {
        let (total_pnl, count) = repo.author_totals(author).await?;
        info!(
            author,
            resolved = count,
            impact_factor = %analytics::impact_factor(total_pnl, count),
            version = analytics::IMPACT_FACTOR_VERSION,
            "author impact updated"
        );
    }

    Ok(())
}
