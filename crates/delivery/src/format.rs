//! Human-readable formatting of backtest outcomes.

use signal_core::types::{BacktestResult, Signal};

/// Deterministic fallback used when the LLM annotator is unavailable or
/// fails.
pub fn placeholder_annotation(result: &BacktestResult) -> String {
    format!(
        "{} produced the best exit at {:.2}% P&L.",
        result.best_strategy, result.best_pnl_pct
    )
}

/// Per-signal summary message delivered to subscribers.
pub fn outcome_message(signal: &Signal, result: &BacktestResult) -> String {
    let mut lines = vec![
        format!(
            "Signal resolved: {} {} by @{}",
            signal.instrument_id.to_uppercase(),
            signal.direction.as_str(),
            signal.author
        ),
        format!(
            "Entry {} | Target {} | Stop {}",
            signal.entry_price, signal.target1, signal.stop_loss
        ),
        format!(
            "Best strategy: {} (exit {}, {:.2}%)",
            result.best_strategy, result.best_exit_price, result.best_pnl_pct
        ),
    ];

    if !result.outcomes.is_empty() {
        lines.push("All exits:".to_string());
        for outcome in &result.outcomes {
            lines.push(format!(
                "  {} -> {} ({:.2}%)",
                outcome.strategy, outcome.exit_price, outcome.pnl_pct
            ));
        }
    }

    if let Some(annotation) = &result.annotation {
        lines.push(annotation.clone());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use signal_core::types::{Direction, SignalState, StrategyOutcome};
    use uuid::Uuid;

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

    #[test]
    fn message_contains_best_strategy_and_author() {
        let (signal, result) = fixture();
        let message = outcome_message(&signal, &result);
        assert!(message.contains("BITCOIN"));
        assert!(message.contains("@trader_joe"));
        assert!(message.contains("trailing_stop_1pct"));
    }

    #[test]
    fn placeholder_is_one_sentence() {
        let (_, result) = fixture();
        let text = placeholder_annotation(&result);
        assert!(text.ends_with('.'));
        assert!(text.contains("trailing_stop_1pct"));
    }
}
