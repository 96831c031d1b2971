//! Backtest outcome types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Direction;

/// Exit produced by one strategy for one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    /// Strategy name (see `StrategyConfig::name`).
    pub strategy: String,
    /// Price the strategy exited at.
    pub exit_price: Decimal,
    /// Realized P&L percentage under the signal's direction.
    pub pnl_pct: Decimal,
}

impl StrategyOutcome {
    pub fn new(strategy: String, direction: Direction, entry: Decimal, exit: Decimal) -> Self {
        Self {
            strategy,
            exit_price: exit,
            pnl_pct: direction.pnl_pct(entry, exit),
        }
    }
}

/// Per-signal backtest output. Created once, written once, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Signal this result belongs to.
    pub signal_id: Uuid,
    /// Every strategy that reached an exit, in evaluation order.
    pub outcomes: Vec<StrategyOutcome>,
    /// Name of the strategy with the highest P&L.
    pub best_strategy: String,
    /// Exit price of the best strategy.
    pub best_exit_price: Decimal,
    /// P&L percentage of the best strategy.
    pub best_pnl_pct: Decimal,
    /// Optional one-sentence explanation of the winning strategy.
    pub annotation: Option<String>,
    /// When the result was computed.
    pub computed_at: DateTime<Utc>,
}

impl BacktestResult {
    /// Build a result by picking the maximum-P&L outcome. Ties are broken
    /// by evaluation order: the first strategy in `outcomes` wins.
    /// Returns None when no strategy exited.
    pub fn from_outcomes(signal_id: Uuid, outcomes: Vec<StrategyOutcome>) -> Option<Self> {
        let mut best: Option<&StrategyOutcome> = None;
        for outcome in &outcomes {
            match best {
                Some(b) if outcome.pnl_pct <= b.pnl_pct => {}
                _ => best = Some(outcome),
            }
        }

        let best = best?.clone();
        Some(Self {
            signal_id,
            outcomes,
            best_strategy: best.strategy,
            best_exit_price: best.exit_price,
            best_pnl_pct: best.pnl_pct,
            annotation: None,
            computed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(strategy: &str, pnl: i64) -> StrategyOutcome {
        StrategyOutcome {
            strategy: strategy.to_string(),
            exit_price: Decimal::new(100, 0),
            pnl_pct: Decimal::new(pnl, 0),
        }
    }

    #[test]
    fn best_is_max_pnl() {
        let result = BacktestResult::from_outcomes(
            Uuid::new_v4(),
            vec![outcome("a", 3), outcome("b", 8), outcome("c", -2)],
        )
        .unwrap();
        assert_eq!(result.best_strategy, "b");
        assert_eq!(result.best_pnl_pct, Decimal::new(8, 0));
        for o in &result.outcomes {
            assert!(result.best_pnl_pct >= o.pnl_pct);
        }
    }

    #[test]
    fn ties_go_to_first_in_order() {
        let result = BacktestResult::from_outcomes(
            Uuid::new_v4(),
            vec![outcome("first", 5), outcome("second", 5)],
        )
        .unwrap();
        assert_eq!(result.best_strategy, "first");
    }

    #[test]
    fn no_exits_yields_none() {
        assert!(BacktestResult::from_outcomes(Uuid::new_v4(), vec![]).is_none());
    }
}
