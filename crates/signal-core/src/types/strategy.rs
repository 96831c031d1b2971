//! Exit strategy configurations evaluated against each signal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Moving-average flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaKind {
    Sma,
    Ema,
}

/// A named, parameterized exit rule. Each configured strategy is
/// simulated independently against the same price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Exit when price retraces by `trail_pct` from the favorable extreme
    /// reached after the first target was hit.
    TrailingStop { trail_pct: Decimal },
    /// Exit when price crosses its moving average unfavorably after the
    /// first target was hit.
    MovingAverageCross { kind: MaKind, period: usize },
    /// Stop/target pair that advances by the initial target distance each
    /// time the current target is reached. Active from the first tick.
    DynamicTargetRatchet,
}

impl StrategyConfig {
    /// Stable name used for result rows, selection, and reporting.
    pub fn name(&self) -> String {
        match self {
            StrategyConfig::TrailingStop { trail_pct } => {
                format!("trailing_stop_{}pct", (*trail_pct * Decimal::new(100, 0)).normalize())
            }
            StrategyConfig::MovingAverageCross { kind: MaKind::Sma, period } => {
                format!("sma_{period}")
            }
            StrategyConfig::MovingAverageCross { kind: MaKind::Ema, period } => {
                format!("ema_{period}")
            }
            StrategyConfig::DynamicTargetRatchet => "dynamic_ratchet".to_string(),
        }
    }

    /// The default strategy set, in deterministic evaluation order.
    /// Ties in best-strategy selection are broken by this order.
    pub fn default_set() -> Vec<StrategyConfig> {
        vec![
            StrategyConfig::TrailingStop { trail_pct: Decimal::new(1, 2) },
            StrategyConfig::MovingAverageCross { kind: MaKind::Sma, period: 10 },
            StrategyConfig::MovingAverageCross { kind: MaKind::Sma, period: 20 },
            StrategyConfig::MovingAverageCross { kind: MaKind::Ema, period: 10 },
            StrategyConfig::MovingAverageCross { kind: MaKind::Ema, period: 20 },
            StrategyConfig::DynamicTargetRatchet,
        ]
    }
}

/// What to do when the series ends before any strategy exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Leave the signal pending; a later pass with more data (or the
    /// max-exit-time cutoff) will resolve it.
    #[default]
    LeaveUnresolved,
    /// Treat the last observed price as a synthetic exit for every
    /// strategy that never triggered.
    LastPrice,
}

impl std::str::FromStr for FallbackPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "leave_unresolved" => Ok(FallbackPolicy::LeaveUnresolved),
            "last_price" => Ok(FallbackPolicy::LastPrice),
            other => Err(Error::Parse(format!("unknown fallback policy: {other}"))),
        }
    }
}
