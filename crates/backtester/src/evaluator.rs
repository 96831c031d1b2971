//! Per-strategy exit simulation.
//!
//! One `StrategyEvaluator` owns the mutable state for a single
//! (signal, strategy) pair and consumes price points in increasing
//! timestamp order. Once an exit price is set the evaluator stops
//! mutating; strategies that never set one are excluded from selection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;

use signal_core::types::{Direction, MaKind, PricePoint, Signal, StrategyConfig};

/// Immutable per-signal terms shared by every evaluator of that signal.
#[derive(Debug, Clone, Copy)]
pub struct SignalTerms {
    pub direction: Direction,
    pub entry_price: Decimal,
    pub target1: Decimal,
    pub stop_loss: Decimal,
    pub max_exit_time: Option<DateTime<Utc>>,
}

impl SignalTerms {
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            direction: signal.direction,
            entry_price: signal.entry_price,
            target1: signal.target1,
            stop_loss: signal.stop_loss,
            max_exit_time: signal.max_exit_time,
        }
    }
}

/// Stateful simulation of one exit strategy against one signal.
#[derive(Debug)]
pub struct StrategyEvaluator {
    config: StrategyConfig,
    exit_price: Option<Decimal>,
    /// Sticky flag: set once price crosses target1 favorably.
    tp1_hit: bool,
    /// Running peak (Long) / trough (Short) since the target-hit tick.
    extreme: Option<Decimal>,
    /// Last `period` prices for moving-average strategies.
    window: VecDeque<Decimal>,
    prev_ema: Option<Decimal>,
    /// Ratchet levels; unused by the other strategies.
    current_stop: Decimal,
    current_target: Decimal,
    increment: Decimal,
}

impl StrategyEvaluator {
    pub fn new(config: StrategyConfig, terms: &SignalTerms) -> Self {
        let window_capacity = match &config {
            StrategyConfig::MovingAverageCross { period, .. } => *period,
            _ => 0,
        };

        Self {
            config,
            exit_price: None,
            tp1_hit: false,
            extreme: None,
            window: VecDeque::with_capacity(window_capacity),
            prev_ema: None,
            current_stop: terms.stop_loss,
            current_target: terms.target1,
            increment: terms.target1 - terms.entry_price,
        }
    }

    pub fn name(&self) -> String {
        self.config.name()
    }

    pub fn exit_price(&self) -> Option<Decimal> {
        self.exit_price
    }

    pub fn has_exited(&self) -> bool {
        self.exit_price.is_some()
    }

    /// Consume the next price point. No-op once an exit has been set.
    pub fn on_price(&mut self, terms: &SignalTerms, point: &PricePoint) {
        if self.exit_price.is_some() {
            return;
        }

        // Time-based exit dominates every other rule.
        if let Some(deadline) = terms.max_exit_time {
            if point.timestamp >= deadline {
                self.exit_price = Some(point.price);
                return;
            }
        }

        if matches!(self.config, StrategyConfig::DynamicTargetRatchet) {
            self.on_price_ratchet(terms, point.price);
            return;
        }

        let price = point.price;

        // Stop-loss wins over target/trailing logic on the same tick.
        if terms.direction.crossed_unfavorably(price, terms.stop_loss) {
            self.exit_price = Some(terms.stop_loss);
            return;
        }

        if let StrategyConfig::MovingAverageCross { kind, period } = self.config {
            self.push_window(price, kind, period);
        }

        if !self.tp1_hit && terms.direction.crossed_favorably(price, terms.target1) {
            self.tp1_hit = true;
        }

        if !self.tp1_hit {
            return;
        }

        self.extreme = Some(match (self.extreme, terms.direction) {
            (None, _) => price,
            (Some(extreme), Direction::Long) => extreme.max(price),
            (Some(extreme), Direction::Short) => extreme.min(price),
        });

        match self.config {
            StrategyConfig::TrailingStop { trail_pct } => {
                self.check_trailing_exit(terms.direction, price, trail_pct);
            }
            StrategyConfig::MovingAverageCross { kind, .. } => {
                self.check_ma_exit(terms, price, kind);
            }
            StrategyConfig::DynamicTargetRatchet => unreachable!("handled above"),
        }
    }

    fn check_trailing_exit(&mut self, direction: Direction, price: Decimal, trail_pct: Decimal) {
        let extreme = match self.extreme {
            Some(extreme) => extreme,
            None => return,
        };

        let triggered = match direction {
            Direction::Long => price <= extreme * (Decimal::ONE - trail_pct),
            Direction::Short => price >= extreme * (Decimal::ONE + trail_pct),
        };

        if triggered {
            self.exit_price = Some(price);
        }
    }

    fn check_ma_exit(&mut self, terms: &SignalTerms, price: Decimal, kind: MaKind) {
        let average = match kind {
            MaKind::Sma => self.window_mean(),
            // EMA seeds from the first full window; until the window has
            // ever filled, the entry price stands in.
            MaKind::Ema => self.prev_ema.unwrap_or(terms.entry_price),
        };

        let triggered = match terms.direction {
            Direction::Long => price < average,
            Direction::Short => price > average,
        };

        if triggered {
            self.exit_price = Some(price);
        }
    }

    /// Ratchet semantics: active from the first tick, no tp1 gate, and
    /// the ratcheted stop replaces the static stop-loss check.
    fn on_price_ratchet(&mut self, terms: &SignalTerms, price: Decimal) {
        if terms.direction.crossed_unfavorably(price, self.current_stop) {
            self.exit_price = Some(self.current_stop);
            return;
        }

        // target1 == entry gives a zero increment; nothing to ratchet.
        if self.increment.is_zero() {
            return;
        }

        // One tick can jump several levels.
        while terms.direction.crossed_favorably(price, self.current_target) {
            self.current_stop = self.current_target;
            self.current_target += self.increment;
        }
    }

    /// The window holds the most recent prices, at most `period` of them,
    /// and fills on every tick so a cross can fire as soon as the target
    /// flag arms.
    fn push_window(&mut self, price: Decimal, kind: MaKind, period: usize) {
        self.window.push_back(price);
        if self.window.len() > period {
            self.window.pop_front();
        }

        if kind == MaKind::Ema {
            match self.prev_ema {
                Some(prev) => {
                    let alpha = Decimal::TWO / (Decimal::from(period as u64) + Decimal::ONE);
                    self.prev_ema = Some(prev + alpha * (price - prev));
                }
                None if self.window.len() == period => {
                    self.prev_ema = Some(self.window_mean());
                }
                None => {}
            }
        }
    }

    fn window_mean(&self) -> Decimal {
        let len = self.window.len();
        if len == 0 {
            return Decimal::ZERO;
        }
        self.window.iter().sum::<Decimal>() / Decimal::from(len as u64)
    }
}
