//! Trading signals extracted from influencer posts, and the price points
//! they are simulated against.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Direction of a signal: Long profits when price rises, Short ("put
/// options") profits when price falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// True when `price` has crossed `level` in the profitable direction.
    pub fn crossed_favorably(self, price: Decimal, level: Decimal) -> bool {
        match self {
            Direction::Long => price >= level,
            Direction::Short => price <= level,
        }
    }

    /// True when `price` has crossed `level` in the losing direction.
    pub fn crossed_unfavorably(self, price: Decimal, level: Decimal) -> bool {
        match self {
            Direction::Long => price <= level,
            Direction::Short => price >= level,
        }
    }

    /// Realized P&L percentage for an entry/exit pair under this
    /// direction's sign convention.
    pub fn pnl_pct(self, entry: Decimal, exit: Decimal) -> Decimal {
        let hundred = Decimal::new(100, 0);
        match self {
            Direction::Long => (exit - entry) / entry * hundred,
            Direction::Short => (entry - exit) / entry * hundred,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            other => Err(Error::Parse(format!("unknown direction: {other}"))),
        }
    }
}

/// Lifecycle state of a signal. Processed is set exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalState {
    Pending,
    Processed,
}

impl SignalState {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalState::Pending => "pending",
            SignalState::Processed => "processed",
        }
    }
}

impl std::str::FromStr for SignalState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SignalState::Pending),
            "processed" => Ok(SignalState::Processed),
            other => Err(Error::Parse(format!("unknown signal state: {other}"))),
        }
    }
}

/// A tradable event extracted from an influencer post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Signal identifier.
    pub id: Uuid,
    /// Identifier of the priced asset (e.g. "bitcoin").
    pub instrument_id: String,
    /// Long or Short payoff convention.
    pub direction: Direction,
    /// Reference price at signal creation.
    pub entry_price: Decimal,
    /// First take-profit threshold; crossing it arms trailing/MA exits.
    pub target1: Decimal,
    /// Protective stop level.
    pub stop_loss: Decimal,
    /// Start of the simulation window.
    pub entry_time: DateTime<Utc>,
    /// Hard deadline for the simulation; None means no limit.
    pub max_exit_time: Option<DateTime<Utc>>,
    /// Lifecycle state.
    pub state: SignalState,
    /// Influencer handle the signal was extracted from.
    pub author: String,
    /// Link to the source post, when known.
    pub source_url: Option<String>,
}

impl Signal {
    /// Check the entry/target/stop ordering invariant for this signal's
    /// direction. Signals failing validation are skipped, not simulated.
    pub fn validate(&self) -> Result<()> {
        let reject = |reason: &str| {
            Err(Error::Validation {
                signal_id: self.id,
                reason: reason.to_string(),
            })
        };

        if self.entry_price <= Decimal::ZERO
            || self.target1 <= Decimal::ZERO
            || self.stop_loss <= Decimal::ZERO
        {
            return reject("entry, target and stop must be positive");
        }

        match self.direction {
            Direction::Long => {
                if self.entry_price > self.target1 {
                    return reject("long entry above target1");
                }
                if self.stop_loss > self.entry_price {
                    return reject("long stop-loss above entry");
                }
            }
            Direction::Short => {
                if self.entry_price < self.target1 {
                    return reject("short entry below target1");
                }
                if self.stop_loss < self.entry_price {
                    return reject("short stop-loss below entry");
                }
            }
        }

        Ok(())
    }
}

/// Untyped signal fields as they arrive from the extraction pipeline.
/// Numbers and dates are still strings here; `parse` turns a draft into
/// a validated-shape `Signal` or a per-signal parse error (the batch
/// never crashes on one bad draft).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalDraft {
    pub instrument_id: String,
    pub direction: String,
    pub entry_price: String,
    pub target1: String,
    pub stop_loss: String,
    /// RFC 3339 timestamp.
    pub entry_time: String,
    /// RFC 3339 timestamp; empty or absent means no limit.
    pub max_exit_time: Option<String>,
    pub author: String,
    pub source_url: Option<String>,
}

impl SignalDraft {
    pub fn parse(self) -> Result<Signal> {
        let price = |field: &str, raw: &str| -> Result<Decimal> {
            raw.trim()
                .parse::<Decimal>()
                .map_err(|_| Error::Parse(format!("invalid {field}: {raw}")))
        };
        let instant = |field: &str, raw: &str| -> Result<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(raw.trim())
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| Error::Parse(format!("invalid {field}: {raw}")))
        };

        let max_exit_time = match self.max_exit_time.as_deref() {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(instant("max_exit_time", raw)?),
        };

        Ok(Signal {
            id: Uuid::new_v4(),
            instrument_id: self.instrument_id,
            direction: self.direction.parse()?,
            entry_price: price("entry_price", &self.entry_price)?,
            target1: price("target1", &self.target1)?,
            stop_loss: price("stop_loss", &self.stop_loss)?,
            entry_time: instant("entry_time", &self.entry_time)?,
            max_exit_time,
            state: SignalState::Pending,
            author: self.author,
            source_url: self.source_url,
        })
    }
}

/// A single (timestamp, price) observation. Series are sorted and
/// deduplicated by the provider; the core never re-sorts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self { timestamp, price }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signal(direction: Direction, entry: i64, target: i64, stop: i64) -> Signal {
        Signal {
            id: Uuid::new_v4(),
            instrument_id: "bitcoin".to_string(),
            direction,
            entry_price: Decimal::new(entry, 0),
            target1: Decimal::new(target, 0),
            stop_loss: Decimal::new(stop, 0),
            entry_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            max_exit_time: None,
            state: SignalState::Pending,
            author: "trader_joe".to_string(),
            source_url: None,
        }
    }

    #[test]
    fn long_ordering_accepted() {
        assert!(signal(Direction::Long, 100, 110, 95).validate().is_ok());
    }

    #[test]
    fn long_entry_above_target_rejected() {
        assert!(signal(Direction::Long, 120, 110, 95).validate().is_err());
    }

    #[test]
    fn long_stop_above_entry_rejected() {
        assert!(signal(Direction::Long, 100, 110, 105).validate().is_err());
    }

    #[test]
    fn short_ordering_accepted() {
        assert!(signal(Direction::Short, 100, 90, 105).validate().is_ok());
    }

    #[test]
    fn short_entry_below_target_rejected() {
        assert!(signal(Direction::Short, 85, 90, 105).validate().is_err());
    }

    #[test]
    fn non_positive_levels_rejected() {
        assert!(signal(Direction::Long, 100, 110, 0).validate().is_err());
    }

    fn draft() -> SignalDraft {
        SignalDraft {
            instrument_id: "bitcoin".to_string(),
            direction: "long".to_string(),
            entry_price: "100.5".to_string(),
            target1: "110".to_string(),
            stop_loss: "95".to_string(),
            entry_time: "2024-01-01T00:00:00Z".to_string(),
            max_exit_time: None,
            author: "trader_joe".to_string(),
            source_url: None,
        }
    }

    #[test]
    fn draft_parses_into_pending_signal() {
        let signal = draft().parse().unwrap();
        assert_eq!(signal.state, SignalState::Pending);
        assert_eq!(signal.entry_price, Decimal::new(1005, 1));
        assert!(signal.max_exit_time.is_none());
    }

    #[test]
    fn draft_with_bad_date_is_a_parse_error() {
        let mut bad = draft();
        bad.entry_time = "not-a-date".to_string();
        assert!(matches!(bad.parse(), Err(Error::Parse(_))));
    }

    #[test]
    fn draft_with_bad_number_is_a_parse_error() {
        let mut bad = draft();
        bad.target1 = "eleventy".to_string();
        assert!(matches!(bad.parse(), Err(Error::Parse(_))));
    }

    #[test]
    fn empty_max_exit_means_no_limit() {
        let mut d = draft();
        d.max_exit_time = Some("  ".to_string());
        assert!(d.parse().unwrap().max_exit_time.is_none());
    }

    #[test]
    fn pnl_sign_convention() {
        let entry = Decimal::new(100, 0);
        let exit = Decimal::new(108, 0);
        assert_eq!(Direction::Long.pnl_pct(entry, exit), Decimal::new(8, 0));
        assert_eq!(Direction::Short.pnl_pct(entry, exit), Decimal::new(-8, 0));
    }
}
