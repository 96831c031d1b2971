//! Aggregate analytics over resolved signals.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Impact-factor policy version in effect. Bump when the formula changes
/// so persisted factors remain comparable within a version.
pub const IMPACT_FACTOR_VERSION: u16 = 1;

/// Normalize an influencer's total realized P&L into an impact factor.
///
/// V1: average P&L per signal, damped by ln(count + 1) so that a handful
/// of lucky calls does not outrank a long consistent record.
pub fn impact_factor(total_pnl_pct: Decimal, signal_count: u32) -> Decimal {
    if signal_count == 0 {
        return Decimal::ZERO;
    }

    let avg = total_pnl_pct / Decimal::from(signal_count);
    let damping = ((signal_count + 1) as f64).ln();
    let damping = Decimal::from_f64(damping).unwrap_or(Decimal::ONE);
    if damping.is_zero() {
        return Decimal::ZERO;
    }

    (avg / damping).round_dp(4)
}
