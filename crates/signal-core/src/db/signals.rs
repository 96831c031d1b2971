//! Database operations for signals and backtest results.

use crate::types::{BacktestResult, Direction, Signal, SignalState};
use crate::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Repository for signal and result data.
pub struct SignalRepository {
    pool: PgPool,
}

impl SignalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new signal in pending state.
    pub async fn insert(&self, signal: &Signal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signals (
                id, instrument_id, direction, entry_price, target1, stop_loss,
                entry_time, max_exit_time, state, author, source_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(signal.id)
        .bind(&signal.instrument_id)
        .bind(signal.direction.as_str())
        .bind(signal.entry_price)
        .bind(signal.target1)
        .bind(signal.stop_loss)
        .bind(signal.entry_time)
        .bind(signal.max_exit_time)
        .bind(signal.state.as_str())
        .bind(&signal.author)
        .bind(&signal.source_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch up to `limit` pending signals, oldest first.
    pub async fn fetch_pending(&self, limit: i64) -> Result<Vec<Signal>> {
        let rows = sqlx::query(
            r#"
            SELECT id, instrument_id, direction, entry_price, target1, stop_loss,
                   entry_time, max_exit_time, state, author, source_url
            FROM signals
            WHERE state = 'pending'
            ORDER BY entry_time ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        // A malformed row skips that signal, never the batch.
        let mut signals = Vec::with_capacity(rows.len());
        for row in rows {
            match Self::row_to_signal(&row) {
                Ok(signal) => signals.push(signal),
                Err(error) => {
                    tracing::warn!(error = %error, "skipping malformed signal row");
                }
            }
        }
        Ok(signals)
    }

    /// Mark a signal processed. Guarded on the pending state so repeated
    /// calls are no-ops; returns whether this call performed the
    /// transition.
    pub async fn mark_processed(&self, signal_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE signals
            SET state = 'processed', processed_at = $2
            WHERE id = $1 AND state = 'pending'
            "#,
        )
        .bind(signal_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a backtest result. At most one row per signal; returns
    /// whether the row was freshly written (false when a previous run
    /// already recorded it).
    pub async fn insert_result(&self, result: &BacktestResult) -> Result<bool> {
        let outcomes = serde_json::to_value(&result.outcomes)?;

        let done = sqlx::query(
            r#"
            INSERT INTO backtest_results (
                signal_id, outcomes, best_strategy, best_exit_price,
                best_pnl_pct, annotation, computed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (signal_id) DO NOTHING
            "#,
        )
        .bind(result.signal_id)
        .bind(outcomes)
        .bind(&result.best_strategy)
        .bind(result.best_exit_price)
        .bind(result.best_pnl_pct)
        .bind(&result.annotation)
        .bind(result.computed_at)
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected() > 0)
    }

    /// Sum of best P&L and resolved-signal count for one author, used for
    /// impact-factor reporting.
    pub async fn author_totals(&self, author: &str) -> Result<(Decimal, u32)> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(r.best_pnl_pct), 0) AS total_pnl,
                   COUNT(r.signal_id) AS signal_count
            FROM backtest_results r
            JOIN signals s ON s.id = r.signal_id
            WHERE s.author = $1
            "#,
        )
        .bind(author)
        .fetch_one(&self.pool)
        .await?;

        let total: Decimal = row.try_get("total_pnl")?;
        let count: i64 = row.try_get("signal_count")?;
        Ok((total, count as u32))
    }

    fn row_to_signal(row: &sqlx::postgres::PgRow) -> Result<Signal> {
        let direction: String = row.try_get("direction")?;
        let state: String = row.try_get("state")?;
        let max_exit_time: Option<DateTime<Utc>> = row.try_get("max_exit_time")?;

        Ok(Signal {
            id: row.try_get("id")?,
            instrument_id: row.try_get("instrument_id")?,
            direction: direction.parse::<Direction>()?,
            entry_price: row.try_get("entry_price")?,
            target1: row.try_get("target1")?,
            stop_loss: row.try_get("stop_loss")?,
            entry_time: row.try_get("entry_time")?,
            max_exit_time,
            state: state.parse::<SignalState>()?,
            author: row.try_get("author")?,
            source_url: row.try_get("source_url")?,
        })
    }
}
