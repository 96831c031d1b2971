//! Price series provider interface and HTTP implementation.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use delivery::RetryPolicy;
use signal_core::types::PricePoint;
use signal_core::{Error, Result};

/// Supplies the ordered, deduplicated price series for an instrument.
/// The core never re-sorts or re-dedupes; that is this contract's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSeriesProvider: Send + Sync {
    async fn fetch(&self, instrument_id: &str, since: DateTime<Utc>) -> Result<Vec<PricePoint>>;
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    /// Pairs of (unix milliseconds, price).
    prices: Vec<(i64, f64)>,
}

/// CoinGecko-style market-chart provider with request timeout and a
/// bounded retry budget.
pub struct HttpPriceProvider {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpPriceProvider {
    pub fn new(base_url: String, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            retry,
        })
    }

    async fn fetch_once(
        &self,
        instrument_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let url = format!(
            "{}/coins/{}/market_chart/range",
            self.base_url, instrument_id
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", "usd".to_string()),
                ("from", since.timestamp().to_string()),
                ("to", Utc::now().timestamp().to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<MarketChartResponse>()
            .await?;

        let mut points = Vec::with_capacity(response.prices.len());
        let mut last_ts: Option<i64> = None;

        for (ms, price) in response.prices {
            // Upstream occasionally repeats a sample boundary; keep the
            // first and guarantee strictly increasing timestamps.
            if last_ts == Some(ms) {
                continue;
            }
            last_ts = Some(ms);

            let timestamp = Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| Error::Parse(format!("invalid price timestamp: {ms}")))?;
            let price = Decimal::from_f64(price)
                .ok_or_else(|| Error::Parse(format!("invalid price value: {price}")))?;

            points.push(PricePoint::new(timestamp, price));
        }

        debug!(
            instrument = instrument_id,
            points = points.len(),
            "fetched price series"
        );
        Ok(points)
    }
}

#[async_trait]
impl PriceSeriesProvider for HttpPriceProvider {
    async fn fetch(&self, instrument_id: &str, since: DateTime<Utc>) -> Result<Vec<PricePoint>> {
        self.retry
            .run("fetch_price_series", || self.fetch_once(instrument_id, since))
            .await
    }
}
