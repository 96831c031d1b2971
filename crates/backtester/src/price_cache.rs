//! Per-batch memoization of price series.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use signal_core::types::PricePoint;
use signal_core::Result;

use crate::provider::PriceSeriesProvider;

struct CacheEntry {
    /// Window start the cached series was fetched with.
    since: DateTime<Utc>,
    series: Arc<Vec<PricePoint>>,
}

/// Read-through cache keyed by instrument id. Several signals for the
/// same instrument in one batch share a single provider fetch. Lifetime
/// is one batch run; the orchestrator clears it at batch start.
#[derive(Default)]
pub struct PriceCache {
    inner: DashMap<String, CacheEntry>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Return the cached series for `instrument_id`, fetching it on a
    /// miss. Each entry remembers the window start it was fetched with;
    /// a request for an earlier window refetches and widens the entry,
    /// so a signal with an earlier entry time never simulates against a
    /// truncated series. Callers re-filter per signal.
    pub async fn get_or_fetch(
        &self,
        provider: &dyn PriceSeriesProvider,
        instrument_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Arc<Vec<PricePoint>>> {
        if let Some(entry) = self.inner.get(instrument_id) {
            if entry.since <= since {
                debug!(instrument = instrument_id, "price cache hit");
                return Ok(entry.series.clone());
            }
            debug!(
                instrument = instrument_id,
                "cached window starts too late, refetching"
            );
        }

        let series = Arc::new(provider.fetch(instrument_id, since).await?);
        debug!(
            instrument = instrument_id,
            points = series.len(),
            "price series fetched"
        );
        self.inner.insert(
            instrument_id.to_string(),
            CacheEntry {
                since,
                series: series.clone(),
            },
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockPriceSeriesProvider;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn second_lookup_hits_cache() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut provider = MockPriceSeriesProvider::new();
        provider
            .expect_fetch()
            .times(1)
            .returning(move |_, _| Ok(vec![PricePoint::new(since, Decimal::new(100, 0))]));

        let cache = PriceCache::new();
        let first = cache.get_or_fetch(&provider, "bitcoin", since).await.unwrap();
        let second = cache.get_or_fetch(&provider, "bitcoin", since).await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn clear_forces_refetch() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut provider = MockPriceSeriesProvider::new();
        provider
            .expect_fetch()
            .times(2)
            .returning(move |_, _| Ok(vec![PricePoint::new(since, Decimal::new(100, 0))]));

        let cache = PriceCache::new();
        cache.get_or_fetch(&provider, "bitcoin", since).await.unwrap();
        cache.clear();
        cache.get_or_fetch(&provider, "bitcoin", since).await.unwrap();
    }

    #[tokio::test]
    async fn earlier_window_request_widens_the_entry() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = t0 + Duration::minutes(2);

        // The provider honors `since`, like the real HTTP implementation.
        let mut provider = MockPriceSeriesProvider::new();
        provider.expect_fetch().times(2).returning(move |_, since| {
            let full = vec![
                PricePoint::new(t0, Decimal::new(100, 0)),
                PricePoint::new(t0 + Duration::minutes(1), Decimal::new(94, 0)),
                PricePoint::new(t2, Decimal::new(100, 0)),
            ];
            Ok(full.into_iter().filter(|p| p.timestamp >= since).collect())
        });

        let cache = PriceCache::new();

        let truncated = cache.get_or_fetch(&provider, "bitcoin", t2).await.unwrap();
        assert_eq!(truncated.len(), 1);

        // An earlier window must not be served from the later one.
        let full = cache.get_or_fetch(&provider, "bitcoin", t0).await.unwrap();
        assert_eq!(full.len(), 3);

        // The widened entry now serves later windows too.
        let again = cache.get_or_fetch(&provider, "bitcoin", t2).await.unwrap();
        assert!(Arc::ptr_eq(&full, &again));
    }
}
