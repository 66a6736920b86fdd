//! The shared price cache.
//!
//! One `Arc<IntervalTable>` snapshot behind one mutex. Readers hold the lock
//! only for the scan; a reload fetches and parses outside the lock and then
//! swaps the snapshot reference, so a reader sees either the old table or the
//! new one, never a mix.

use std::sync::Arc;

use chrono_tz::Tz;
use common::{Error, PriceInterval, PriceSource, Region, Result, PRICE_LOCALE};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::table::IntervalTable;

pub struct PriceCache {
    table: Mutex<Arc<IntervalTable>>,
    source: Arc<dyn PriceSource>,
    clock: Arc<dyn Clock>,
    locale: Tz,
    region: Region,
}

impl PriceCache {
    /// An empty cache. Call [`PriceCache::load_prices`] before serving reads.
    pub fn new(source: Arc<dyn PriceSource>, clock: Arc<dyn Clock>, region: Region) -> Self {
        Self {
            table: Mutex::new(Arc::new(IntervalTable::default())),
            source,
            clock,
            locale: PRICE_LOCALE,
            region,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn locale(&self) -> Tz {
        self.locale
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// SEK price of the interval covering "now".
    pub async fn current_price(&self) -> Result<f64> {
        self.current_interval().await.map(|i| i.price_sek)
    }

    /// The interval covering "now", or `NoCurrentPrice` if the loaded
    /// table is empty or does not cover this instant.
    pub async fn current_interval(&self) -> Result<PriceInterval> {
        let table = self.table.lock().await;
        let now = self.clock.now();
        table.lookup(now).cloned().ok_or(Error::NoCurrentPrice)
    }

    /// The table currently served.
    pub async fn snapshot(&self) -> Arc<IntervalTable> {
        self.table.lock().await.clone()
    }

    /// Fetch today's prices (today in the price locale) and replace the
    /// cached table. On any error the cached table is left as it was.
    pub async fn load_prices(&self) -> Result<usize> {
        let today = self.clock.now().with_timezone(&self.locale).date_naive();
        debug!("Fetching {} prices for {}", self.region, today);

        let body = self.source.fetch_day(today, self.region).await?;
        let table = Arc::new(IntervalTable::from_json(&body)?);
        let count = table.len();

        *self.table.lock().await = table;

        info!("Loaded {} {} price intervals for {}", count, self.region, today);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testutil::{date, day1, day2, stockholm, FakeSource};

    fn cache_at(source: Arc<FakeSource>, clock: Arc<ManualClock>) -> PriceCache {
        PriceCache::new(source, clock, Region::SE3)
    }

    #[tokio::test]
    async fn test_empty_cache_has_no_current_price() {
        let clock = Arc::new(ManualClock::new(stockholm(2025, 2, 2, 12, 0, 0)));
        let cache = cache_at(Arc::new(FakeSource::new()), clock);

        assert!(matches!(
            cache.current_price().await,
            Err(Error::NoCurrentPrice)
        ));
    }

    #[tokio::test]
    async fn test_load_requests_today_in_locale() {
        // 23:30 UTC on Feb 2 is already Feb 3 in Stockholm.
        let clock = Arc::new(ManualClock::new(stockholm(2025, 2, 3, 0, 30, 0)));
        let source = Arc::new(FakeSource::new().with_day(date(2025, 2, 3), day2()));
        let cache = cache_at(source.clone(), clock);

        let count = cache.load_prices().await.expect("load should succeed");

        assert_eq!(count, 24);
        assert_eq!(source.requests(), vec![(date(2025, 2, 3), Region::SE3)]);
    }

    #[tokio::test]
    async fn test_current_price_follows_clock() {
        let clock = Arc::new(ManualClock::new(stockholm(2025, 2, 2, 8, 15, 0)));
        let source = Arc::new(FakeSource::new().with_day(date(2025, 2, 2), day1()));
        let cache = cache_at(source, clock.clone());
        cache.load_prices().await.expect("load should succeed");

        let price = cache.current_price().await.expect("08:15 is covered");
        assert!((price - 0.81629).abs() < 1e-9);

        clock.set(stockholm(2025, 2, 2, 19, 0, 0));
        let price = cache.current_price().await.expect("19:00 is covered");
        assert!((price - 1.14251).abs() < 1e-9);

        clock.set(stockholm(2025, 2, 3, 0, 0, 0));
        assert!(matches!(
            cache.current_price().await,
            Err(Error::NoCurrentPrice)
        ));
    }

    #[tokio::test]
    async fn test_garbage_body_is_parse_error_and_leaves_cache_empty() {
        let clock = Arc::new(ManualClock::new(stockholm(2025, 2, 2, 12, 0, 0)));
        let source = Arc::new(FakeSource::new().with_day(date(2025, 2, 2), "\"blah\""));
        let cache = cache_at(source, clock);

        assert!(matches!(cache.load_prices().await, Err(Error::Parse(_))));
        assert!(cache.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_table() {
        let clock = Arc::new(ManualClock::new(stockholm(2025, 2, 2, 12, 0, 0)));
        let source = Arc::new(FakeSource::new().with_day(date(2025, 2, 2), day1()));
        let cache = cache_at(source.clone(), clock);
        cache.load_prices().await.expect("first load should succeed");
        let before = cache.snapshot().await;

        source.fail_next(Error::Fetch("connection refused".into()));
        assert!(matches!(cache.load_prices().await, Err(Error::Fetch(_))));
        assert_eq!(*cache.snapshot().await, *before);

        source.serve(date(2025, 2, 2), "{\"not\": \"a list\"}");
        assert!(matches!(cache.load_prices().await, Err(Error::Parse(_))));
        assert_eq!(*cache.snapshot().await, *before);

        let price = cache.current_price().await.expect("old table still serves");
        assert!((price - 0.74902).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_reload_with_same_response_is_idempotent() {
        let clock = Arc::new(ManualClock::new(stockholm(2025, 2, 2, 12, 0, 0)));
        let source = Arc::new(FakeSource::new().with_day(date(2025, 2, 2), day1()));
        let cache = cache_at(source, clock);

        cache.load_prices().await.expect("first load");
        let first = cache.snapshot().await;
        cache.load_prices().await.expect("second load");
        let second = cache.snapshot().await;

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(format!("{:?}", first), format!("{:?}", second));
    }

    #[tokio::test]
    async fn test_midnight_swap_serves_new_day_at_boundary() {
        let clock = Arc::new(ManualClock::new(stockholm(2025, 2, 2, 23, 59, 59)));
        let source = Arc::new(
            FakeSource::new()
                .with_day(date(2025, 2, 2), day1())
                .with_day(date(2025, 2, 3), day2()),
        );
        let cache = cache_at(source, clock.clone());
        cache.load_prices().await.expect("day 1 load");

        let price = cache.current_price().await.expect("23:59:59 is covered");
        assert!((price - 0.4634).abs() < 1e-9);

        clock.set(stockholm(2025, 2, 3, 0, 0, 1));
        cache.load_prices().await.expect("day 2 load");

        clock.set(stockholm(2025, 2, 3, 0, 0, 0));
        let price = cache.current_price().await.expect("midnight is covered");
        assert!((price - 0.48455).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_never_see_mixed_table() {
        // Two versions of the same day that differ in every price.
        let doubled: Vec<PriceInterval> = IntervalTable::from_json(day1())
            .expect("day 1 should parse")
            .intervals()
            .iter()
            .map(|i| PriceInterval {
                price_sek: i.price_sek * 2.0,
                ..i.clone()
            })
            .collect();
        let doubled_body = serde_json::to_string(&doubled).expect("serialize");
        let original = IntervalTable::from_json(day1()).expect("day 1 should parse");
        let modified = IntervalTable::new(doubled).expect("valid table");

        let clock = Arc::new(ManualClock::new(stockholm(2025, 2, 2, 12, 0, 0)));
        let source = Arc::new(FakeSource::new().with_day(date(2025, 2, 2), day1()));
        let cache = Arc::new(cache_at(source.clone(), clock));
        cache.load_prices().await.expect("initial load");

        let mut readers = Vec::new();
        for _ in 0..4 {
            let cache = cache.clone();
            let original = original.clone();
            let modified = modified.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..500 {
                    let seen = cache.snapshot().await;
                    assert!(*seen == original || *seen == modified, "mixed table");
                    cache.current_price().await.expect("noon is always covered");
                    tokio::task::yield_now().await;
                }
            }));
        }

        for round in 0..100 {
            let body = if round % 2 == 0 { doubled_body.as_str() } else { day1() };
            source.serve(date(2025, 2, 2), body);
            cache.load_prices().await.expect("reload");
            tokio::task::yield_now().await;
        }

        for reader in readers {
            reader.await.expect("reader panicked");
        }
    }
}
