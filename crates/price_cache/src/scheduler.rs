//! Midnight refresh.
//!
//! The price API publishes a new day's list around local midnight, so the
//! refresh fires a little after the boundary rather than exactly on it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, LocalResult, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::cache::PriceCache;

/// How long after local midnight the refresh fires.
pub const REFRESH_OFFSET: Duration = Duration::from_secs(1);

/// Local midnight of the day after `now` (in `locale`) plus [`REFRESH_OFFSET`].
pub fn next_refresh_at(now: DateTime<Utc>, locale: Tz) -> DateTime<Utc> {
    let tomorrow = now
        .with_timezone(&locale)
        .date_naive()
        .succ_opt()
        .unwrap_or(chrono::NaiveDate::MAX);
    let midnight = tomorrow.and_time(NaiveTime::default());

    let start_of_day = match locale.from_local_datetime(&midnight) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Midnight falls in a DST gap; take the first hour that exists.
        LocalResult::None => (1..=3)
            .filter_map(|h| {
                locale
                    .from_local_datetime(&tomorrow.and_hms_opt(h, 0, 0)?)
                    .earliest()
            })
            .next()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    };

    start_of_day + chrono::Duration::milliseconds(REFRESH_OFFSET.as_millis() as i64)
}

/// Reload the cache once per day, just after local midnight. Runs forever.
///
/// A failed refresh is logged and the loop waits for the following midnight;
/// the previously loaded table keeps serving until then.
pub async fn run_midnight_refresh(cache: Arc<PriceCache>) {
    loop {
        let now = cache.clock().now();
        let wake_at = next_refresh_at(now, cache.locale());
        let wait = (wake_at - now).to_std().unwrap_or(Duration::ZERO);
        info!(
            "Next price refresh at {} (in {:?})",
            wake_at.with_timezone(&cache.locale()),
            wait
        );

        sleep(wait).await;

        info!("Fetching new prices");
        if let Err(e) = cache.load_prices().await {
            warn!("Midnight price refresh failed, keeping previous table: {}", e);
        }
    }
}
