//! Periodic push of the current price to the metric sink.

use std::sync::Arc;
use std::time::Duration;

use common::config::PUSH_DEADLINE_MARGIN;
use common::{Error, MetricSink, Point, Result};
use tokio::time::{interval_at, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::cache::PriceCache;

/// Time one push may take: the tick interval minus a safety margin.
pub fn push_deadline(tick: Duration) -> Duration {
    tick.saturating_sub(PUSH_DEADLINE_MARGIN)
}

/// Push the current price once.
///
/// The sink is not contacted when there is no current price. The write is
/// abandoned once `deadline` has passed since the call started.
pub async fn push_current_price(
    cache: &PriceCache,
    sink: &dyn MetricSink,
    deadline: Duration,
) -> Result<Point> {
    let expires_at = Instant::now() + deadline;
    let initiated_at = cache.clock().now();

    let price = cache.current_price().await?;
    let point = Point::new("price")
        .tag("currency", "SEK")
        .field("price", price)
        .at(initiated_at);

    match timeout_at(expires_at, sink.write_point(&point)).await {
        Ok(Ok(())) => {
            debug!("Pushed price {:.5} SEK", price);
            Ok(point)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(Error::Sink(format!(
            "write did not finish within {:?}",
            deadline
        ))),
    }
}

/// Push the current price every `tick`, forever.
///
/// Each push runs as its own detached task so a slow sink never delays the
/// next tick. Pushes are not coalesced: with a sink slower than `tick`,
/// several may be in flight at once.
pub async fn run_push_loop(cache: Arc<PriceCache>, sink: Arc<dyn MetricSink>, tick: Duration) {
    let deadline = push_deadline(tick);
    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let cache = cache.clone();
        let sink = sink.clone();
        tokio::spawn(async move {
            match push_current_price(&cache, sink.as_ref(), deadline).await {
                Ok(_) => {}
                Err(Error::NoCurrentPrice) => {
                    warn!("Skipping push: {}", Error::NoCurrentPrice);
                }
                Err(e) => warn!("Price push failed: {}", e),
            }
        });
    }
}
