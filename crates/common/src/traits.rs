//! Collaborator seams: where prices come from and where metrics go.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::Region;
use crate::types::Point;
use crate::Result;

/// Upstream source of day-ahead price lists.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the raw price list body for `date` in `region`.
    ///
    /// Transport-level failures are reported as `Error::Fetch`. The body is
    /// returned untouched; parsing belongs to the caller.
    async fn fetch_day(&self, date: NaiveDate, region: Region) -> Result<String>;
}

/// Destination for timestamped measurements.
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn write_point(&self, point: &Point) -> Result<()>;
}
