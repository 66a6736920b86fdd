//! Immutable table of priced intervals.

use chrono::{DateTime, Utc};
use common::{Error, PriceInterval, Result};

/// Priced intervals for the loaded day(s), in the order the source
/// delivered them. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalTable {
    intervals: Vec<PriceInterval>,
}

impl IntervalTable {
    pub fn new(intervals: Vec<PriceInterval>) -> Result<Self> {
        if let Some(bad) = intervals.iter().find(|i| i.start >= i.end) {
            return Err(Error::Parse(format!(
                "interval starting {} does not end after it starts ({})",
                bad.start, bad.end
            )));
        }
        Ok(Self { intervals })
    }

    /// Parse a price list body (a JSON array of intervals).
    pub fn from_json(body: &str) -> Result<Self> {
        let intervals: Vec<PriceInterval> = serde_json::from_str(body)?;
        Self::new(intervals)
    }

    /// The interval whose `[start, end)` contains `t`.
    ///
    /// Linear scan; a day holds ~24 entries.
    pub fn lookup(&self, t: DateTime<Utc>) -> Option<&PriceInterval> {
        self.intervals.iter().find(|i| i.contains(t))
    }

    pub fn intervals(&self) -> &[PriceInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Start of the first and end of the last interval, if any.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.intervals.first()?;
        let last = self.intervals.last()?;
        Some((first.start.with_timezone(&Utc), last.end.with_timezone(&Utc)))
    }
}
