//! Price cache crate.
//!
//! Keeps the day's price intervals in memory, refreshes them just after
//! local midnight, and pushes the current price to a metric sink.

pub mod cache;
pub mod clock;
pub mod push;
pub mod scheduler;
pub mod table;

#[cfg(test)]
mod testutil;

pub use cache::PriceCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use push::{push_current_price, push_deadline, run_push_loop};
pub use scheduler::{next_refresh_at, run_midnight_refresh, REFRESH_OFFSET};
pub use table::IntervalTable;
