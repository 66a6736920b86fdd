//! Shared types, config, and error definitions for the price pusher.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{PusherConfig, Region, PRICE_LOCALE};
pub use error::Error;
pub use traits::{MetricSink, PriceSource};
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
