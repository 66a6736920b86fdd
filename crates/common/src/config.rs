//! Pusher configuration types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Timezone used for every day-boundary and date-formatting computation,
/// independent of the host's own timezone.
pub const PRICE_LOCALE: Tz = chrono_tz::Europe::Stockholm;

/// Subtracted from the push interval to bound one push.
pub const PUSH_DEADLINE_MARGIN: Duration = Duration::from_millis(500);

/// Top-level pusher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PusherConfig {
    /// Price area to fetch.
    #[serde(default)]
    pub region: Region,

    #[serde(default)]
    pub price_api: PriceApiConfig,

    #[serde(default)]
    pub influx: InfluxConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

/// Swedish electricity price areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Region {
    /// Luleå / north.
    SE1,
    /// Sundsvall.
    SE2,
    /// Stockholm.
    #[default]
    SE3,
    /// Malmö / south.
    SE4,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::SE1, Region::SE2, Region::SE3, Region::SE4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::SE1 => "SE1",
            Region::SE2 => "SE2",
            Region::SE3 => "SE3",
            Region::SE4 => "SE4",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Region::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| {
                Error::Config(format!(
                    "invalid region {:?}, must be one of: SE1, SE2, SE3, SE4",
                    s
                ))
            })
    }
}

/// Where day-ahead prices are fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceApiConfig {
    #[serde(default = "default_price_api_base_url")]
    pub base_url: String,

    /// Per-request timeout for the price fetch.
    #[serde(default = "default_price_api_timeout")]
    pub timeout_secs: u64,
}

/// InfluxDB v2 write target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    #[serde(default = "default_influx_addr")]
    pub addr: String,
    #[serde(default = "default_influx_token")]
    pub token: String,
    #[serde(default = "default_influx_org")]
    pub org: String,
    #[serde(default = "default_influx_bucket")]
    pub bucket: String,
    /// Client-level request timeout; each push is additionally bounded by
    /// the push deadline.
    #[serde(default = "default_influx_timeout")]
    pub timeout_secs: u64,
}

/// Timing configuration (all values in seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// How often the current price is pushed.
    #[serde(default = "default_push_interval")]
    pub push_interval_secs: u64,
}

impl TimingConfig {
    pub fn push_interval(&self) -> Duration {
        Duration::from_secs(self.push_interval_secs)
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_price_api_base_url() -> String {
    "https://www.elprisetjustnu.se".into()
}
fn default_price_api_timeout() -> u64 {
    30
}
fn default_influx_addr() -> String {
    "http://localhost:8086".into()
}
fn default_influx_token() -> String {
    "my-token".into()
}
fn default_influx_org() -> String {
    "my-org".into()
}
fn default_influx_bucket() -> String {
    "my-bucket".into()
}
fn default_influx_timeout() -> u64 {
    10
}
fn default_push_interval() -> u64 {
    10
}

impl Default for PusherConfig {
    fn default() -> Self {
        Self {
            region: Region::default(),
            price_api: PriceApiConfig::default(),
            influx: InfluxConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl Default for PriceApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_price_api_base_url(),
            timeout_secs: default_price_api_timeout(),
        }
    }
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            addr: default_influx_addr(),
            token: default_influx_token(),
            org: default_influx_org(),
            bucket: default_influx_bucket(),
            timeout_secs: default_influx_timeout(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            push_interval_secs: default_push_interval(),
        }
    }
}
