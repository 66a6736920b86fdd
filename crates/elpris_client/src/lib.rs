//! elprisetjustnu.se price API client.
//!
//! Fetches a day's price list from
//! `{base}/api/v1/prices/{YYYY}/{MM-DD}_{REGION}.json`. The body is handed
//! back as-is; turning it into intervals is the cache's job.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use common::{Error, PriceSource, Region, Result};
use tracing::debug;

/// Price API client with connection pooling.
#[derive(Debug, Clone)]
pub struct ElprisClient {
    client: reqwest::Client,
    base_url: String,
}

/// URL of the price list for `date` in `region`.
pub fn price_url(base_url: &str, date: NaiveDate, region: Region) -> String {
    format!(
        "{}/api/v1/prices/{}/{}_{}.json",
        base_url.trim_end_matches('/'),
        date.year(),
        date.format("%m-%d"),
        region
    )
}

impl ElprisClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("price-pusher/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(2)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build price API client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PriceSource for ElprisClient {
    async fn fetch_day(&self, date: NaiveDate, region: Region) -> Result<String> {
        let url = price_url(&self.base_url, date, region);
        debug!("Fetching price list: {}", url);

        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("error reading from {}: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!(
                "{} returned {}: {}",
                url,
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("error reading response from {}: {}", url, e)))?;

        debug!("Got {} bytes for {} {}", body.len(), region, date);
        Ok(body)
    }
}
