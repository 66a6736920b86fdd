//! InfluxDB v2 write client.
//!
//! Writes points through `POST /api/v2/write` in line protocol with
//! nanosecond timestamps.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use common::config::InfluxConfig;
use common::{Error, FieldValue, MetricSink, Point, Result};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct InfluxClient {
    client: reqwest::Client,
    write_url: String,
    token: String,
    org: String,
    bucket: String,
}

impl InfluxClient {
    pub fn new(cfg: &InfluxConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build InfluxDB client: {}", e)))?;

        Ok(Self {
            client,
            write_url: format!("{}/api/v2/write", cfg.addr.trim_end_matches('/')),
            token: cfg.token.clone(),
            org: cfg.org.clone(),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl MetricSink for InfluxClient {
    async fn write_point(&self, point: &Point) -> Result<()> {
        let line = to_line_protocol(point)?;
        debug!("Writing to influx: {}", line);

        let resp = self
            .client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await
            .map_err(|e| Error::Sink(format!("HTTP error: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Sink(format!(
                "InfluxDB returned {}: {}",
                status.as_u16(),
                body.chars().take(300).collect::<String>()
            )));
        }

        Ok(())
    }
}

// ── Line protocol ─────────────────────────────────────────────────────

/// Render a point as one line of InfluxDB line protocol.
pub fn to_line_protocol(point: &Point) -> Result<String> {
    if point.measurement.is_empty() {
        return Err(Error::Sink("point has no measurement name".into()));
    }
    if point.fields.is_empty() {
        return Err(Error::Sink(format!(
            "point {:?} has no fields",
            point.measurement
        )));
    }
    let ts = point.timestamp.timestamp_nanos_opt().ok_or_else(|| {
        Error::Sink(format!(
            "timestamp {} is out of range for nanosecond precision",
            point.timestamp
        ))
    })?;

    let mut line = escape(&point.measurement, &[',', ' ']);
    for (key, value) in &point.tags {
        let _ = write!(
            line,
            ",{}={}",
            escape(key, &[',', '=', ' ']),
            escape(value, &[',', '=', ' '])
        );
    }

    let mut sep = ' ';
    for (key, value) in &point.fields {
        let rendered = match value {
            FieldValue::Float(v) if !v.is_finite() => {
                return Err(Error::Sink(format!("field {:?} is not finite: {}", key, v)));
            }
            FieldValue::Float(v) => format!("{:?}", v),
            FieldValue::Integer(v) => format!("{}i", v),
            FieldValue::Boolean(v) => v.to_string(),
            FieldValue::Text(v) => format!("\"{}\"", escape(v, &['"', '\\'])),
        };
        let _ = write!(line, "{}{}={}", sep, escape(key, &[',', '=', ' ']), rendered);
        sep = ',';
    }

    let _ = write!(line, " {}", ts);
    Ok(line)
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
