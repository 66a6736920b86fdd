//! Domain types shared across the pusher.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

// ── Price list ────────────────────────────────────────────────────────

/// One priced interval as published by the price API.
///
/// `{"SEK_per_kWh":0.4931,"EUR_per_kWh":0.04295,"EXR":11.480681,
///   "time_start":"2025-01-29T00:00:00+01:00","time_end":"2025-01-29T01:00:00+01:00"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceInterval {
    #[serde(rename = "SEK_per_kWh")]
    pub price_sek: f64,
    #[serde(rename = "EUR_per_kWh")]
    pub price_eur: f64,
    /// EUR → SEK exchange rate used for the conversion.
    #[serde(rename = "EXR")]
    pub exchange_rate: f64,
    #[serde(rename = "time_start")]
    pub start: DateTime<FixedOffset>,
    #[serde(rename = "time_end")]
    pub end: DateTime<FixedOffset>,
}

impl PriceInterval {
    /// Half-open containment: `start <= t < end`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

// ── Metric points ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// A single timestamped measurement bound for the metric sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub timestamp: DateTime<Utc>,
}

impl Point {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
