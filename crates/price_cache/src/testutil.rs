//! Fakes and fixtures shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use common::{Error, MetricSink, Point, PriceSource, Region, Result, PRICE_LOCALE};

pub fn day1() -> &'static str {
    include_str!("../testdata/2025-02-02_SE3.json")
}

pub fn day2() -> &'static str {
    include_str!("../testdata/2025-02-03_SE3.json")
}

/// Wall-clock time in the price locale, as an absolute instant.
pub fn stockholm(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    PRICE_LOCALE
        .with_ymd_and_hms(y, m, d, h, mi, s)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Serves canned bodies per date and records every request.
#[derive(Default)]
pub struct FakeSource {
    bodies: Mutex<HashMap<NaiveDate, String>>,
    failures: Mutex<VecDeque<Error>>,
    requests: Mutex<Vec<(NaiveDate, Region)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(self, date: NaiveDate, body: &str) -> Self {
        self.serve(date, body);
        self
    }

    pub fn serve(&self, date: NaiveDate, body: &str) {
        self.bodies
            .lock()
            .expect("bodies lock")
            .insert(date, body.to_string());
    }

    /// Fail the next fetch with `err` before consulting the canned bodies.
    pub fn fail_next(&self, err: Error) {
        self.failures.lock().expect("failures lock").push_back(err);
    }

    pub fn requests(&self) -> Vec<(NaiveDate, Region)> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl PriceSource for FakeSource {
    async fn fetch_day(&self, date: NaiveDate, region: Region) -> Result<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .push((date, region));
        if let Some(err) = self.failures.lock().expect("failures lock").pop_front() {
            return Err(err);
        }
        self.bodies
            .lock()
            .expect("bodies lock")
            .get(&date)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("404 for {}", date)))
    }
}

/// Collects written points; can be told to stall or fail.
#[derive(Default)]
pub struct RecordingSink {
    points: Mutex<Vec<Point>>,
    stall: Option<Duration>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stalling(stall: Duration) -> Self {
        Self {
            stall: Some(stall),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn points(&self) -> Vec<Point> {
        self.points.lock().expect("points lock").clone()
    }
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn write_point(&self, point: &Point) -> Result<()> {
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        if self.fail {
            return Err(Error::Sink("503 Service Unavailable".into()));
        }
        self.points
            .lock()
            .expect("points lock")
            .push(point.clone());
        Ok(())
    }
}
