//! Wall-clock access and the shared calendar-day key.
//!
//! Every "today" query (today's tasks, today's sessions, the daily reset)
//! goes through [`day_key`], which compares dates at the local midnight
//! boundary.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use std::cell::Cell;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Local calendar day of [`Clock::now`].
    fn today(&self) -> NaiveDate {
        day_key(self.now())
    }
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and simulations.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// A clock pinned to local noon of today, so small advances never cross midnight.
    pub fn at_local_noon() -> Self {
        let noon = Local::now()
            .date_naive()
            .and_hms_opt(12, 0, 0)
            .and_then(|naive| naive.and_local_timezone(Local).earliest())
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        Self::new(noon)
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Local calendar date of a timestamp.
pub fn day_key(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// Whether two timestamps fall on the same local calendar day.
pub fn same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    day_key(a) == day_key(b)
}

/// `YYYY-MM-DD` form of a day key, as written to storage.
pub fn format_day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Parse a stored day key; `None` for anything unrecognised.
pub fn parse_day_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
