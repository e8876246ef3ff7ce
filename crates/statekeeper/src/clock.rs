use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::sync::RwLock;

/// Source of "now" for expiration and streak arithmetic.
///
/// All calendar math runs on the UTC date: `today()` is always the date of
/// `now()`, the same date audit timestamps are filtered by.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date used for due-date and expiration math.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests, demos and replaying a scan "as of" a date.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Clock pinned to midday UTC on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self::new(midday(date))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = now;
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.set(midday(date));
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }
}

fn midday(date: NaiveDate) -> DateTime<Utc> {
    (date.and_time(NaiveTime::MIN) + Duration::hours(12)).and_utc()
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
