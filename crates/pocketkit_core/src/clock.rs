//! Wall-clock abstraction for timestamps and calendar days.
//!
//! Services never call `Utc::now()` directly; they ask the injected clock so
//! streak and day-summary rules can be exercised with fixed instants.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day of `at` in the clock's time zone.
    fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&Local).date_naive()
    }

    /// Half-open `[start, end)` instant range covering `day`.
    fn day_bounds(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = local_midnight(day);
        let end = day
            .succ_opt()
            .map(local_midnight)
            .unwrap_or_else(|| start + Duration::days(1));
        (start, end)
    }

    fn today(&self) -> NaiveDate {
        self.day_of(self.now())
    }
}

fn local_midnight(day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_time(chrono::NaiveTime::MIN);
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(at) => at.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Midnight skipped by a DST jump; fall back to the UTC reading.
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

/// Clock backed by the system time and local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock whose calendar days are UTC days.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.date_naive()
    }

    fn day_bounds(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN));
        (start, start + Duration::days(1))
    }
}
