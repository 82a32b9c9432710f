//! Time source for a run.
//!
//! Everything that stamps a record or picks "today" goes through a `Clock`, so
//! a run can be replayed with a fixed instant in tests.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use crate::domain::UPDATE_TIME_FORMAT;

/// Exchange-local offset (Asia/Taipei has no DST).
const EXCHANGE_UTC_OFFSET_SECS: i32 = 8 * 3600;

pub trait Clock {
    /// Current instant in the exchanges' local time.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Trading date the exchanges consider "today".
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// `now()` formatted for `update_time` fields.
    fn timestamp(&self) -> String {
        self.now().format(UPDATE_TIME_FORMAT).to_string()
    }
}

/// Wall clock, shifted to exchange-local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&exchange_offset())
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self { at }
    }

    /// Pin to a wall-clock time on the exchange calendar.
    ///
    /// Returns `None` for an impossible date or time.
    pub fn at_local(date: NaiveDate, hour: u32, min: u32, sec: u32) -> Option<Self> {
        let naive = date.and_hms_opt(hour, min, sec)?;
        let at = naive.and_local_timezone(exchange_offset()).single()?;
        Some(Self { at })
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.at
    }
}

fn exchange_offset() -> FixedOffset {
    FixedOffset::east_opt(EXCHANGE_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}
