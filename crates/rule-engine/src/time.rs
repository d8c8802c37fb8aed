//! Wall-clock time-of-day windows

use crate::error::RuleError;
use chrono::{NaiveTime, Weekday};

/// Day codes as spelled in configuration, indexed by
/// `Weekday::num_days_from_sunday`.
const WEEKDAY_CODES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Config spelling of a weekday.
#[must_use]
pub fn weekday_code(day: Weekday) -> &'static str {
    WEEKDAY_CODES[day.num_days_from_sunday() as usize]
}

/// Parse a strict `HH:MM:SS` time-of-day string.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, RuleError> {
    let well_formed = s.len() == 8
        && s.bytes()
            .enumerate()
            .all(|(i, b)| if i == 2 || i == 5 { b == b':' } else { b.is_ascii_digit() });
    if !well_formed {
        return Err(RuleError::InvalidTimeFormat(s.to_string()));
    }
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .map_err(|_| RuleError::InvalidTimeFormat(s.to_string()))
}

/// Time-of-day interval, inclusive at both boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub after: NaiveTime,
    pub before: NaiveTime,
}

impl TimeWindow {
    #[must_use]
    pub fn new(after: NaiveTime, before: NaiveTime) -> Self {
        Self { after, before }
    }

    /// Interval membership.
    ///
    /// Coincident bounds make the window empty, even at the shared
    /// instant. When `after > before` the window wraps past midnight and
    /// membership is the negation of the swapped-bounds test.
    #[must_use]
    pub fn contains(&self, instant: NaiveTime) -> bool {
        if self.after == self.before {
            return false;
        }
        if instant == self.after || instant == self.before {
            return true;
        }
        let (low, high, inverted) = if self.after > self.before {
            (self.before, self.after, true)
        } else {
            (self.after, self.before, false)
        };
        let inside = instant > low && instant < high;
        inside != inverted
    }
}
