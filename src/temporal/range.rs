//! The `TemporalRange` value type.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// An inclusive start/end timestamp pair bounding a query.
///
/// Both timestamps are naive (single implied timezone). In the common case
/// `start <= end`, each truncated to day boundaries. Ranges built from two
/// dates written out of chronological order keep their textual order, so
/// `end` can precede `start`; see [`super::TemporalResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TemporalRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Range spanning a single calendar day, day-start to day-end.
    pub fn single_day(date: NaiveDate) -> Self {
        Self::days(date, date)
    }

    /// Range from day-start of `first` through day-end of `last`.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: day_start(first),
            end: day_end(last),
        }
    }

    /// Render the range as a SQL `BETWEEN` predicate fragment.
    pub fn sql_predicate(&self) -> String {
        format!(
            "BETWEEN '{}' AND '{}'",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// `00:00:00.000000` on the given day.
pub(crate) fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// `23:59:59.999999` on the given day.
pub(crate) fn day_end(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).expect("valid boundary time"))
}
