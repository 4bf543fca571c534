//! The temporal expression resolver.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, Local, NaiveDate};
use regex::{Captures, Regex};

use super::range::TemporalRange;

/// The observed implementation counts a month in a trailing period
/// ("за последние 2 месяца") as a flat 30 days rather than using calendar
/// arithmetic. Kept as a named policy; see DESIGN.md.
const DAYS_PER_MONTH_APPROX: i64 = 30;

/// Russian month names, genitive ("15 января") and nominative ("январь").
const MONTHS: [(&str, u32); 24] = [
    ("января", 1),
    ("февраля", 2),
    ("марта", 3),
    ("апреля", 4),
    ("мая", 5),
    ("июня", 6),
    ("июля", 7),
    ("августа", 8),
    ("сентября", 9),
    ("октября", 10),
    ("ноября", 11),
    ("декабря", 12),
    ("январь", 1),
    ("февраль", 2),
    ("март", 3),
    ("апрель", 4),
    ("май", 5),
    ("июнь", 6),
    ("июль", 7),
    ("август", 8),
    ("сентябрь", 9),
    ("октябрь", 10),
    ("ноябрь", 11),
    ("декабрь", 12),
];

/// Genitive month-name alternation used inside date patterns.
const MONTH_NAMES: &str =
    "января|февраля|марта|апреля|мая|июня|июля|августа|сентября|октября|ноября|декабря";

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS.iter().find(|(n, _)| *n == name).map(|(_, num)| *num)
}

// ============================================================================
// Pattern families
// ============================================================================

static WORD_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(\d{{1,2}})\s+({MONTH_NAMES})\s+(\d{{4}})")).expect("Invalid regex")
});

static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[./-](\d{1,2})[./-](\d{4})").expect("Invalid regex"));

static WORD_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"с\s+(\d{{1,2}})\s+({MONTH_NAMES})\s+(\d{{4}})\s+по\s+(\d{{1,2}})\s+({MONTH_NAMES})\s+(\d{{4}})"
    ))
    .expect("Invalid regex")
});

static NUMERIC_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"с\s+(\d{1,2})[./-](\d{1,2})[./-](\d{4})\s+по\s+(\d{1,2})[./-](\d{1,2})[./-](\d{4})")
        .expect("Invalid regex")
});

static WORD_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"от\s+(\d{{1,2}})\s+({MONTH_NAMES})\s+(\d{{4}})\s+до\s+(\d{{1,2}})\s+({MONTH_NAMES})\s+(\d{{4}})"
    ))
    .expect("Invalid regex")
});

static QUARTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)(?:-?й|\s)?\s*квартал(?:\s+(\d{4}))?").expect("Invalid regex")
});

static DIGITS_BEFORE_QUARTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+.*квартал").expect("Invalid regex"));

/// Suppresses the bare month marker when the phrase is really a trailing
/// period ("последние 2 месяца"), which belongs to the period stage.
static PERIOD_MONTH_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:последние|за)\s+\d+\s+месяц").expect("Invalid regex"));

#[derive(Clone, Copy)]
enum PeriodUnit {
    Days,
    Weeks,
    Months,
}

static PERIOD_PATTERNS: LazyLock<Vec<(Regex, PeriodUnit)>> = LazyLock::new(|| {
    let make = |pattern: &str| Regex::new(pattern).expect("Invalid regex");
    vec![
        (make(r"последние\s+(\d+)\s+дн(?:я|ей)"), PeriodUnit::Days),
        (make(r"последние\s+(\d+)\s+недел(?:я|и|ь)"), PeriodUnit::Weeks),
        (make(r"последние\s+(\d+)\s+месяц(?:а|ев)"), PeriodUnit::Months),
        (make(r"за\s+(\d+)\s+дн(?:я|ей)"), PeriodUnit::Days),
        (make(r"за\s+(\d+)\s+недел(?:я|и|ь)"), PeriodUnit::Weeks),
        (make(r"за\s+(\d+)\s+месяц(?:а|ев)"), PeriodUnit::Months),
    ]
});

/// One exact-date pattern family: a regex and the extractor that turns its
/// captures into a calendar date. Families are tried independently and their
/// matches merged by text position.
struct DatePattern {
    regex: &'static LazyLock<Regex>,
    parse: fn(&Captures) -> Option<NaiveDate>,
}

fn parse_word_date(caps: &Captures) -> Option<NaiveDate> {
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_numeric_date(caps: &Captures) -> Option<NaiveDate> {
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

static DATE_PATTERNS: [DatePattern; 2] = [
    DatePattern {
        regex: &WORD_DATE,
        parse: parse_word_date,
    },
    DatePattern {
        regex: &NUMERIC_DATE,
        parse: parse_numeric_date,
    },
];

/// One explicit-range pattern family: both boundary dates are anchored
/// inside a single contiguous phrase, never assembled from scattered
/// matches.
struct RangePattern {
    regex: &'static LazyLock<Regex>,
    parse: fn(&Captures) -> Option<(NaiveDate, NaiveDate)>,
}

fn parse_word_range(caps: &Captures) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(
        caps[3].parse().ok()?,
        month_number(&caps[2])?,
        caps[1].parse().ok()?,
    )?;
    let second = NaiveDate::from_ymd_opt(
        caps[6].parse().ok()?,
        month_number(&caps[5])?,
        caps[4].parse().ok()?,
    )?;
    Some((first, second))
}

fn parse_numeric_range(caps: &Captures) -> Option<(NaiveDate, NaiveDate)> {
    let first =
        NaiveDate::from_ymd_opt(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?)?;
    let second =
        NaiveDate::from_ymd_opt(caps[6].parse().ok()?, caps[5].parse().ok()?, caps[4].parse().ok()?)?;
    Some((first, second))
}

static RANGE_PATTERNS: [RangePattern; 3] = [
    RangePattern {
        regex: &WORD_RANGE,
        parse: parse_word_range,
    },
    RangePattern {
        regex: &NUMERIC_RANGE,
        parse: parse_numeric_range,
    },
    RangePattern {
        regex: &WORD_SPAN,
        parse: parse_word_range,
    },
];

// ============================================================================
// Resolver
// ============================================================================

/// Resolves temporal expressions in question text to date ranges.
///
/// Pure and synchronous; the only state is the reference date used for
/// relative phrases, which defaults to today and can be pinned for tests.
pub struct TemporalResolver {
    reference: NaiveDate,
}

impl Default for TemporalResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalResolver {
    /// Resolver anchored to today.
    pub fn new() -> Self {
        Self {
            reference: Local::now().date_naive(),
        }
    }

    /// Resolver with a fixed reference date, for deterministic tests.
    pub fn with_reference(reference: NaiveDate) -> Self {
        Self { reference }
    }

    /// Resolve a temporal expression in `text` to a date range.
    ///
    /// Stages are tried in order and the first one that produces a range
    /// wins. `None` means the question carries no temporal context — a
    /// legitimate outcome, not a failure.
    pub fn resolve(&self, text: &str) -> Option<TemporalRange> {
        let text = text.to_lowercase();
        const STAGES: [(&str, fn(&TemporalResolver, &str) -> Option<TemporalRange>); 4] = [
            ("relative", TemporalResolver::resolve_relative),
            ("exact_date", TemporalResolver::resolve_exact_dates),
            ("explicit_range", TemporalResolver::resolve_explicit_range),
            ("trailing_period", TemporalResolver::resolve_trailing_period),
        ];
        STAGES.iter().find_map(|(family, stage)| {
            let range = stage(self, &text)?;
            tracing::debug!(family, "temporal pattern matched");
            Some(range)
        })
    }

    // ========================================================================
    // Stage 1: relative keywords
    // ========================================================================

    fn resolve_relative(&self, text: &str) -> Option<TemporalRange> {
        if text.contains("сегодня") {
            return Some(TemporalRange::single_day(self.reference));
        }
        if text.contains("вчера") {
            return Some(TemporalRange::single_day(self.reference - Duration::days(1)));
        }
        if text.contains("неделя") || text.contains("неделю") {
            return Some(self.week_range(text));
        }
        if text.contains("месяц") && !PERIOD_MONTH_PHRASE.is_match(text) {
            return Some(self.month_range(text));
        }
        if text.contains("квартал") {
            return self.resolve_quarter(text);
        }
        None
    }

    /// Monday–Sunday span of the current week, or of the previous week when
    /// a last/previous qualifier co-occurs.
    fn week_range(&self, text: &str) -> TemporalRange {
        let offset = self.reference.weekday().num_days_from_monday() as i64;
        if text.contains("последняя неделя") || text.contains("прошлая неделя") {
            let end = self.reference - Duration::days(offset + 1);
            TemporalRange::days(end - Duration::days(6), end)
        } else {
            let start = self.reference - Duration::days(offset);
            TemporalRange::days(start, start + Duration::days(6))
        }
    }

    /// Full previous calendar month with a last/previous qualifier;
    /// otherwise month-to-date (the 1st through the reference day, not the
    /// month's last day).
    fn month_range(&self, text: &str) -> TemporalRange {
        let first_of_current = self.reference.with_day(1).expect("day 1 is valid");
        if text.contains("последний месяц") || text.contains("прошлый месяц") {
            let last_of_previous = first_of_current - Duration::days(1);
            let first_of_previous = last_of_previous.with_day(1).expect("day 1 is valid");
            TemporalRange::days(first_of_previous, last_of_previous)
        } else {
            TemporalRange::days(first_of_current, self.reference)
        }
    }

    // ========================================================================
    // Stage 2: exact dates
    // ========================================================================

    /// Collects matches from both date families, ordered by text position.
    /// One match spans that day; two or more span from the earliest- to the
    /// latest-positioned date. Selection is by position, never chronology: a
    /// textually later but chronologically earlier date leaves `end` before
    /// `start`, preserved as observed behavior.
    fn resolve_exact_dates(&self, text: &str) -> Option<TemporalRange> {
        let mut matches: Vec<(usize, NaiveDate)> = Vec::new();
        for family in &DATE_PATTERNS {
            for caps in family.regex.captures_iter(text) {
                let pos = caps.get(0).expect("whole match").start();
                let date = (family.parse)(&caps)?;
                matches.push((pos, date));
            }
        }
        if matches.is_empty() {
            return None;
        }
        matches.sort_by_key(|(pos, _)| *pos);
        let (_, first) = matches[0];
        let (_, last) = matches[matches.len() - 1];
        Some(TemporalRange::days(first, last))
    }

    // ========================================================================
    // Stage 3: explicit ranges
    // ========================================================================

    fn resolve_explicit_range(&self, text: &str) -> Option<TemporalRange> {
        for family in &RANGE_PATTERNS {
            if let Some(caps) = family.regex.captures(text) {
                let (first, second) = (family.parse)(&caps)?;
                // Boundaries keep their textual order.
                return Some(TemporalRange::days(first, second));
            }
        }
        None
    }

    // ========================================================================
    // Stage 4: trailing periods
    // ========================================================================

    fn resolve_trailing_period(&self, text: &str) -> Option<TemporalRange> {
        for (regex, unit) in PERIOD_PATTERNS.iter() {
            if let Some(caps) = regex.captures(text) {
                let n: i64 = caps[1].parse().ok()?;
                let days = match unit {
                    PeriodUnit::Days => n,
                    PeriodUnit::Weeks => n * 7,
                    PeriodUnit::Months => n * DAYS_PER_MONTH_APPROX,
                };
                let start = self.reference - Duration::days(days);
                return Some(TemporalRange::days(start, self.reference));
            }
        }
        None
    }

    // ========================================================================
    // Stage 5: quarter sub-resolution
    // ========================================================================

    /// "N[-й] квартал [YYYY]", or the quarter containing the reference date
    /// when no numbered form is present and no digits precede the marker.
    fn resolve_quarter(&self, text: &str) -> Option<TemporalRange> {
        if let Some(caps) = QUARTER.captures(text) {
            let number: u32 = caps[1].parse().ok()?;
            let year = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<i32>().ok())
                .unwrap_or(self.reference.year());
            if (1..=4).contains(&number) {
                return Some(quarter_range(year, number));
            }
            return None;
        }
        if !DIGITS_BEFORE_QUARTER.is_match(text) {
            let current = (self.reference.month() - 1) / 3 + 1;
            return Some(quarter_range(self.reference.year(), current));
        }
        None
    }
}

/// Quarter N of year Y spans months `(N-1)*3+1 ..= (N-1)*3+3`; the end is
/// the last calendar day of the last month (first day of the following
/// month minus one day; Q4 ends December 31).
fn quarter_range(year: i32, quarter: u32) -> TemporalRange {
    let start_month = (quarter - 1) * 3 + 1;
    let end_month = start_month + 2;
    let start = NaiveDate::from_ymd_opt(year, start_month, 1).expect("quarter start is valid");
    let end = if end_month == 12 {
        NaiveDate::from_ymd_opt(year, 12, 31).expect("december 31 is valid")
    } else {
        NaiveDate::from_ymd_opt(year, end_month + 1, 1).expect("month start is valid")
            - Duration::days(1)
    };
    TemporalRange::days(start, end)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, NaiveTime, Timelike, Weekday};

    fn resolver_at(year: i32, month: u32, day: u32) -> TemporalResolver {
        TemporalResolver::with_reference(NaiveDate::from_ymd_opt(year, month, day).unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day_start(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_time(NaiveTime::MIN)
    }

    fn day_end(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_time(NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap())
    }

    #[test]
    fn test_today() {
        let range = resolver_at(2024, 1, 10)
            .resolve("Сколько видео вышло сегодня?")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 10));
        assert_eq!(range.end, day_end(2024, 1, 10));
    }

    #[test]
    fn test_yesterday() {
        let range = resolver_at(2024, 1, 10)
            .resolve("сколько просмотров было вчера")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 9));
        assert_eq!(range.end, day_end(2024, 1, 9));
    }

    #[test]
    fn test_current_week_monday_to_sunday() {
        // 2024-01-10 is a Wednesday; the current week is Jan 8 - Jan 14.
        let range = resolver_at(2024, 1, 10)
            .resolve("сколько лайков набрано за эту неделю")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 8));
        assert_eq!(range.end, day_end(2024, 1, 14));
        assert_eq!(range.start.date().weekday(), Weekday::Mon);
        assert_eq!(range.end.date().weekday(), Weekday::Sun);
    }

    #[test]
    fn test_last_week() {
        let range = resolver_at(2024, 1, 10)
            .resolve("статистика за прошлая неделя")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 1));
        assert_eq!(range.end, day_end(2024, 1, 7));
    }

    #[test]
    fn test_current_month_runs_to_reference_day() {
        let range = resolver_at(2024, 1, 15)
            .resolve("сколько видео вышло за месяц")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 1));
        assert_eq!(range.end, day_end(2024, 1, 15));
    }

    #[test]
    fn test_previous_month_full_span() {
        // February 2024 is a leap month.
        let range = resolver_at(2024, 3, 10)
            .resolve("сколько просмотров за прошлый месяц")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 2, 1));
        assert_eq!(range.end, day_end(2024, 2, 29));
    }

    #[test]
    fn test_explicit_quarter() {
        let range = resolver_at(2024, 1, 10)
            .resolve("сколько видео вышло в 3 квартал 2024")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 7, 1));
        assert_eq!(range.end, day_end(2024, 9, 30));
    }

    #[test]
    fn test_fourth_quarter_ends_december_31() {
        let range = resolver_at(2024, 1, 10)
            .resolve("итоги за 4 квартал 2023")
            .unwrap();
        assert_eq!(range.start, day_start(2023, 10, 1));
        assert_eq!(range.end, day_end(2023, 12, 31));
    }

    #[test]
    fn test_bare_quarter_uses_reference_date() {
        let range = resolver_at(2024, 2, 10)
            .resolve("сколько видео вышло за квартал")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 1));
        assert_eq!(range.end, day_end(2024, 3, 31));
    }

    #[test]
    fn test_out_of_range_quarter_number() {
        assert!(resolver_at(2024, 1, 10)
            .resolve("сколько видео вышло в 5 квартал 2024")
            .is_none());
    }

    #[test]
    fn test_single_word_date() {
        let range = resolver_at(2024, 6, 1)
            .resolve("Сколько видео вышло 15 января 2024?")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 15));
        assert_eq!(range.end, day_end(2024, 1, 15));
    }

    #[test]
    fn test_single_numeric_date_separators() {
        for text in ["просмотры 15.01.2024", "просмотры 15/01/2024", "просмотры 15-01-2024"] {
            let range = resolver_at(2024, 6, 1).resolve(text).unwrap();
            assert_eq!(range.start, day_start(2024, 1, 15));
            assert_eq!(range.end, day_end(2024, 1, 15));
        }
    }

    #[test]
    fn test_two_dates_span_by_position() {
        let range = resolver_at(2024, 6, 1)
            .resolve("видео вышедшие 1 января 2024 и 5 января 2024")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 1));
        assert_eq!(range.end, day_end(2024, 1, 5));
    }

    #[test]
    fn test_positional_tie_break_not_normalized() {
        // The later-positioned date is chronologically earlier; the range is
        // still built from text position, leaving end before start.
        let range = resolver_at(2024, 6, 1)
            .resolve("видео между 5 января 2024 и 1 января 2024")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 5));
        assert_eq!(range.end, day_end(2024, 1, 1));
        assert!(range.end < range.start);
    }

    #[test]
    fn test_mixed_families_merge_by_position() {
        let range = resolver_at(2024, 6, 1)
            .resolve("с учетом 15.01.2024 и 20 января 2024")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 15));
        assert_eq!(range.end, day_end(2024, 1, 20));
    }

    #[test]
    fn test_explicit_range_stage_word_form() {
        let resolver = resolver_at(2024, 6, 1);
        let range = resolver
            .resolve_explicit_range("с 15 января 2024 по 20 января 2024")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 15));
        assert_eq!(range.end, day_end(2024, 1, 20));
    }

    #[test]
    fn test_explicit_range_stage_numeric_form() {
        let resolver = resolver_at(2024, 6, 1);
        let range = resolver
            .resolve_explicit_range("с 15.01.2024 по 20.01.2024")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 15));
        assert_eq!(range.end, day_end(2024, 1, 20));
    }

    #[test]
    fn test_explicit_range_stage_until_variant() {
        let resolver = resolver_at(2024, 6, 1);
        let range = resolver
            .resolve_explicit_range("от 1 февраля 2024 до 10 февраля 2024")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 2, 1));
        assert_eq!(range.end, day_end(2024, 2, 10));
    }

    #[test]
    fn test_trailing_period_days() {
        let range = resolver_at(2024, 1, 10)
            .resolve("сколько просмотров за последние 7 дней")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 3));
        assert_eq!(range.end, day_end(2024, 1, 10));
    }

    #[test]
    fn test_trailing_period_weeks() {
        let range = resolver_at(2024, 1, 29)
            .resolve("динамика за последние 2 недели")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 15));
        assert_eq!(range.end, day_end(2024, 1, 29));
    }

    #[test]
    fn test_trailing_period_months_use_flat_30_days() {
        // 2 months is 60 days back, not two calendar months.
        let range = resolver_at(2024, 3, 1)
            .resolve("сколько видео вышло за последние 2 месяца")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 1));
        assert_eq!(range.end, day_end(2024, 3, 1));
    }

    #[test]
    fn test_no_temporal_context() {
        assert!(resolver_at(2024, 1, 10)
            .resolve("Сколько всего видео есть в системе?")
            .is_none());
    }

    #[test]
    fn test_invalid_calendar_date_is_not_a_match() {
        assert!(resolver_at(2024, 1, 10).resolve("просмотры 99.99.2024").is_none());
    }

    #[test]
    fn test_invalid_date_does_not_block_later_stages() {
        let range = resolver_at(2024, 1, 10)
            .resolve("просмотры 99.99.2024 за последние 5 дней")
            .unwrap();
        assert_eq!(range.start, day_start(2024, 1, 5));
        assert_eq!(range.end, day_end(2024, 1, 10));
    }

    #[test]
    fn test_case_insensitive_matching() {
        let range = resolver_at(2024, 1, 10).resolve("СКОЛЬКО ВИДЕО ВЫШЛО ВЧЕРА").unwrap();
        assert_eq!(range.start.date(), date(2024, 1, 9));
    }

    #[test]
    fn test_relative_keyword_wins_over_exact_date() {
        // Stage order: the relative marker short-circuits the exact date.
        let range = resolver_at(2024, 1, 10)
            .resolve("сегодня или 15.01.2024")
            .unwrap();
        assert_eq!(range.start.date(), date(2024, 1, 10));
    }

    #[test]
    fn test_boundary_times() {
        let range = resolver_at(2024, 1, 10).resolve("сегодня").unwrap();
        assert_eq!(range.start.time(), NaiveTime::MIN);
        assert_eq!(range.end.time().hour(), 23);
        assert_eq!(range.end.time().nanosecond(), 999_999_000);
    }
}
