//! Natural-language date/time parsing for event listings.
//!
//! Everything here is naive local time: the datetimes are taken to be local
//! to the event's venue and no timezone conversion happens.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::TimeWindow;

/// Tried in order; the first that parses a prefix of the text wins and the
/// remainder may carry a time of day.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
];

const TIME_FORMATS: &[&str] = &[
    "%I:%M %p", "%I:%M%p", "%I %p", "%I%p", "%I:%M:%S %p", "%H:%M:%S%.f", "%H:%M:%S", "%H:%M",
];

#[expect(clippy::expect_used, reason = "Static regex pattern is valid")]
static WEEKDAY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)(day|nesday|sday|urday)?\.?,?\s+")
        .expect("Static regex pattern is guaranteed to be valid")
});

#[expect(clippy::expect_used, reason = "Static regex pattern is valid")]
static ORDINAL_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([0-9]{1,2})(st|nd|rd|th)\b")
        .expect("Static regex pattern is guaranteed to be valid")
});

/// Trailing `Z`, numeric offset or zone abbreviation on a time of day.
#[expect(clippy::expect_used, reason = "Static regex pattern is valid")]
static ZONE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:Z|[+-][0-9]{2}(?::?[0-9]{2})?|\s+\(?[A-Z]{2,5}\)?)$")
        .expect("Static regex pattern is guaranteed to be valid")
});

/// Combine a date text and an optional time-of-day text into one datetime.
///
/// Returns `None` when the date is absent or unparsable; never panics. With no
/// usable time the date is taken at midnight. A time embedded in the date
/// text (`2026-01-15T19:00:00`) is used unless `time_text` parses.
#[must_use]
pub fn parse_datetime(date_text: Option<&str>, time_text: Option<&str>) -> Option<NaiveDateTime> {
    let raw = date_text.map(str::trim).filter(|s| !s.is_empty())?;
    let cleaned = clean_date(raw);

    let Some((date, rest)) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_and_remainder(&cleaned, fmt).ok())
    else {
        debug!("Unparsable date text {raw:?}");
        return None;
    };

    let time = time_text
        .and_then(parse_time)
        .or_else(|| parse_time(rest))
        .unwrap_or(NaiveTime::MIN);

    Some(date.and_time(time))
}

fn clean_date(raw: &str) -> String {
    let without_weekday = WEEKDAY_PREFIX.replace(raw, "");
    let without_ordinals = ORDINAL_SUFFIX.replace_all(&without_weekday, "$1");
    without_ordinals
        .replace(". ", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a time of day such as `7:00 PM`, `7pm`, `19:00` or the start of a
/// range like `7:00 PM - 9:00 PM`.
fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text
        .trim()
        .trim_start_matches(['T', 't', ',', '@'])
        .trim_start();
    let text = text
        .strip_prefix("at ")
        .or_else(|| text.strip_prefix("AT "))
        .unwrap_or(text);

    let start = text
        .split(['-', '–', '—'])
        .next()
        .unwrap_or(text)
        .split(" to ")
        .next()
        .unwrap_or(text);

    let normalized = start
        .trim()
        .to_uppercase()
        .replace("A.M.", "AM")
        .replace("P.M.", "PM");
    if normalized.is_empty() {
        return None;
    }

    match normalized.as_str() {
        "NOON" => return NaiveTime::from_hms_opt(12, 0, 0),
        "MIDNIGHT" => return Some(NaiveTime::MIN),
        _ => {}
    }

    // The wall-clock time is kept as written; the zone is dropped, not applied.
    match_time_formats(&normalized).or_else(|| {
        let local = ZONE_SUFFIX.replace(&normalized, "");
        match_time_formats(local.trim_end())
    })
}

fn match_time_formats(text: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
}

/// Resolve a relative phrase (`this weekend`, `tomorrow`, `friday`) into a
/// concrete window around `now`.
///
/// `anytime` gives an unbounded window; an explicit date gives that whole
/// day. Unknown phrases give `None`.
#[must_use]
pub fn resolve_window(phrase: &str, now: NaiveDateTime) -> Option<TimeWindow> {
    let phrase = phrase
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let today = now.date();

    let window = match phrase.as_str() {
        "anytime" | "any time" | "whenever" => TimeWindow::unbounded(),
        "today" => whole_days(today, today)?,
        "tonight" => TimeWindow::between(today.and_hms_opt(17, 0, 0)?, end_of(today)?),
        "tomorrow" => {
            let tomorrow = today.checked_add_days(Days::new(1))?;
            whole_days(tomorrow, tomorrow)?
        }
        "this weekend" | "weekend" => weekend_from(today)?,
        "next weekend" => weekend_from(today.checked_add_days(Days::new(7))?)?,
        "this week" => {
            let sunday = today.checked_add_days(Days::new(days_until(today, Weekday::Sun)))?;
            TimeWindow::between(now, end_of(sunday)?)
        }
        "next week" => {
            let monday = today.checked_add_days(Days::new(match days_until(today, Weekday::Mon) {
                0 => 7,
                n => n,
            }))?;
            whole_days(monday, monday.checked_add_days(Days::new(6))?)?
        }
        "this month" => TimeWindow::between(now, end_of(last_day_of_month(today)?)?),
        "next month" => {
            let first = today.with_day(1)?.checked_add_months(Months::new(1))?;
            whole_days(first, last_day_of_month(first)?)?
        }
        other => {
            if let Some(weekday) = parse_weekday(other) {
                let day = today.checked_add_days(Days::new(days_until(today, weekday)))?;
                whole_days(day, day)?
            } else {
                let day = parse_datetime(Some(other), None)?.date();
                whole_days(day, day)?
            }
        }
    };

    Some(window)
}

fn end_of(day: NaiveDate) -> Option<NaiveDateTime> {
    day.and_hms_opt(23, 59, 59)
}

fn whole_days(first: NaiveDate, last: NaiveDate) -> Option<TimeWindow> {
    Some(TimeWindow::between(first.and_time(NaiveTime::MIN), end_of(last)?))
}

/// Friday 17:00 through Sunday night of the weekend containing or following
/// `day`.
fn weekend_from(day: NaiveDate) -> Option<TimeWindow> {
    let friday = match day.weekday() {
        Weekday::Sat => day.checked_sub_days(Days::new(1))?,
        Weekday::Sun => day.checked_sub_days(Days::new(2))?,
        _ => day.checked_add_days(Days::new(days_until(day, Weekday::Fri)))?,
    };
    let sunday = friday.checked_add_days(Days::new(2))?;
    Some(TimeWindow::between(friday.and_hms_opt(17, 0, 0)?, end_of(sunday)?))
}

/// Days from `from` to the next `target`, zero when `from` already is one.
fn days_until(from: NaiveDate, target: Weekday) -> u64 {
    let from = from.weekday().num_days_from_monday();
    let target = target.num_days_from_monday();
    u64::from((target + 7 - from) % 7)
}

fn last_day_of_month(day: NaiveDate) -> Option<NaiveDate> {
    day.with_day(1)?
        .checked_add_months(Months::new(1))?
        .checked_sub_days(Days::new(1))
}

fn parse_weekday(text: &str) -> Option<Weekday> {
    let text = text.strip_prefix("this ").unwrap_or(text);
    text.parse::<Weekday>().ok()
}
