use crate::models::debt::Cadence;
use chrono::{DateTime, Datelike, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

const YMD_FORMAT: &str = "%Y-%m-%d";

static YMD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid date pattern"));

/// Render any date-ish input as `YYYY-MM-DD`, or `""` if it can't be read.
///
/// An embedded `YYYY-MM-DD` is taken verbatim so timestamps such as
/// `2024-03-05T23:30:00-06:00` keep their calendar day instead of shifting
/// through a timezone conversion.
pub fn format_date_ymd(input: &str) -> String {
    if let Some(found) = YMD_PATTERN.find(input) {
        return found.as_str().to_string();
    }

    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return format_naive_date(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return format_naive_date(dt.date_naive());
    }

    for format in ["%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return format_naive_date(date);
        }
    }

    String::new()
}

pub fn format_naive_date(date: NaiveDate) -> String {
    date.format(YMD_FORMAT).to_string()
}

pub fn parse_ymd(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format_date_ymd(input), YMD_FORMAT).ok()
}

/// Move `date_str` forward by `n` cadence periods. Unreadable input comes back as-is.
pub fn advance_by_period(date_str: &str, cadence: Cadence, n: u32) -> String {
    match parse_ymd(date_str) {
        Some(date) => format_naive_date(advance_date(date, cadence, n)),
        None => date_str.to_string(),
    }
}

/// Month and year steps overflow like a calendar rollover: Jan 31 + 1 month
/// lands in early March, Feb 29 + 1 year lands on Mar 1.
pub fn advance_date(date: NaiveDate, cadence: Cadence, n: u32) -> NaiveDate {
    let advanced = match cadence {
        Cadence::Weekly => date.checked_add_days(Days::new(7 * u64::from(n))),
        Cadence::Quincena => date.checked_add_days(Days::new(15 * u64::from(n))),
        Cadence::Annual => rollover_date(i64::from(date.year()) + i64::from(n), date.month(), date.day()),
        Cadence::Monthly => {
            let months = i64::from(date.month0()) + i64::from(n);
            let year = i64::from(date.year()) + months.div_euclid(12);
            let month = months.rem_euclid(12) as u32 + 1;
            rollover_date(year, month, date.day())
        }
    };

    advanced.unwrap_or(date)
}

fn rollover_date(year: i64, month: u32, day: u32) -> Option<NaiveDate> {
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(u64::from(day.saturating_sub(1))))
}
