use crate::models::debt::Installment;
use crate::models::summary::CalendarMonth;
use chrono::{Datelike, Months, NaiveDate};

/// Bucket schedule entries into `months` consecutive calendar months starting
/// with the month of `start`. Entries outside the window are dropped.
pub fn calendar_months(schedule: &[Installment], start: NaiveDate, months: u32) -> Vec<CalendarMonth> {
    let Some(first) = start.with_day(1) else {
        return Vec::new();
    };

    (0..months)
        .filter_map(|offset| first.checked_add_months(Months::new(offset)))
        .map(|month_start| CalendarMonth {
            key: month_start.format("%Y-%m").to_string(),
            year: month_start.year(),
            month: month_start.month(),
            installments: schedule
                .iter()
                .filter(|installment| {
                    installment.due_date.year() == month_start.year()
                        && installment.due_date.month() == month_start.month()
                })
                .cloned()
                .collect(),
        })
        .collect()
}
