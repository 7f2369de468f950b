use crate::analysis::amount::round_cents;
use crate::analysis::schedule::first_unpaid;
use crate::models::debt::{Debt, DebtKind, DebtStatus, StatusFilter};
use crate::models::settings::Preferences;
use crate::models::summary::{DebtSummary, DueEntry};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeSet;

/// What the debt asks for next, if anything.
pub fn next_due_entry(debt: &Debt) -> Option<DueEntry> {
    match &debt.kind {
        DebtKind::Installments {
            installment_count,
            paid_count,
            schedule,
            ..
        } => {
            if let Some(installment) = first_unpaid(schedule) {
                return Some(DueEntry {
                    date: installment.due_date,
                    amount: installment.amount,
                });
            }
            // Legacy records without a materialized schedule.
            if schedule.is_empty() && paid_count < installment_count {
                return debt.next_due_date.map(|date| DueEntry {
                    date,
                    amount: installment_share(debt.amount, *installment_count),
                });
            }
            None
        }
        DebtKind::Recurring { .. } => debt.next_due_date.map(|date| DueEntry {
            date,
            amount: debt.amount,
        }),
        DebtKind::OneTime => match debt.status {
            DebtStatus::Pending => debt.next_due_date.map(|date| DueEntry {
                date,
                amount: debt.amount,
            }),
            DebtStatus::Paid => None,
        },
    }
}

pub fn next_amount_due(debt: &Debt) -> f64 {
    next_due_entry(debt).map(|entry| entry.amount).unwrap_or(0.0)
}

/// Balance still owed. Recurring debts have no balance.
pub fn outstanding_for(debt: &Debt) -> f64 {
    match &debt.kind {
        DebtKind::Installments {
            installment_count,
            paid_count,
            schedule,
            ..
        } => {
            if schedule.is_empty() {
                let paid = installment_share(debt.amount, *installment_count) * f64::from(*paid_count);
                (debt.amount - paid).max(0.0)
            } else {
                schedule
                    .iter()
                    .filter(|installment| !installment.paid)
                    .map(|installment| installment.amount)
                    .sum()
            }
        }
        DebtKind::OneTime => match debt.status {
            DebtStatus::Pending => debt.amount,
            DebtStatus::Paid => 0.0,
        },
        DebtKind::Recurring { .. } => 0.0,
    }
}

pub fn total_outstanding(debts: &[Debt]) -> f64 {
    round_cents(debts.iter().map(outstanding_for).sum())
}

pub fn total_paid(debts: &[Debt]) -> f64 {
    let sum = debts
        .iter()
        .filter(|debt| debt.is_paid())
        .filter(|debt| !matches!(debt.kind, DebtKind::Recurring { .. }))
        .map(|debt| debt.amount)
        .sum();
    round_cents(sum)
}

/// Earliest next-due date on or after `today`, else the earliest one overall.
pub fn earliest_upcoming_due(debts: &[Debt], today: NaiveDate) -> Option<NaiveDate> {
    let mut dates: Vec<NaiveDate> = debts
        .iter()
        .filter_map(next_due_entry)
        .map(|entry| entry.date)
        .collect();
    dates.sort();

    dates
        .iter()
        .copied()
        .find(|date| *date >= today)
        .or_else(|| dates.first().copied())
}

pub fn total_due_on(debts: &[Debt], date: NaiveDate) -> f64 {
    let sum = debts
        .iter()
        .filter_map(next_due_entry)
        .filter(|entry| entry.date == date)
        .map(|entry| entry.amount)
        .sum();
    round_cents(sum)
}

/// Next pay-cycle date: a next-due date falling on the 15th or 16th. When all
/// such dates are in the past the earliest one is returned anyway.
pub fn next_quincena(debts: &[Debt], today: NaiveDate) -> Option<NaiveDate> {
    let candidates: BTreeSet<NaiveDate> = debts
        .iter()
        .filter_map(next_due_entry)
        .map(|entry| entry.date)
        .filter(|date| is_quincena_day(*date))
        .collect();

    candidates
        .iter()
        .copied()
        .find(|date| *date >= today)
        .or_else(|| candidates.first().copied())
}

pub fn is_quincena_day(date: NaiveDate) -> bool {
    matches!(date.day(), 15 | 16)
}

pub fn filter_debts(debts: &[Debt], filter: StatusFilter) -> Vec<Debt> {
    debts
        .iter()
        .filter(|debt| match filter {
            StatusFilter::All => true,
            StatusFilter::Pending => debt.status == DebtStatus::Pending,
            StatusFilter::Paid => debt.status == DebtStatus::Paid,
        })
        .cloned()
        .collect()
}

pub fn summarize(debts: &[Debt], today: NaiveDate, preferences: &Preferences) -> DebtSummary {
    let next_due_date = earliest_upcoming_due(debts, today);
    let next_quincena = next_quincena(debts, today);

    DebtSummary {
        debt_count: debts.len(),
        total_outstanding: total_outstanding(debts),
        total_paid: total_paid(debts),
        next_due_date,
        next_due_amount: next_due_date.map(|date| total_due_on(debts, date)).unwrap_or(0.0),
        next_quincena,
        reminder_date: next_quincena.and_then(|date| {
            date.checked_sub_days(Days::new(u64::from(preferences.reminder_lead_days)))
        }),
        is_quincena_day: is_quincena_day(today),
    }
}

fn installment_share(amount: f64, count: u32) -> f64 {
    round_cents(amount / f64::from(count.max(1)))
}
