use crate::analysis::amount::round_cents;
use crate::analysis::dates::advance_date;
use crate::models::debt::{Cadence, Debt, DebtKind, DebtStatus, Installment};
use chrono::NaiveDate;

pub const MAX_INSTALLMENTS: u32 = 360;

pub fn clamp_installment_count(raw: i64) -> u32 {
    raw.clamp(1, i64::from(MAX_INSTALLMENTS)) as u32
}

/// Split `amount` into `count` installments one cadence step apart. Every entry
/// gets the cent-rounded even share except the last, which absorbs the remainder
/// so the schedule sums to the principal.
pub fn generate_installments(
    amount: f64,
    count: u32,
    first_due: NaiveDate,
    cadence: Cadence,
) -> Vec<Installment> {
    let count = count.max(1);
    let base = round_cents(amount / f64::from(count));

    (0..count)
        .map(|i| {
            let due_date = if i == 0 {
                first_due
            } else {
                advance_date(first_due, cadence, i)
            };
            let amount = if i + 1 == count {
                round_cents(amount - base * f64::from(count - 1))
            } else {
                base
            };

            Installment {
                index: i + 1,
                due_date,
                amount,
                paid: false,
                paid_at: None,
            }
        })
        .collect()
}

pub fn first_unpaid(schedule: &[Installment]) -> Option<&Installment> {
    schedule.iter().find(|installment| !installment.paid)
}

/// Re-derive paid count, status and next due date of an installment debt from
/// its schedule. Debts of other kinds and legacy debts without a schedule are
/// left untouched.
pub fn sync_progress(debt: &mut Debt) {
    let DebtKind::Installments {
        installment_count,
        paid_count,
        schedule,
        ..
    } = &mut debt.kind
    else {
        return;
    };

    if schedule.is_empty() {
        return;
    }

    *paid_count = schedule.iter().filter(|installment| installment.paid).count() as u32;
    debt.status = if *paid_count >= *installment_count {
        DebtStatus::Paid
    } else {
        DebtStatus::Pending
    };
    debt.next_due_date = first_unpaid(schedule).map(|installment| installment.due_date);
}
