use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::debt::Installment;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueEntry {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtSummary {
    pub debt_count: usize,
    pub total_outstanding: f64,
    pub total_paid: f64,
    pub next_due_date: Option<NaiveDate>,
    pub next_due_amount: f64,
    pub next_quincena: Option<NaiveDate>,
    /// Day the pay-cycle reminder goes out.
    pub reminder_date: Option<NaiveDate>,
    pub is_quincena_day: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMonth {
    /// `YYYY-MM`
    pub key: String,
    pub year: i32,
    pub month: u32,
    pub installments: Vec<Installment>,
}
