use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Weekly,
    #[default]
    Monthly,
    /// Fixed 15-day step.
    Quincena,
    Annual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    #[default]
    Pending,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    /// 1-based position in the schedule.
    pub index: u32,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub paid: bool,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

/// Kind-specific payload. Serialized inline with the debt envelope under a `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DebtKind {
    OneTime,
    #[serde(rename_all = "camelCase")]
    Installments {
        installment_count: u32,
        #[serde(default)]
        cadence: Cadence,
        #[serde(default)]
        paid_count: u32,
        #[serde(default)]
        schedule: Vec<Installment>,
    },
    #[serde(rename_all = "camelCase")]
    Recurring {
        #[serde(default)]
        cadence: Cadence,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: String,
    pub description: String,
    /// Total principal for installment debts, per-payment amount otherwise.
    pub amount: f64,
    pub created_date: NaiveDate,
    pub status: DebtStatus,
    #[serde(flatten)]
    pub kind: DebtKind,
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
}

impl Debt {
    pub fn is_paid(&self) -> bool {
        self.status == DebtStatus::Paid
    }

    pub fn cadence(&self) -> Option<Cadence> {
        match &self.kind {
            DebtKind::OneTime => None,
            DebtKind::Installments { cadence, .. } | DebtKind::Recurring { cadence } => Some(*cadence),
        }
    }

    pub fn schedule(&self) -> &[Installment] {
        match &self.kind {
            DebtKind::Installments { schedule, .. } => schedule,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DebtKindInput {
    #[default]
    OneTime,
    Installments,
    Recurring,
}

/// Raw form payload for a new debt. `amount` keeps whatever the form sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDebt {
    pub description: String,
    pub amount: serde_json::Value,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub status: Option<DebtStatus>,
    #[serde(default)]
    pub kind: DebtKindInput,
    #[serde(default)]
    pub installment_count: Option<i64>,
    #[serde(default)]
    pub cadence: Option<Cadence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Paid,
}
