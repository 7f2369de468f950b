use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Messaging contact in international format without `+`.
    pub contact_id: Option<String>,
    /// Epoch millis of the last pay-cycle reminder handed to the scheduler.
    pub scheduled_reminder_timestamp: Option<i64>,
}

/// How commas inside amount strings are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalConvention {
    /// A lone comma is the decimal point; next to a dot it is a thousands separator.
    #[default]
    Auto,
    /// Commas are always thousands separators.
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub schema_version: i64,
    pub reminder_hour: u32,
    pub reminder_lead_days: u32,
    pub decimal_convention: DecimalConvention,
    pub currency_symbol: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            schema_version: 1,
            reminder_hour: 9,
            reminder_lead_days: 1,
            decimal_convention: DecimalConvention::Auto,
            currency_symbol: "$".to_string(),
        }
    }
}
