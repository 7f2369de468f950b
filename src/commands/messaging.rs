use crate::analysis::aggregate::next_due_entry;
use crate::analysis::amount::round_cents;
use crate::analysis::dates::format_naive_date;
use crate::commands::debts::SharedSession;
use crate::error::DebtError;
use crate::models::debt::Debt;
use chrono::NaiveDate;

const COMPOSER_BASE_URL: &str = "https://wa.me";

/// Hands a finished message to an external composer for the given contact.
pub trait MessageComposer {
    fn compose(&self, contact: &str, message: &str) -> Result<(), DebtError>;
}

/// Reminder text listing every debt whose next payment falls on `target`, or
/// every debt with a pending payment when there is no target.
pub fn build_reminder_message(debts: &[Debt], target: Option<NaiveDate>, currency_symbol: &str) -> String {
    let header = match target {
        Some(date) => format!("Payment reminder for {}:", format_naive_date(date)),
        None => "Upcoming payment reminder:".to_string(),
    };

    let mut lines = vec![header];
    let mut total = 0.0;
    for debt in debts {
        let Some(entry) = next_due_entry(debt) else {
            continue;
        };
        if target.is_some_and(|date| date != entry.date) {
            continue;
        }
        total += entry.amount;
        lines.push(format!("- {}: {currency_symbol}{:.2}", debt.description, entry.amount));
    }
    lines.push(format!("Total: {currency_symbol}{:.2}", round_cents(total)));

    lines.join("\n")
}

/// Deep link for the messaging app. Contacts are international numbers
/// without `+`, so everything but digits is dropped.
pub fn compose_url(contact: &str, message: &str) -> String {
    let digits: String = contact.chars().filter(char::is_ascii_digit).collect();
    format!("{COMPOSER_BASE_URL}/{digits}?text={}", urlencoding::encode(message))
}

#[cfg(feature = "desktop")]
pub struct OpenerComposer {
    app: tauri::AppHandle,
}

#[cfg(feature = "desktop")]
impl OpenerComposer {
    pub fn new(app: tauri::AppHandle) -> Self {
        Self { app }
    }
}

#[cfg(feature = "desktop")]
impl MessageComposer for OpenerComposer {
    fn compose(&self, contact: &str, message: &str) -> Result<(), DebtError> {
        use tauri_plugin_opener::OpenerExt;

        self.app
            .opener()
            .open_url(compose_url(contact, message), None::<&str>)
            .map_err(|e| DebtError::Compose(e.to_string()))
    }
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn preview_reminder_message(session: tauri::State<'_, SharedSession>) -> Result<String, String> {
    preview_reminder_message_internal(session.inner(), chrono::Local::now().date_naive())
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn send_reminder_message(
    contact_id: Option<String>,
    session: tauri::State<'_, SharedSession>,
    app: tauri::AppHandle,
) -> Result<String, String> {
    let composer = OpenerComposer::new(app);
    send_reminder_message_internal(
        session.inner(),
        contact_id,
        chrono::Local::now().date_naive(),
        &composer,
    )
}

pub fn preview_reminder_message_internal(session: &SharedSession, today: NaiveDate) -> Result<String, String> {
    let guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    Ok(guard.reminder_message(today))
}

pub fn send_reminder_message_internal(
    session: &SharedSession,
    contact_id: Option<String>,
    today: NaiveDate,
    composer: &dyn MessageComposer,
) -> Result<String, String> {
    let mut guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    guard
        .send_reminder_message(contact_id, today, composer)
        .map_err(|e| e.to_string())
}
