use crate::analysis::aggregate::{next_due_entry, next_quincena, total_due_on};
use crate::analysis::dates::format_naive_date;
use crate::models::debt::Debt;
use crate::models::settings::Preferences;
use chrono::{DateTime, Days, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Timer key of the pay-cycle reminder. Per-debt timers use the debt id.
pub const PAY_CYCLE_KEY: &str = "pay-cycle";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub title: String,
    pub body: String,
    pub debt_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedReminder {
    pub key: String,
    /// Epoch millis.
    pub fire_at: i64,
    pub payload: ReminderPayload,
}

pub trait Notifier: Send + Sync {
    /// False when the host can't raise notifications (no permission, no support).
    fn is_available(&self) -> bool {
        true
    }

    fn notify(&self, key: &str, payload: &ReminderPayload);
}

/// Drops every reminder. Used when the host has no notification support.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn is_available(&self) -> bool {
        false
    }

    fn notify(&self, _key: &str, _payload: &ReminderPayload) {}
}

/// One-shot timers keyed by id. Scheduling a key replaces its pending timer;
/// dropping the scheduler cancels everything still pending.
pub struct ReminderScheduler {
    notifier: Arc<dyn Notifier>,
    runtime: Option<Handle>,
    timers: HashMap<String, JoinHandle<()>>,
}

impl ReminderScheduler {
    /// Uses the ambient tokio runtime if there is one.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            runtime: Handle::try_current().ok(),
            timers: HashMap::new(),
        }
    }

    pub fn with_runtime(notifier: Arc<dyn Notifier>, runtime: Handle) -> Self {
        Self {
            notifier,
            runtime: Some(runtime),
            timers: HashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            notifier: Arc::new(SilentNotifier),
            runtime: None,
            timers: HashMap::new(),
        }
    }

    /// Returns whether the reminder was delivered or armed. A `fire_at` in the
    /// past fires right away.
    pub fn schedule(&mut self, key: &str, fire_at: i64, payload: ReminderPayload) -> bool {
        self.cancel(key);

        if !self.notifier.is_available() {
            return false;
        }

        let delay = fire_at - chrono::Utc::now().timestamp_millis();
        if delay <= 0 {
            self.notifier.notify(key, &payload);
            return true;
        }

        let Some(runtime) = self.runtime.as_ref() else {
            log::debug!("No async runtime available, reminder {key} not armed");
            return false;
        };

        let notifier = Arc::clone(&self.notifier);
        let timer_key = key.to_string();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
            notifier.notify(&timer_key, &payload);
        });
        self.timers.insert(key.to_string(), handle);
        log::info!("Reminder {key} armed to fire in {}s", delay / 1000);
        true
    }

    pub fn cancel(&mut self, key: &str) -> bool {
        match self.timers.remove(key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.timers.get(key).is_some_and(|handle| !handle.is_finished())
    }

    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .timers
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Local instant `lead_days` before `due` at the configured hour.
pub fn reminder_instant(due: NaiveDate, preferences: &Preferences) -> Option<DateTime<Local>> {
    let day = due.checked_sub_days(Days::new(u64::from(preferences.reminder_lead_days)))?;
    let naive = day.and_hms_opt(preferences.reminder_hour, 0, 0)?;
    Local.from_local_datetime(&naive).earliest()
}

/// One reminder per debt with a next due date on or after `today`.
pub fn plan_debt_reminders(debts: &[Debt], preferences: &Preferences, today: NaiveDate) -> Vec<PlannedReminder> {
    debts
        .iter()
        .filter_map(|debt| {
            let entry = next_due_entry(debt).filter(|entry| entry.date >= today)?;
            let fire_at = reminder_instant(entry.date, preferences)?;
            Some(PlannedReminder {
                key: debt.id.clone(),
                fire_at: fire_at.timestamp_millis(),
                payload: ReminderPayload {
                    title: "Payment due".to_string(),
                    body: format!(
                        "{}: {}{:.2} due {}",
                        debt.description,
                        preferences.currency_symbol,
                        entry.amount,
                        format_naive_date(entry.date)
                    ),
                    debt_id: Some(debt.id.clone()),
                },
            })
        })
        .collect()
}

pub fn plan_pay_cycle_reminder(
    debts: &[Debt],
    preferences: &Preferences,
    today: NaiveDate,
) -> Option<PlannedReminder> {
    let quincena = next_quincena(debts, today)?;
    let fire_at = reminder_instant(quincena, preferences)?;
    let total = total_due_on(debts, quincena);

    Some(PlannedReminder {
        key: PAY_CYCLE_KEY.to_string(),
        fire_at: fire_at.timestamp_millis(),
        payload: ReminderPayload {
            title: "Payment reminder".to_string(),
            body: format!(
                "You have {}{:.2} due on {}. Open the app to send the reminder message.",
                preferences.currency_symbol,
                total,
                format_naive_date(quincena)
            ),
            debt_id: None,
        },
    })
}

#[cfg(feature = "desktop")]
pub struct WebviewNotifier {
    app: tauri::AppHandle,
}

#[cfg(feature = "desktop")]
impl WebviewNotifier {
    pub fn new(app: tauri::AppHandle) -> Self {
        Self { app }
    }
}

#[cfg(feature = "desktop")]
impl Notifier for WebviewNotifier {
    fn notify(&self, key: &str, payload: &ReminderPayload) {
        use tauri::Emitter;

        // The webview owns the notification permission and raises the alert.
        if let Err(e) = self.app.emit(
            "reminder_due",
            serde_json::json!({
                "key": key,
                "title": payload.title,
                "body": payload.body,
                "debtId": payload.debt_id,
            }),
        ) {
            log::warn!("Failed to deliver reminder {key}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::debt::{DebtKind, DebtStatus};
    use chrono::Timelike;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        fired: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, key: &str, _payload: &ReminderPayload) {
            self.fired.lock().unwrap().push(key.to_string());
        }
    }

    fn payload() -> ReminderPayload {
        ReminderPayload {
            title: "t".to_string(),
            body: "b".to_string(),
            debt_id: None,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn one_time(id: &str, due: NaiveDate) -> Debt {
        Debt {
            id: id.to_string(),
            description: id.to_string(),
            amount: 100.0,
            created_date: ymd(2024, 1, 1),
            status: DebtStatus::Pending,
            kind: DebtKind::OneTime,
            next_due_date: Some(due),
        }
    }

    #[test]
    fn reminder_fires_the_day_before_at_the_configured_hour() {
        let prefs = Preferences::default();
        let instant = reminder_instant(ymd(2024, 3, 15), &prefs).unwrap();
        assert_eq!(instant.date_naive(), ymd(2024, 3, 14));
        assert_eq!(instant.hour(), 9);
    }

    #[test]
    fn plans_skip_past_due_dates_and_target_the_next_quincena() {
        let debts = vec![
            one_time("past", ymd(2024, 1, 10)),
            one_time("rent", ymd(2024, 3, 15)),
            one_time("water", ymd(2024, 3, 20)),
        ];
        let prefs = Preferences::default();

        let planned = plan_debt_reminders(&debts, &prefs, ymd(2024, 3, 1));
        let keys: Vec<&str> = planned.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["rent", "water"]);

        let pay_cycle = plan_pay_cycle_reminder(&debts, &prefs, ymd(2024, 3, 1)).unwrap();
        assert_eq!(pay_cycle.key, PAY_CYCLE_KEY);
        assert_eq!(
            pay_cycle.fire_at,
            reminder_instant(ymd(2024, 3, 15), &prefs).unwrap().timestamp_millis()
        );
        assert!(pay_cycle.payload.body.contains("$100.00"));
    }

    #[test]
    fn past_reminders_fire_immediately_without_a_runtime() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut scheduler = ReminderScheduler::new(notifier.clone());

        assert!(scheduler.schedule("a", 0, payload()));
        assert!(!scheduler.schedule("b", i64::MAX / 2, payload()));
        assert_eq!(*notifier.fired.lock().unwrap(), vec!["a".to_string()]);
        assert!(scheduler.pending_keys().is_empty());
    }

    #[test]
    fn unavailable_notifier_is_skipped() {
        let mut scheduler = ReminderScheduler::disabled();
        assert!(!scheduler.schedule("a", 0, payload()));
    }

    #[tokio::test]
    async fn rescheduling_replaces_and_cancel_stops_timers() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut scheduler = ReminderScheduler::new(notifier.clone());
        let soon = chrono::Utc::now().timestamp_millis() + 50;
        let later = chrono::Utc::now().timestamp_millis() + 60_000;

        assert!(scheduler.schedule("debt-1", later, payload()));
        assert!(scheduler.schedule("debt-1", soon, payload()));
        assert!(scheduler.schedule("debt-2", soon, payload()));
        assert!(scheduler.cancel("debt-2"));
        assert!(!scheduler.cancel("debt-2"));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(*notifier.fired.lock().unwrap(), vec!["debt-1".to_string()]);

        assert!(scheduler.schedule(PAY_CYCLE_KEY, later, payload()));
        assert!(scheduler.is_pending(PAY_CYCLE_KEY));
        scheduler.cancel_all();
        assert!(scheduler.pending_keys().is_empty());
    }
}
