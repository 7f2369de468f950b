use crate::analysis::aggregate::{filter_debts, next_quincena, summarize};
use crate::analysis::amount::{parse_amount, round_cents};
use crate::analysis::calendar::calendar_months;
use crate::analysis::dates::{advance_date, parse_ymd};
use crate::analysis::migration::{migrate_debts, repair_schedule};
use crate::analysis::schedule::{clamp_installment_count, first_unpaid, generate_installments, sync_progress};
use crate::commands::db::{RecordStore, DEBTS_KEY};
use crate::commands::messaging::{build_reminder_message, MessageComposer};
use crate::commands::reminders::{plan_debt_reminders, plan_pay_cycle_reminder, ReminderScheduler, PAY_CYCLE_KEY};
use crate::commands::settings::{
    load_preferences, load_settings, save_contact_to_store, save_preferences_to_store, save_reminder_timestamp,
};
use crate::error::DebtError;
use crate::models::debt::{Debt, DebtKind, DebtKindInput, DebtStatus, NewDebt, StatusFilter};
use crate::models::settings::{DecimalConvention, Preferences, Settings};
use crate::models::summary::{CalendarMonth, DebtSummary};
use chrono::{Local, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub type SharedSession = Arc<Mutex<DebtSession>>;

/// Owns the debt collection for the lifetime of the app. Every change swaps in
/// a new collection, mirrors it to the store and re-arms reminders.
pub struct DebtSession {
    debts: Vec<Debt>,
    settings: Settings,
    preferences: Preferences,
    store: Box<dyn RecordStore>,
    reminders: ReminderScheduler,
}

impl DebtSession {
    pub fn open(store: Box<dyn RecordStore>, reminders: ReminderScheduler) -> Self {
        let today = Local::now().date_naive();
        let settings = load_settings(store.as_ref());
        let preferences = load_preferences(store.as_ref());

        let debts = match store.get(DEBTS_KEY) {
            Ok(Some(raw)) => migrate_debts(&raw, today, preferences.decimal_convention),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to read stored debts, starting empty: {e}");
                Vec::new()
            }
        };
        log::info!("Loaded {} debts", debts.len());

        let mut session = Self {
            debts,
            settings,
            preferences,
            store,
            reminders,
        };
        // Write back whatever the migration upgraded.
        if !session.debts.is_empty() {
            session.persist_debts();
        }
        session.sync_reminders();
        session
    }

    pub fn debts(&self) -> &[Debt] {
        &self.debts
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    pub fn list(&self, filter: StatusFilter) -> Vec<Debt> {
        filter_debts(&self.debts, filter)
    }

    pub fn summary(&self, today: NaiveDate) -> DebtSummary {
        summarize(&self.debts, today, &self.preferences)
    }

    pub fn create_debt(&mut self, input: NewDebt) -> Result<Debt, DebtError> {
        let debt = build_debt(
            input,
            Local::now().date_naive(),
            self.preferences.decimal_convention,
        )?;

        let mut next = Vec::with_capacity(self.debts.len() + 1);
        next.push(debt.clone());
        next.extend(self.debts.iter().cloned());
        self.replace_debts(next);

        log::info!("Created debt {}", debt.id);
        Ok(debt)
    }

    /// Mark one installment paid. Out-of-range or already-paid indices leave
    /// everything as it was.
    pub fn mark_installment_paid(&mut self, id: &str, index: u32) -> Result<Debt, DebtError> {
        let position = self.position(id)?;
        let mut debt = self.debts[position].clone();

        let DebtKind::Installments { schedule, .. } = &mut debt.kind else {
            return Err(DebtError::Validation(format!("Debt {id} is not an installment debt")));
        };
        let Some(installment) = schedule.iter_mut().find(|installment| installment.index == index) else {
            return Ok(debt);
        };
        if installment.paid {
            return Ok(debt);
        }

        installment.paid = true;
        installment.paid_at = Some(Utc::now());
        sync_progress(&mut debt);

        self.replace_debt(position, debt.clone());
        log::info!("Installment {index} of debt {id} paid");
        Ok(debt)
    }

    /// Advance a recurring debt to its next period. Status is not touched.
    pub fn mark_recurring_paid(&mut self, id: &str) -> Result<Debt, DebtError> {
        let position = self.position(id)?;
        let mut debt = self.debts[position].clone();

        let DebtKind::Recurring { cadence } = debt.kind else {
            return Err(DebtError::Validation(format!("Debt {id} is not a recurring debt")));
        };
        let current = debt.next_due_date.unwrap_or(debt.created_date);
        debt.next_due_date = Some(advance_date(current, cadence, 1));

        self.replace_debt(position, debt.clone());
        log::info!("Recurring debt {id} advanced");
        Ok(debt)
    }

    /// Record a payment on whatever the debt owes next.
    pub fn mark_paid(&mut self, id: &str) -> Result<Debt, DebtError> {
        let position = self.position(id)?;
        let debt = self.debts[position].clone();

        match debt.kind {
            DebtKind::OneTime => Ok(self.mark_one_time_paid(position, debt)),
            DebtKind::Installments { ref schedule, .. } => {
                match first_unpaid(schedule).map(|installment| installment.index) {
                    Some(index) => self.mark_installment_paid(id, index),
                    None => Ok(debt),
                }
            }
            DebtKind::Recurring { .. } => self.mark_recurring_paid(id),
        }
    }

    fn mark_one_time_paid(&mut self, position: usize, mut debt: Debt) -> Debt {
        if debt.is_paid() {
            return debt;
        }
        debt.status = DebtStatus::Paid;
        self.replace_debt(position, debt.clone());
        log::info!("Debt {} paid", debt.id);
        debt
    }

    pub fn delete_debt(&mut self, id: &str) -> Result<(), DebtError> {
        let position = self.position(id)?;
        let next: Vec<Debt> = self
            .debts
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, debt)| debt.clone())
            .collect();
        self.replace_debts(next);

        self.reminders.cancel(id);
        log::info!("Deleted debt {id}");
        Ok(())
    }

    /// Drop every debt and the stored mirror.
    pub fn clear_all(&mut self) {
        self.debts = Vec::new();
        if let Err(e) = self.store.remove(DEBTS_KEY) {
            log::warn!("Failed to clear stored debts: {e}");
        }
        self.reminders.cancel_all();
        self.set_reminder_timestamp(None);
        log::info!("Cleared all debts");
    }

    /// Fetch a debt for display, materializing a missing schedule first.
    pub fn view_debt(&mut self, id: &str) -> Result<Debt, DebtError> {
        let position = self.position(id)?;
        let mut debt = self.debts[position].clone();
        if repair_schedule(&mut debt) {
            self.replace_debt(position, debt.clone());
        }
        Ok(debt)
    }

    pub fn debt_calendar(&mut self, id: &str, months: u32) -> Result<Vec<CalendarMonth>, DebtError> {
        let debt = self.view_debt(id)?;
        let start = debt
            .schedule()
            .first()
            .map(|installment| installment.due_date)
            .or(debt.next_due_date)
            .unwrap_or(debt.created_date);
        Ok(calendar_months(debt.schedule(), start, months.clamp(1, 24)))
    }

    pub fn set_contact(&mut self, contact_id: Option<String>) {
        let contact_id = contact_id
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty());
        if let Err(e) = save_contact_to_store(self.store.as_ref(), contact_id.as_deref()) {
            log::warn!("Failed to persist contact: {e}");
        }
        self.settings.contact_id = contact_id;
    }

    pub fn update_preferences(&mut self, incoming: serde_json::Value) -> Result<Preferences, DebtError> {
        let saved = save_preferences_to_store(self.store.as_ref(), &incoming)?;
        self.preferences = saved.clone();
        self.sync_reminders();
        Ok(saved)
    }

    pub fn reminder_message(&self, today: NaiveDate) -> String {
        build_reminder_message(
            &self.debts,
            next_quincena(&self.debts, today),
            &self.preferences.currency_symbol,
        )
    }

    /// Compose the pay-cycle message for the stored contact. A contact passed in
    /// wins and is remembered; with neither the caller has to ask the user.
    pub fn send_reminder_message(
        &mut self,
        contact_id: Option<String>,
        today: NaiveDate,
        composer: &dyn MessageComposer,
    ) -> Result<String, DebtError> {
        let supplied = contact_id
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty());
        let contact = match supplied {
            Some(contact) => {
                self.set_contact(Some(contact.clone()));
                contact
            }
            None => self.settings.contact_id.clone().ok_or(DebtError::ContactRequired)?,
        };

        let message = self.reminder_message(today);
        composer.compose(&contact, &message)?;
        Ok(message)
    }

    fn position(&self, id: &str) -> Result<usize, DebtError> {
        self.debts
            .iter()
            .position(|debt| debt.id == id)
            .ok_or_else(|| DebtError::NotFound(id.to_string()))
    }

    fn replace_debt(&mut self, position: usize, debt: Debt) {
        let mut next = self.debts.clone();
        next[position] = debt;
        self.replace_debts(next);
    }

    fn replace_debts(&mut self, next: Vec<Debt>) {
        self.debts = next;
        self.persist_debts();
        self.sync_reminders();
    }

    fn persist_debts(&self) {
        let result = serde_json::to_string(&self.debts)
            .map_err(DebtError::from)
            .and_then(|raw| self.store.set(DEBTS_KEY, &raw));
        if let Err(e) = result {
            log::warn!("Failed to persist debts, keeping in-memory state: {e}");
        }
    }

    fn set_reminder_timestamp(&mut self, timestamp: Option<i64>) {
        if self.settings.scheduled_reminder_timestamp == timestamp {
            return;
        }
        if let Err(e) = save_reminder_timestamp(self.store.as_ref(), timestamp) {
            log::warn!("Failed to persist reminder timestamp: {e}");
        }
        self.settings.scheduled_reminder_timestamp = timestamp;
    }

    /// Re-arm per-debt and pay-cycle reminders against the current collection.
    fn sync_reminders(&mut self) {
        let now = Local::now();
        let today = now.date_naive();
        let now_ms = now.timestamp_millis();

        let planned = plan_debt_reminders(&self.debts, &self.preferences, today);
        let live: HashSet<&str> = planned
            .iter()
            .filter(|plan| plan.fire_at > now_ms)
            .map(|plan| plan.key.as_str())
            .collect();

        for key in self.reminders.pending_keys() {
            if key != PAY_CYCLE_KEY && !live.contains(key.as_str()) {
                self.reminders.cancel(&key);
            }
        }
        for plan in planned.into_iter().filter(|plan| plan.fire_at > now_ms) {
            self.reminders.schedule(&plan.key, plan.fire_at, plan.payload);
        }

        match plan_pay_cycle_reminder(&self.debts, &self.preferences, today) {
            Some(plan) => {
                let already_handled = self.settings.scheduled_reminder_timestamp == Some(plan.fire_at)
                    && (plan.fire_at <= now_ms || self.reminders.is_pending(PAY_CYCLE_KEY));
                if already_handled {
                    return;
                }
                if self.reminders.schedule(PAY_CYCLE_KEY, plan.fire_at, plan.payload) {
                    self.set_reminder_timestamp(Some(plan.fire_at));
                }
            }
            None => {
                self.reminders.cancel(PAY_CYCLE_KEY);
            }
        }
    }
}

/// Validate a form submission and turn it into a debt created `today`.
pub fn build_debt(input: NewDebt, today: NaiveDate, convention: DecimalConvention) -> Result<Debt, DebtError> {
    let description = input.description.trim().to_string();
    if description.is_empty() {
        return Err(DebtError::Validation("Description is required".to_string()));
    }

    let amount = round_cents(parse_amount(&input.amount, convention));
    if amount <= 0.0 {
        return Err(DebtError::Validation("Amount must be greater than 0".to_string()));
    }

    let due_date = input.due_date.as_deref().and_then(parse_ymd);
    let cadence = input.cadence.unwrap_or_default();
    let id = uuid::Uuid::new_v4().to_string();

    let mut debt = Debt {
        id,
        description,
        amount,
        created_date: today,
        status: DebtStatus::Pending,
        kind: DebtKind::OneTime,
        next_due_date: None,
    };

    match input.kind {
        DebtKindInput::OneTime => {
            debt.status = input.status.unwrap_or_default();
            debt.next_due_date = Some(due_date.unwrap_or(today));
        }
        DebtKindInput::Installments => {
            let count = clamp_installment_count(input.installment_count.unwrap_or(1));
            debt.kind = DebtKind::Installments {
                installment_count: count,
                cadence,
                paid_count: 0,
                schedule: generate_installments(amount, count, due_date.unwrap_or(today), cadence),
            };
            sync_progress(&mut debt);
        }
        DebtKindInput::Recurring => {
            debt.kind = DebtKind::Recurring { cadence };
            debt.next_due_date = Some(due_date.unwrap_or(today));
        }
    }

    Ok(debt)
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn list_debts(
    filter: Option<StatusFilter>,
    session: tauri::State<'_, SharedSession>,
) -> Result<Vec<Debt>, String> {
    list_debts_internal(session.inner(), filter.unwrap_or_default())
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn get_summary(session: tauri::State<'_, SharedSession>) -> Result<DebtSummary, String> {
    get_summary_internal(session.inner(), Local::now().date_naive())
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn create_debt(input: NewDebt, session: tauri::State<'_, SharedSession>) -> Result<Debt, String> {
    create_debt_internal(session.inner(), input)
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn view_debt(id: String, session: tauri::State<'_, SharedSession>) -> Result<Debt, String> {
    view_debt_internal(session.inner(), &id)
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn get_debt_calendar(
    id: String,
    months: Option<u32>,
    session: tauri::State<'_, SharedSession>,
) -> Result<Vec<CalendarMonth>, String> {
    debt_calendar_internal(session.inner(), &id, months.unwrap_or(3))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn mark_installment_paid(
    id: String,
    index: u32,
    session: tauri::State<'_, SharedSession>,
) -> Result<Debt, String> {
    mark_installment_paid_internal(session.inner(), &id, index)
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn mark_paid(id: String, session: tauri::State<'_, SharedSession>) -> Result<Debt, String> {
    mark_paid_internal(session.inner(), &id)
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn delete_debt(id: String, session: tauri::State<'_, SharedSession>) -> Result<(), String> {
    delete_debt_internal(session.inner(), &id)
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn clear_all_debts(session: tauri::State<'_, SharedSession>) -> Result<(), String> {
    clear_all_debts_internal(session.inner())
}

pub fn list_debts_internal(session: &SharedSession, filter: StatusFilter) -> Result<Vec<Debt>, String> {
    let guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    Ok(guard.list(filter))
}

pub fn get_summary_internal(session: &SharedSession, today: NaiveDate) -> Result<DebtSummary, String> {
    let guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    Ok(guard.summary(today))
}

pub fn create_debt_internal(session: &SharedSession, input: NewDebt) -> Result<Debt, String> {
    let mut guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    guard.create_debt(input).map_err(|e| e.to_string())
}

pub fn view_debt_internal(session: &SharedSession, id: &str) -> Result<Debt, String> {
    let mut guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    guard.view_debt(id).map_err(|e| e.to_string())
}

pub fn debt_calendar_internal(session: &SharedSession, id: &str, months: u32) -> Result<Vec<CalendarMonth>, String> {
    let mut guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    guard.debt_calendar(id, months).map_err(|e| e.to_string())
}

pub fn mark_installment_paid_internal(session: &SharedSession, id: &str, index: u32) -> Result<Debt, String> {
    let mut guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    guard.mark_installment_paid(id, index).map_err(|e| e.to_string())
}

pub fn mark_paid_internal(session: &SharedSession, id: &str) -> Result<Debt, String> {
    let mut guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    guard.mark_paid(id).map_err(|e| e.to_string())
}

pub fn delete_debt_internal(session: &SharedSession, id: &str) -> Result<(), String> {
    let mut guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    guard.delete_debt(id).map_err(|e| e.to_string())
}

pub fn clear_all_debts_internal(session: &SharedSession) -> Result<(), String> {
    let mut guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    guard.clear_all();
    Ok(())
}
