use chrono::NaiveDate;
use debt_tracker_lib::commands::db::{RecordStore, SqliteStore, DEBTS_KEY, REMINDER_TIMESTAMP_KEY};
use debt_tracker_lib::commands::debts::{
    clear_all_debts_internal, create_debt_internal, debt_calendar_internal, delete_debt_internal,
    get_summary_internal, list_debts_internal, mark_installment_paid_internal, mark_paid_internal,
    view_debt_internal, DebtSession, SharedSession,
};
use debt_tracker_lib::commands::messaging::{
    preview_reminder_message_internal, send_reminder_message_internal, MessageComposer,
};
use debt_tracker_lib::commands::reminders::{Notifier, ReminderPayload, ReminderScheduler, PAY_CYCLE_KEY};
use debt_tracker_lib::commands::settings::{
    get_preferences_internal, get_settings_internal, save_contact_internal, save_preferences_internal,
};
use debt_tracker_lib::error::DebtError;
use debt_tracker_lib::models::debt::{Cadence, DebtKindInput, DebtStatus, NewDebt, StatusFilter};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn create_data_dir() -> (TempDir, PathBuf) {
    init_logging();
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let db_path = temp_dir.path().join("debts.db");
    (temp_dir, db_path)
}

fn open_session(db_path: &Path) -> SharedSession {
    let store = SqliteStore::open(db_path).expect("open store");
    Arc::new(Mutex::new(DebtSession::open(
        Box::new(store),
        ReminderScheduler::disabled(),
    )))
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn one_time(description: &str, amount: serde_json::Value, due: Option<&str>) -> NewDebt {
    NewDebt {
        description: description.to_string(),
        amount,
        due_date: due.map(str::to_string),
        ..NewDebt::default()
    }
}

#[derive(Default)]
struct RecordingComposer {
    sent: Mutex<Vec<(String, String)>>,
}

impl MessageComposer for RecordingComposer {
    fn compose(&self, contact: &str, message: &str) -> Result<(), DebtError> {
        self.sent
            .lock()
            .expect("composer lock")
            .push((contact.to_string(), message.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    fired: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, key: &str, _payload: &ReminderPayload) {
        self.fired.lock().expect("notifier lock").push(key.to_string());
    }
}

#[test]
fn one_time_debt_defaults_and_counts_toward_outstanding() {
    let (_tmp, db_path) = create_data_dir();
    let session = open_session(&db_path);

    let before = get_summary_internal(&session, ymd(2024, 1, 1)).expect("summary");
    let rent = create_debt_internal(&session, one_time("Rent", json!(500), None)).expect("create rent");

    assert_eq!(rent.next_due_date, Some(rent.created_date));
    assert_eq!(rent.status, DebtStatus::Pending);

    let after = get_summary_internal(&session, ymd(2024, 1, 1)).expect("summary");
    assert_eq!(after.total_outstanding - before.total_outstanding, 500.0);
    assert_eq!(after.debt_count, 1);
}

#[test]
fn installment_schedule_contract() {
    let (_tmp, db_path) = create_data_dir();
    let session = open_session(&db_path);

    let loan = create_debt_internal(
        &session,
        NewDebt {
            description: "Laptop".to_string(),
            amount: json!("300"),
            due_date: Some("2024-01-15".to_string()),
            kind: DebtKindInput::Installments,
            installment_count: Some(3),
            cadence: Some(Cadence::Monthly),
            ..NewDebt::default()
        },
    )
    .expect("create installments");

    let schedule: Vec<(u32, NaiveDate, f64)> = loan
        .schedule()
        .iter()
        .map(|i| (i.index, i.due_date, i.amount))
        .collect();
    assert_eq!(
        schedule,
        vec![
            (1, ymd(2024, 1, 15), 100.0),
            (2, ymd(2024, 2, 15), 100.0),
            (3, ymd(2024, 3, 15), 100.0),
        ]
    );

    let paid = mark_installment_paid_internal(&session, &loan.id, 1).expect("pay first");
    assert_eq!(paid.next_due_date, Some(ymd(2024, 2, 15)));

    let summary = get_summary_internal(&session, ymd(2024, 1, 20)).expect("summary");
    assert_eq!(summary.total_outstanding, 200.0);
    assert_eq!(summary.next_due_date, Some(ymd(2024, 2, 15)));
    assert_eq!(summary.next_due_amount, 100.0);
    assert_eq!(summary.next_quincena, Some(ymd(2024, 2, 15)));

    mark_paid_internal(&session, &loan.id).expect("pay second");
    let done = mark_paid_internal(&session, &loan.id).expect("pay third");
    assert_eq!(done.status, DebtStatus::Paid);

    let paid_only = list_debts_internal(&session, StatusFilter::Paid).expect("list paid");
    assert_eq!(paid_only.len(), 1);
    assert!(list_debts_internal(&session, StatusFilter::Pending)
        .expect("list pending")
        .is_empty());
}

#[test]
fn validation_errors_leave_state_unchanged() {
    let (_tmp, db_path) = create_data_dir();
    let session = open_session(&db_path);

    let err = create_debt_internal(&session, one_time("", json!(10), None)).expect_err("blank description");
    assert!(err.contains("Description"));
    let err = create_debt_internal(&session, one_time("Rent", json!("0"), None)).expect_err("zero amount");
    assert!(err.contains("Amount"));

    assert!(list_debts_internal(&session, StatusFilter::All).expect("list").is_empty());
    assert!(mark_paid_internal(&session, "missing").is_err());
}

#[test]
fn state_survives_reload_and_legacy_records_are_upgraded() {
    let (_tmp, db_path) = create_data_dir();
    {
        let store = SqliteStore::open(&db_path).expect("open store");
        let legacy = json!([
            {
                "id": "legacy-loan",
                "description": "Phone",
                "amount": 90,
                "createdDate": "2024-04-01",
                "status": "pending",
                "kind": "installments",
                "installmentCount": 3,
                "nextDueDate": "2024-05-01"
            },
            {
                "id": 1700000000000u64,
                "descripcion": "Renta",
                "monto": "$1,234.50",
                "fecha": "2024-05-15",
                "estado": "pendiente",
                "creadaEn": "2024-04-02T18:22:11.000Z"
            }
        ]);
        store.set(DEBTS_KEY, &legacy.to_string()).expect("seed legacy data");
    }

    let session = open_session(&db_path);
    let loan = view_debt_internal(&session, "legacy-loan").expect("view legacy loan");
    assert_eq!(loan.schedule().len(), 3);
    assert!(loan.schedule().iter().all(|i| i.amount == 30.0));
    assert_eq!(loan.schedule()[0].due_date, ymd(2024, 5, 1));

    let calendar = debt_calendar_internal(&session, "legacy-loan", 3).expect("calendar");
    let keys: Vec<&str> = calendar.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, vec!["2024-05", "2024-06", "2024-07"]);

    mark_installment_paid_internal(&session, "legacy-loan", 1).expect("pay");
    drop(session);

    let reopened = open_session(&db_path);
    let debts = list_debts_internal(&reopened, StatusFilter::All).expect("list");
    assert_eq!(debts.len(), 2);
    assert!(debts[0].schedule()[0].paid);
    assert_eq!(debts[1].amount, 1234.5);

    let summary = get_summary_internal(&reopened, ymd(2024, 5, 2)).expect("summary");
    assert_eq!(summary.total_outstanding, 60.0 + 1234.5);
}

#[test]
fn delete_and_clear_all_empty_the_mirror() {
    let (_tmp, db_path) = create_data_dir();
    let session = open_session(&db_path);

    let rent = create_debt_internal(&session, one_time("Rent", json!(500), None)).expect("create");
    create_debt_internal(&session, one_time("Water", json!(20), None)).expect("create");

    delete_debt_internal(&session, &rent.id).expect("delete");
    assert_eq!(list_debts_internal(&session, StatusFilter::All).expect("list").len(), 1);

    clear_all_debts_internal(&session).expect("clear");
    drop(session);

    let store = SqliteStore::open(&db_path).expect("reopen store");
    assert_eq!(store.get(DEBTS_KEY).expect("read"), None);
    let reopened = open_session(&db_path);
    assert!(list_debts_internal(&reopened, StatusFilter::All).expect("list").is_empty());
}

#[test]
fn reminder_message_requires_a_contact_then_remembers_it() {
    let (_tmp, db_path) = create_data_dir();
    let session = open_session(&db_path);
    let composer = RecordingComposer::default();

    create_debt_internal(&session, one_time("Rent", json!(500), Some("2024-03-15"))).expect("create");
    create_debt_internal(&session, one_time("Water", json!("20,50"), Some("2024-03-15"))).expect("create");
    create_debt_internal(&session, one_time("Phone", json!(30), Some("2024-03-30"))).expect("create");

    let preview = preview_reminder_message_internal(&session, ymd(2024, 3, 1)).expect("preview");
    assert!(preview.starts_with("Payment reminder for 2024-03-15:"));
    assert!(preview.contains("- Water: $20.50"));
    assert!(preview.ends_with("Total: $520.50"));
    assert!(!preview.contains("Phone"));

    let err = send_reminder_message_internal(&session, None, ymd(2024, 3, 1), &composer)
        .expect_err("contact required");
    assert!(err.contains("contact"));
    assert!(composer.sent.lock().expect("lock").is_empty());

    send_reminder_message_internal(&session, Some("5213312345678".to_string()), ymd(2024, 3, 1), &composer)
        .expect("send with supplied contact");
    send_reminder_message_internal(&session, None, ymd(2024, 3, 1), &composer).expect("send with stored contact");

    let sent = composer.sent.lock().expect("lock");
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(contact, _)| contact == "5213312345678"));

    let settings = get_settings_internal(&session).expect("settings");
    assert_eq!(settings.contact_id.as_deref(), Some("5213312345678"));

    let cleared = save_contact_internal(&session, Some(String::new())).expect("clear contact");
    assert_eq!(cleared.contact_id, None);
}

#[test]
fn preferences_round_trip_and_merge_partial_updates() {
    let (_tmp, db_path) = create_data_dir();
    let session = open_session(&db_path);

    let initial = get_preferences_internal(&session).expect("load preferences");
    assert_eq!(initial.reminder_hour, 9);

    let saved = save_preferences_internal(&session, json!({ "reminderHour": 20, "currencySymbol": "€" }))
        .expect("save preferences");
    assert_eq!(saved.reminder_hour, 20);
    assert_eq!(saved.currency_symbol, "€");
    assert_eq!(saved.reminder_lead_days, initial.reminder_lead_days);

    drop(session);
    let reopened = open_session(&db_path);
    assert_eq!(get_preferences_internal(&reopened).expect("reload"), saved);
}

#[tokio::test]
async fn pay_cycle_reminder_is_armed_and_recorded() {
    let (_tmp, db_path) = create_data_dir();
    let notifier = Arc::new(RecordingNotifier::default());
    let store = SqliteStore::open(&db_path).expect("open store");
    let session: SharedSession = Arc::new(Mutex::new(DebtSession::open(
        Box::new(store),
        ReminderScheduler::new(notifier.clone()),
    )));

    // Far enough ahead that the reminder instant is always in the future.
    let today = chrono::Local::now().date_naive();
    let due = NaiveDate::from_ymd_opt(chrono::Datelike::year(&today) + 1, 6, 15).expect("valid date");
    let due_str = due.format("%Y-%m-%d").to_string();
    let rent = create_debt_internal(&session, one_time("Rent", json!(500), Some(&due_str))).expect("create");

    {
        let guard = session.lock().expect("session lock");
        assert!(guard.reminders().is_pending(PAY_CYCLE_KEY));
        assert!(guard.reminders().is_pending(&rent.id));
        assert!(guard.settings().scheduled_reminder_timestamp.is_some());
    }

    let store = SqliteStore::open(&db_path).expect("second connection");
    assert!(store.get(REMINDER_TIMESTAMP_KEY).expect("read").is_some());

    mark_paid_internal(&session, &rent.id).expect("pay");
    {
        let guard = session.lock().expect("session lock");
        assert!(!guard.reminders().is_pending(&rent.id));
        assert!(!guard.reminders().is_pending(PAY_CYCLE_KEY));
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(notifier.fired.lock().expect("lock").is_empty());
}
