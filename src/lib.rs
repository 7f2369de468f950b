pub mod analysis;
pub mod commands;
pub mod error;
pub mod models;

#[cfg(feature = "desktop")]
use commands::{
    db::SqliteStore,
    debts::{
        clear_all_debts, create_debt, delete_debt, get_debt_calendar, get_summary, list_debts, mark_installment_paid,
        mark_paid, view_debt, DebtSession,
    },
    messaging::{preview_reminder_message, send_reminder_message},
    reminders::{ReminderScheduler, WebviewNotifier},
    settings::{get_preferences, get_settings, save_contact, save_preferences},
};

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::{Arc, Mutex};
    use tauri::Manager;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            std::fs::create_dir_all(&data_dir)?;
            let store = SqliteStore::open(data_dir.join("debts.db"))?;

            let runtime = tauri::async_runtime::block_on(async { tokio::runtime::Handle::current() });
            let notifier = Arc::new(WebviewNotifier::new(app.handle().clone()));
            let reminders = ReminderScheduler::with_runtime(notifier, runtime);

            let session = DebtSession::open(Box::new(store), reminders);
            app.manage(Arc::new(Mutex::new(session)));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            list_debts,
            get_summary,
            create_debt,
            view_debt,
            get_debt_calendar,
            mark_installment_paid,
            mark_paid,
            delete_debt,
            clear_all_debts,
            get_settings,
            save_contact,
            get_preferences,
            save_preferences,
            preview_reminder_message,
            send_reminder_message,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
