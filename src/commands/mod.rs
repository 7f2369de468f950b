pub mod db;
pub mod debts;
pub mod messaging;
pub mod reminders;
pub mod settings;
