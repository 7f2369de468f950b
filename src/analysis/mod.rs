pub mod aggregate;
pub mod amount;
pub mod calendar;
pub mod dates;
pub mod migration;
pub mod schedule;
