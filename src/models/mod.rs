pub mod debt;
pub mod settings;
pub mod summary;
