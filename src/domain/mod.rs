pub mod models;
pub mod reminder;
pub mod settings;
