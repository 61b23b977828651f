pub mod config;
pub mod reports;
pub mod types;
