pub mod aggregator;
pub mod billing;
pub mod config;
pub mod cost;
pub mod error;
pub mod export;
pub mod formatter;
pub mod models;
pub mod month;
pub mod providers;
