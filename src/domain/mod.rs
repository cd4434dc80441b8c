//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod exact;
pub mod ledger;
pub mod metrics;
pub mod policy;
pub mod price_series;
pub mod sentiment;
