/// Shared pipeline modules for the arbitrage scanner
pub mod batcher;
pub mod config;
pub mod error;
pub mod history;
pub mod ledger;
pub mod preferences;
pub mod registry;
pub mod scheduler;
pub mod spreads;
pub mod types;
pub mod websocket;
