pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod types;

// Ports the engine depends on, and their HTTP/tokio implementations
pub mod app;
pub mod infra;

pub mod ingestion;
