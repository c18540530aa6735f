//! HTTP handlers, one module per route group in the endpoint table (§6.1).

pub mod access_logs;
pub mod file_check;
pub mod health;
pub mod monitor;
pub mod stats;
pub mod stream;
pub mod whitelist;
