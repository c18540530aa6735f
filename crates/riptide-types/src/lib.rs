//! Shared types and traits for the HLS proxy.
//!
//! This crate provides common error types and backend-agnostic port traits
//! (health, traffic accounting) used across the infrastructure crates to
//! break direct dependencies on any one backend (e.g. Redis).
//!
//! ## Organization
//!
//! - `error`: the shared `RiptideError` and `Result` alias
//! - `ports`: trait definitions for dependency inversion (`HealthCheck`,
//!   `TrafficRecorder`)

pub mod error;
pub mod ports;

pub use error::{Result, RiptideError};
pub use ports::{HealthCheck, HealthRegistry, HealthStatus, NullTrafficRecorder, TrafficRecorder};
