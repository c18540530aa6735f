//! Port interfaces for dependency inversion
//!
//! This module provides backend-agnostic trait definitions that enable
//! dependency inversion and facilitate testing. Concrete implementations
//! are provided in their respective infrastructure crates.

pub mod health;
pub mod traffic;

// Re-export for convenience
pub use health::{HealthCheck, HealthRegistry, HealthStatus};
pub use traffic::{NullTrafficRecorder, TrafficRecorder};
