//! Riptide Utils - Shared ambient utilities for the HLS proxy.
//!
//! - **HTTP**: HTTP client factory with connection pooling, used for both
//!   the origin client and the traffic report sink client.
//! - **Retry**: Retry policies with exponential backoff.
//! - **Circuit Breaker**: Lock-free circuit breaker for origin fault tolerance.
//! - **Time**: Timestamp conversions.
//! - **Error**: Common error types and result aliases.
//! - **Health registry**: in-memory registry of named health checks, backing `/health`.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod circuit_breaker;
pub mod error;
pub mod health_registry;
pub mod http;
pub mod retry;
pub mod time;

// Re-export commonly used types
pub use circuit_breaker::{CircuitBreaker, Config as CircuitBreakerConfig, State as CircuitState};
pub use error::{Error, Result};
pub use health_registry::InMemoryHealthRegistry;
pub use http::{HttpClientFactory, HttpConfig};
pub use retry::RetryPolicy;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        // Test that all modules are accessible
        let _ = HttpConfig::default();
        let _ = RetryPolicy::default();
        let _ = InMemoryHealthRegistry::new();
    }
}
