//! # riptide-reliability
//!
//! Fault-tolerance primitives shared by the origin client and the
//! streaming transport.
//!
//! - [`circuit_breaker`]: re-exported from `riptide-utils`, the lock-free
//!   three-state breaker both `riptide-fetch`'s `HttpOrigin` and the
//!   traffic report sink gate their outbound calls through.
//! - [`timeout`]: a minimal fixed-deadline wrapper around
//!   `tokio::time::timeout` for the proxy's single configurable
//!   `HTTP_TOTAL_TIMEOUT` ceiling — no per-domain learning curve.
//!
//! This crate has no dependency on `riptide-fetch`; `riptide-streaming`
//! depends on both without either depending on the other.
//!
//! ```rust,ignore
//! use riptide_reliability::circuit_breaker::{CircuitBreaker, Config, RealClock};
//! use std::sync::Arc;
//!
//! let cb = CircuitBreaker::new(Config::default(), Arc::new(RealClock));
//! match cb.try_acquire() {
//!     Ok(_permit) => cb.on_success(),
//!     Err(_) => { /* circuit open, fail fast */ }
//! }
//! ```

pub mod timeout;

pub use riptide_utils::circuit_breaker;
pub use riptide_utils::circuit_breaker::{
    guarded_call, CircuitBreaker, Clock, Config as CircuitConfig, RealClock, State,
};
pub use timeout::{with_deadline, DeadlineExceeded};
