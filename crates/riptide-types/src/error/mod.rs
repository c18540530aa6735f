//! Error types shared across the proxy's infrastructure crates.
//!
//! `RiptideError` is the common error currency between `riptide-cache`,
//! `riptide-fetch`, and `riptide-reliability`; `riptide-api` converts it
//! into its own `ApiError` at the HTTP boundary.

pub mod riptide_error;

pub use riptide_error::{Result, RiptideError};
