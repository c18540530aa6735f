//! Router-level middleware.

pub mod admin_auth;

pub use admin_auth::require_admin_key;
