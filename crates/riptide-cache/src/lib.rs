//! # riptide-cache
//!
//! Redis-backed state for the HLS proxy: token-bound sessions, the
//! path-bound and static-file whitelist tables, the adaptive m3u8 access
//! counter, and the bounded access-log ring buffers. Everything here shares
//! one [`redis_manager::RedisHandle`] and leans on `redis::Script` for the
//! read-modify-write sequences that need to be atomic.
//!
//! ## Modules
//!
//! - [`redis_manager`]: shared connection handle and error conversion
//! - [`sessions`]: session bind/lookup/renew
//! - [`whitelist`]: path-bound and static-file whitelist tables with FIFO eviction
//! - [`m3u8`]: adaptive playlist access counter
//! - [`access_log`]: bounded denied/recent request logs
//! - [`cidr`]: IP canonicalization and CIDR matching shared by whitelist and config
//! - [`hashing`]: short stable hashes used to build Redis key fragments

pub mod access_log;
pub mod cidr;
pub mod hashing;
pub mod m3u8;
pub mod redis_manager;
pub mod sessions;
pub mod whitelist;

pub use access_log::{AccessLogEntry, AccessLogStore};
pub use m3u8::{AccessDecision, M3u8AccessCounter};
pub use redis_manager::RedisHandle;
pub use sessions::{SessionRecord, SessionStore};
pub use whitelist::{Namespace, PathEntry, UidPair, WhitelistEntry, WhitelistStore};

/// Default Redis key TTL applied where a store doesn't compute its own (seconds).
pub const DEFAULT_TTL: u64 = 3600;
