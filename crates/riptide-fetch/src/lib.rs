//! # riptide-fetch
//!
//! The origin client for the HLS proxy: fetches bytes from whichever
//! backend the deployment is configured for — an upstream HTTP(S) server
//! or a local filesystem root — behind one small trait so the transport
//! layer in `riptide-streaming` doesn't need to know which.
//!
//! ## Modules
//!
//! - [`http_origin`]: upstream HTTP(S) origin, Range-forwarding, TLS-verify toggle
//! - [`filesystem_origin`]: local filesystem origin with a path-traversal guard
//! - [`origin`]: the `Origin` trait and the `OriginResponse`/`OriginError` types both impls share

pub mod filesystem_origin;
pub mod http_origin;
pub mod origin;

pub use filesystem_origin::FilesystemOrigin;
pub use http_origin::HttpOrigin;
pub use origin::{Origin, OriginBody, OriginError, OriginRequest, OriginResponse};
