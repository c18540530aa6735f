//! Request authorization: HMAC token verification and the nine-step
//! pipeline built on top of it.

pub mod pipeline;
pub mod token;

pub use pipeline::{authorize, Allowed, AuthOutcome, AuthRequest, TokenParams};
