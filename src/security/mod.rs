//! Request guards: bearer API keys and a global rate limit.

pub mod auth;
pub mod rate_limit;
