// Core rate limiting module.

pub mod rate_limiter;

pub use rate_limiter::*;
