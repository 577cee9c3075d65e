// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "sqlite_support.rs"]
pub mod sqlite_support;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "audit/mod.rs"]
pub mod audit;

#[path = "rate_limit/mod.rs"]
pub mod rate_limit;

#[path = "backend/mod.rs"]
pub mod backend;

#[path = "identity/mod.rs"]
pub mod identity;
