// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "audit/mod.rs"]
pub mod audit;

#[path = "rate_limit/mod.rs"]
pub mod rate_limit;

#[path = "content/mod.rs"]
pub mod content;

#[path = "identity/mod.rs"]
pub mod identity;
