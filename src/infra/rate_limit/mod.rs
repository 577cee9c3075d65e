// Implementations of the rate limit event store.

#[cfg(test)]
pub mod in_memory;
pub mod sqlite_store;

#[cfg(test)]
pub use in_memory::InMemoryRateLimitStore;
pub use sqlite_store::SqliteRateLimitStore;
