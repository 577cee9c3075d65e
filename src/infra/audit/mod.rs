// Implementations of the audit log store.

#[cfg(test)]
pub mod in_memory;
pub mod sqlite_store;

#[cfg(test)]
pub use in_memory::InMemoryAuditStore;
pub use sqlite_store::SqliteAuditStore;
