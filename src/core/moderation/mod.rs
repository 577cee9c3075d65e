// Core moderation module - flag ingestion, review queue and dispositions.
// Following the same pattern as the audit and rate limit modules.

pub mod moderation_models;
pub mod moderation_ports;
pub mod moderation_service;

mod disposition;
mod ingestion;
mod review_queue;

#[cfg(test)]
pub mod test_support;

pub use moderation_models::*;
pub use moderation_ports::*;
pub use moderation_service::*;
