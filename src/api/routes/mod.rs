// HTTP handlers, one file per caller group.

pub mod admin;
pub mod classifier;
pub mod health;
pub mod reports;
