// Core content module - ports onto the hosted backend.

pub mod content_ports;

pub use content_ports::*;
