// Core identity module - who is calling, and with which role.

pub mod identity_ports;

pub use identity_ports::*;
