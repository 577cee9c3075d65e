// Client for the hosted backend's REST API.

pub mod rest_client;

pub use rest_client::BackendClient;
