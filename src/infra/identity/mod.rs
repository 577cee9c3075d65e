// Verification of tokens issued by the hosted auth service.

pub mod jwt_provider;

pub use jwt_provider::JwtIdentityProvider;
