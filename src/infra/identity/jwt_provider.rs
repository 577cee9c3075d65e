// HS256 JWT verification for tokens issued by the hosted auth service.
//
// `sub` carries the user id. The app role lives in `app_metadata.role`; a
// token without one belongs to a plain user.

use crate::core::identity::{Actor, IdentityError, IdentityProvider, Role};
use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct AppMetadata {
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
    #[allow(dead_code)]
    exp: i64,
    #[serde(default)]
    app_metadata: Option<AppMetadata>,
}

pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Hosted auth sets `aud: authenticated`; we do not pin it
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<Actor, IdentityError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(IdentityError::MissingCredentials);
        }

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::InvalidToken(e.to_string()),
            }
        })?;

        let role = match data.claims.app_metadata.and_then(|m| m.role) {
            Some(role) => role.parse()?,
            None => Role::User,
        };

        Ok(Actor {
            id: data.claims.sub,
            role,
        })
    }
}
