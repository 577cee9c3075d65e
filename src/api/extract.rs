// Request extractors: bearer authentication with role checks, and the
// client address recorded on audit entries.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use super::error::ApiError;
use super::AppState;
use crate::core::identity::{Actor, IdentityError};

/// Any authenticated caller.
pub struct AuthActor(pub Actor);

/// A caller allowed to work the review queue.
pub struct ModeratorActor(pub Actor);

/// A caller with admin rights.
pub struct AdminActor(pub Actor);

fn bearer_token(headers: &HeaderMap) -> Result<&str, IdentityError> {
    let header = headers
        .get("Authorization")
        .ok_or(IdentityError::MissingCredentials)?
        .to_str()
        .map_err(|_| IdentityError::InvalidToken("authorization header is not ascii".into()))?;

    header.strip_prefix("Bearer ").ok_or_else(|| {
        IdentityError::InvalidToken("authorization header must use Bearer scheme".into())
    })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let actor = state.identity.authenticate(token).await?;
        Ok(Self(actor))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for ModeratorActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthActor(actor) = AuthActor::from_request_parts(parts, state).await?;
        if !actor.can_moderate() {
            return Err(ApiError::forbidden("moderator access required"));
        }
        Ok(Self(actor))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthActor(actor) = AuthActor::from_request_parts(parts, state).await?;
        if !actor.is_admin() {
            return Err(ApiError::forbidden("admin access required"));
        }
        Ok(Self(actor))
    }
}

/// Address of the client. `X-Forwarded-For` is honoured only when the
/// connecting peer is a configured proxy; otherwise the peer address is used.
pub struct ClientIp(pub Option<IpAddr>);

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

fn client_ip(peer: Option<IpAddr>, headers: &HeaderMap, trusted: &[IpAddr]) -> Option<IpAddr> {
    match peer {
        Some(peer) if trusted.contains(&peer) => forwarded_for(headers).or(Some(peer)),
        peer => peer,
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(Self(client_ip(peer, &parts.headers, &state.trusted_proxies)))
    }
}
