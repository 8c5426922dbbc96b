//! Request extractors for the session token.
//!
//! Clients send the token returned by login as `Authorization: Bearer <token>`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::auth::Session;

/// The bearer token, if the request carries one.
///
/// Never rejects; handlers that work for anonymous callers use this.
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    fn from_parts(parts: &Parts) -> Option<String> {
        let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Self::from_parts(parts)))
    }
}

/// Extractor that requires a live session.
///
/// Rejects with `401 LOGIN_REQUIRED` when the token is missing or unknown.
///
/// ```rust,ignore
/// async fn handler(RequireSession(session): RequireSession) -> String {
///     session.email.clone()
/// }
/// ```
pub struct RequireSession(pub Arc<Session>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = BearerToken::from_parts(parts);
        let session = state.sessions.require(token.as_deref()).await?;
        Ok(Self(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn token(header: Option<&str>) -> Option<String> {
        let mut builder = Request::builder().uri("/api/v1/meals");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        BearerToken::from_parts(&parts)
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(token(Some("Bearer abc")).as_deref(), Some("abc"));
        assert_eq!(token(Some("bearer  abc ")).as_deref(), Some("abc"));
        assert_eq!(token(Some("Basic abc")), None);
        assert_eq!(token(Some("Bearer ")), None);
        assert_eq!(token(None), None);
    }
}
