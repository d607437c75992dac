//! Axum extractors for authenticated callers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::{errmsg, Error};
use crate::http::AppState;

use super::Identity;

/// Pull the bearer token out of the Authorization header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| Error::Authentication(errmsg::NO_TOKEN.to_string()))?;
        state.tokens.verify(token)
    }
}

/// An authenticated caller that must hold the operator role.
pub struct Operator(pub Identity);

impl FromRequestParts<AppState> for Operator {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        if !identity.is_operator() {
            return Err(Error::Authorization(errmsg::ADMIN_ONLY.to_string()));
        }
        Ok(Operator(identity))
    }
}
