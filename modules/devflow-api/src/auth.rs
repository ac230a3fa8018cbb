use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderName},
};
use tracing::debug;

use devflow_common::Actor;

use crate::jwt::{parse_auth_cookie, parse_bearer};
use crate::AppState;

/// The caller's identity, if the request carries a valid token.
///
/// Never rejects: actions decide whether an anonymous caller is allowed.
/// The bearer header wins over the `auth_token` cookie.
pub struct MaybeActor(pub Option<Actor>);

impl MaybeActor {
    pub fn actor(&self) -> Option<&Actor> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<Arc<AppState<S>>> for MaybeActor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = request_token(parts) else {
            return Ok(MaybeActor(None));
        };

        let actor = match state.jwt.verify_token(token).and_then(|c| c.actor()) {
            Ok(actor) => Some(actor),
            Err(e) => {
                debug!(error = %e, "Ignoring invalid auth token");
                None
            }
        };
        Ok(MaybeActor(actor))
    }
}

fn request_token(parts: &Parts) -> Option<&str> {
    let value_of = |name: HeaderName| parts.headers.get(name).and_then(|v| v.to_str().ok());

    value_of(header::AUTHORIZATION)
        .and_then(parse_bearer)
        .or_else(|| value_of(header::COOKIE).and_then(parse_auth_cookie))
}
