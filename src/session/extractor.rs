use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;

use super::cookies;
use super::store::SessionUser;
use crate::web::error::WebError;
use crate::web::state::AppState;

/// Axum extractor: the signed-in user from the session cookie.
///
/// Rejection redirects to the landing page rather than answering an error —
/// unauthenticated browsers are sent to sign in, not shown a failure.
/// Use `Option<SessionUser>` on routes that serve both signed-in and
/// anonymous visitors.
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| WebError::Unauthenticated)?;

        let session_id = cookies::get_session_id(&jar).ok_or(WebError::Unauthenticated)?;

        state
            .sessions
            .find(&session_id)
            .await
            .map_err(WebError::Internal)?
            .ok_or(WebError::Unauthenticated)
    }
}

impl OptionalFromRequestParts<AppState> for SessionUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(
            <Self as FromRequestParts<AppState>>::from_request_parts(parts, state)
                .await
                .ok(),
        )
    }
}
