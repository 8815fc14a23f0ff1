use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use crate::error::Error;

/// Web-facing error mapping.
///
/// Unauthenticated browsers are redirected to the landing page to sign in;
/// authentication failures answer a generic 500 without leaking provider
/// detail; downstream API failures answer 502. Every branch logs the full
/// error before the response is rendered.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// No valid session.
    #[error("not signed in")]
    Unauthenticated,

    /// Token acquisition failed (code exchange, userinfo, or silent path).
    #[error("authentication failed: {0}")]
    Auth(#[source] Error),

    /// A reporting, pipeline, export, or mail call failed.
    #[error("downstream service failure: {0}")]
    Downstream(#[source] Error),

    /// Session store failure.
    #[error("internal error: {0}")]
    Internal(#[source] Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => Redirect::to("/").into_response(),
            Self::Auth(ref e) => {
                tracing::error!(error = %e, "authentication failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error acquiring token").into_response()
            }
            Self::Downstream(ref e) => {
                tracing::error!(error = %e, "downstream API failure");
                (StatusCode::BAD_GATEWAY, "Upstream service error").into_response()
            }
            Self::Internal(ref e) => {
                tracing::error!(error = %e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
