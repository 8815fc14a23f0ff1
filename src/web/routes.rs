use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use time::{Duration as TimeDuration, OffsetDateTime};

use super::error::WebError;
use super::state::AppState;
use super::views;
use crate::error::Error;
use crate::session;
use crate::session::SessionUser;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route("/redirect", get(callback))
        .route("/logout", get(logout))
        .route("/dashboard", get(dashboard))
        .route("/embed-token", get(embed_token))
        .route("/trigger-pipeline", get(trigger_pipeline))
        .route("/send-email", get(send_email))
        .with_state(state)
}

// ── Landing and dashboard ──────────────────────────────────────────

async fn index(user: Option<SessionUser>) -> Response {
    if user.is_some() {
        Redirect::to("/dashboard").into_response()
    } else {
        Html(views::landing_page()).into_response()
    }
}

async fn dashboard(user: Option<SessionUser>) -> Response {
    match user {
        Some(user) => {
            Html(views::dashboard_page(&user.username, user.name.as_deref())).into_response()
        }
        None => Redirect::to("/").into_response(),
    }
}

// ── Login ──────────────────────────────────────────────────────────

async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let auth_req = state
        .identity
        .authorization_url(&state.config.reporting_scopes);

    let (pkce_cookie, state_cookie) = session::login_cookies(
        &auth_req.code_verifier,
        &auth_req.state,
        state.config.secure_cookies,
    );

    let jar = jar.add(pkce_cookie).add(state_cookie);

    (jar, Redirect::to(&auth_req.url))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), WebError> {
    if let Some(error) = params.error {
        let description = params
            .error_description
            .unwrap_or_else(|| "unknown error".into());
        tracing::warn!(error = %error, description = %description, "authorization error from provider");
        return Err(WebError::Auth(Error::Provider { error, description }));
    }

    let code = params
        .code
        .ok_or(WebError::Auth(Error::Callback("missing code")))?;

    let received_state = params
        .state
        .ok_or(WebError::Auth(Error::Callback("missing state")))?;

    let stored_state = session::get_state(&jar)
        .ok_or(WebError::Auth(Error::Callback("missing state cookie")))?;

    if received_state != stored_state {
        tracing::warn!("authorization state mismatch");
        return Err(WebError::Auth(Error::Callback("state mismatch")));
    }

    let code_verifier = session::get_pkce_verifier(&jar)
        .ok_or(WebError::Auth(Error::Callback("missing verifier cookie")))?;

    let (token, user_info) = state
        .identity
        .sign_in(&code, &code_verifier, &state.config.reporting_scopes)
        .await
        .map_err(WebError::Auth)?;

    let expires_at = token
        .expires_in
        .map(|secs| OffsetDateTime::now_utc() + TimeDuration::seconds(secs as i64));
    let username = user_info
        .preferred_username
        .or(user_info.email)
        .unwrap_or_else(|| user_info.sub.clone());

    let user = SessionUser {
        access_token: token.access_token,
        token_type: token.token_type,
        expires_at,
        account_id: user_info.sub,
        username,
        name: user_info.name,
    };

    let session_id = state
        .sessions
        .create(user)
        .await
        .map_err(WebError::Internal)?;

    let session_cookie = session::session_cookie(&session_id, state.config.secure_cookies);
    let (clear_pkce, clear_state) = session::clear_login_cookies();

    let jar = jar.add(session_cookie).add(clear_pkce).add(clear_state);

    tracing::info!("sign-in completed");

    Ok((jar, Redirect::to("/dashboard")))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    if let Some(session_id) = session::get_session_id(&jar) {
        if let Err(e) = state.sessions.delete(&session_id).await {
            tracing::warn!(error = %e, "session deletion failed during logout");
        }
    }

    let jar = jar.remove(session::clear_session_cookie());
    (jar, Redirect::to("/"))
}

// ── Report surface ─────────────────────────────────────────────────

async fn embed_token(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Response, WebError> {
    let bundle = state
        .reporting
        .generate_embed_token(&user.access_token)
        .await
        .map_err(WebError::Downstream)?;

    Ok(Json(bundle).into_response())
}

async fn trigger_pipeline(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Response, WebError> {
    state
        .reporting
        .run_pipeline(&user.access_token)
        .await
        .map_err(WebError::Downstream)?;

    Ok((StatusCode::ACCEPTED, "Pipeline run accepted").into_response())
}

async fn send_email(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Response, WebError> {
    let delivered = state
        .exporter
        .export_and_deliver(&user)
        .await
        .map_err(|e| match e {
            Error::NoCachedAccount { .. } => WebError::Auth(e),
            other => WebError::Downstream(other),
        })?;

    Ok(Html(format!(
        r#"<img src="data:image/png;base64,{}" alt="Report export"/>"#,
        delivered.png_base64
    ))
    .into_response())
}
