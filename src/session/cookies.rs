use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::PrivateCookieJar;
use time::Duration;

const PKCE_COOKIE_NAME: &str = "__reportdeck_pkce";
const STATE_COOKIE_NAME: &str = "__reportdeck_state";
const SESSION_COOKIE_NAME: &str = "__reportdeck_session";

/// Path of the authorization callback route; the login cookies are only ever
/// read there.
const CALLBACK_PATH: &str = "/redirect";

/// Create the PKCE verifier + state cookies for the authorization redirect.
pub(crate) fn login_cookies(
    code_verifier: &str,
    state: &str,
    secure: bool,
) -> (Cookie<'static>, Cookie<'static>) {
    let verifier = Cookie::build((PKCE_COOKIE_NAME, code_verifier.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(CALLBACK_PATH)
        .max_age(Duration::minutes(5))
        .build();

    let state = Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(CALLBACK_PATH)
        .max_age(Duration::minutes(5))
        .build();

    (verifier, state)
}

/// Create removal cookies for the PKCE verifier + state.
pub(crate) fn clear_login_cookies() -> (Cookie<'static>, Cookie<'static>) {
    let verifier = Cookie::build((PKCE_COOKIE_NAME, ""))
        .path(CALLBACK_PATH)
        .max_age(Duration::ZERO)
        .build();

    let state = Cookie::build((STATE_COOKIE_NAME, ""))
        .path(CALLBACK_PATH)
        .max_age(Duration::ZERO)
        .build();

    (verifier, state)
}

/// Create the session cookie.
///
/// No max-age: the cookie lives with the browser session, like the session
/// record itself lives with the process.
pub(crate) fn session_cookie(session_id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Create the removal cookie for the session.
pub(crate) fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

pub(crate) fn get_pkce_verifier(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(PKCE_COOKIE_NAME).map(|c| c.value().to_string())
}

pub(crate) fn get_state(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}

pub(crate) fn get_session_id(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string())
}
