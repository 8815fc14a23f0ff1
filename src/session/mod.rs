//! Session state for signed-in users.
//!
//! Sessions are ephemeral: created at authorization-callback time, read-only
//! afterwards, destroyed on logout, gone on process restart. The store is a
//! trait seam so tests and deployments can swap the backing map; the default
//! is an in-memory map keyed by a random session id carried in an encrypted
//! cookie. There is no ambient global session — handlers reach sessions only
//! through the store handle in the router state.

mod cookies;
mod extractor;
mod store;

pub use store::{InMemorySessionStore, SessionStore, SessionUser};

pub(crate) use cookies::{
    clear_login_cookies, clear_session_cookie, get_pkce_verifier, get_session_id, get_state,
    login_cookies, session_cookie,
};
