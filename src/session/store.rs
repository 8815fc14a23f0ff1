use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::Error;

/// The signed-in user's token-acquisition result, as held by the session.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: Option<OffsetDateTime>,
    /// Stable account identifier (OIDC `sub`), the key for silent
    /// token acquisition.
    pub account_id: String,
    /// Sign-in name shown on the dashboard.
    pub username: String,
    /// Display name, when the provider supplied one.
    pub name: Option<String>,
}

/// Session persistence seam.
///
/// The in-memory implementation backs production and tests alike here; a
/// deployment needing sessions to survive restarts supplies its own store.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Create a session. Returns the new session id.
    async fn create(&self, user: SessionUser) -> Result<String, Error>;

    /// Look up a session by id.
    async fn find(&self, session_id: &str) -> Result<Option<SessionUser>, Error>;

    /// Delete a session. Deleting an unknown id is not an error.
    async fn delete(&self, session_id: &str) -> Result<(), Error>;
}

/// In-memory session map keyed by random session id.
///
/// Concurrent writes to one session are last-write-wins.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionUser>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, user: SessionUser) -> Result<String, Error> {
        let session_id = generate_session_id();
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), user);
        Ok(session_id)
    }

    async fn find(&self, session_id: &str) -> Result<Option<SessionUser>, Error> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<(), Error> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}

/// Random, URL-safe session identifier (32 bytes of entropy).
fn generate_session_id() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
