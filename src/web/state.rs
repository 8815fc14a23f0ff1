use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::config::AppConfig;
use crate::export::ExportOrchestrator;
use crate::identity::IdentityClient;
use crate::mail::MailClient;
use crate::reporting::ReportingClient;
use crate::session::{InMemorySessionStore, SessionStore};

/// Shared state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityClient>,
    pub reporting: Arc<ReportingClient>,
    pub exporter: Arc<ExportOrchestrator>,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build the state with the in-memory session store, sharing one HTTP
    /// connection pool across all clients.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self::with_session_store(config, Arc::new(InMemorySessionStore::new()))
    }

    /// Build the state with a custom session store.
    #[must_use]
    pub fn with_session_store(config: AppConfig, sessions: Arc<dyn SessionStore>) -> Self {
        let http = reqwest::Client::new();
        let identity = Arc::new(IdentityClient::new(&config, http.clone()));
        let reporting = Arc::new(ReportingClient::new(&config, http.clone()));
        let mail = Arc::new(MailClient::new(&config, http));
        let exporter = Arc::new(ExportOrchestrator::new(
            &config,
            identity.clone(),
            reporting.clone(),
            mail,
        ));

        Self {
            identity,
            reporting,
            exporter,
            sessions,
            config: Arc::new(config),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.config.cookie_key.clone()
    }
}
