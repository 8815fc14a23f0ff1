use std::time::Duration;

use axum_extra::extract::cookie::Key;
use url::Url;

use crate::error::Error;

/// Application configuration, loaded once at startup.
///
/// Required fields are constructor parameters — no runtime "missing field"
/// errors. Everything else defaults to the production endpoints and the
/// sample workspace, and can be overridden with `with_*` methods or the
/// matching `REPORTDECK_*` environment variable.
///
/// No identifier or endpoint lives anywhere in request-handling code; the
/// handlers only ever see this structure.
#[derive(Clone)]
pub struct AppConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) redirect_uri: Url,
    pub(crate) authority: Url,
    pub(crate) userinfo_url: Url,
    pub(crate) reporting_base: Url,
    pub(crate) pipeline_base: Url,
    pub(crate) embed_base: Url,
    pub(crate) graph_base: Url,
    pub(crate) workspace_id: String,
    pub(crate) report_id: String,
    pub(crate) pipeline_item_id: String,
    pub(crate) report_recipient: String,
    pub(crate) export_page: String,
    pub(crate) export_visual: String,
    pub(crate) reporting_scopes: Vec<String>,
    pub(crate) mail_scopes: Vec<String>,
    pub(crate) listen_port: u16,
    pub(crate) poll_interval: Duration,
    pub(crate) poll_max_attempts: u32,
    pub(crate) cookie_key: Key,
    pub(crate) secure_cookies: bool,
}

impl AppConfig {
    /// Create a configuration with the required credentials and defaults for
    /// everything else.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            authority: "https://login.microsoftonline.com/common"
                .parse()
                .expect("valid default URL"),
            userinfo_url: "https://graph.microsoft.com/oidc/userinfo"
                .parse()
                .expect("valid default URL"),
            reporting_base: "https://api.powerbi.com/v1.0/myorg"
                .parse()
                .expect("valid default URL"),
            pipeline_base: "https://api.fabric.microsoft.com/v1"
                .parse()
                .expect("valid default URL"),
            embed_base: "https://app.powerbi.com/reportEmbed"
                .parse()
                .expect("valid default URL"),
            graph_base: "https://graph.microsoft.com/v1.0"
                .parse()
                .expect("valid default URL"),
            workspace_id: "6be6316e-d8e9-4751-84c3-34c6eebab80f".into(),
            report_id: "1c0eaa4e-059d-434c-a1de-c1a32bbd66a0".into(),
            pipeline_item_id: "8f0c2c4e-7a34-4d12-9f4b-2f1e8d6a5c03".into(),
            report_recipient: "reports@example.com".into(),
            export_page: "ReportSection".into(),
            export_visual: "VisualContainer1".into(),
            reporting_scopes: vec![
                "https://analysis.windows.net/powerbi/api/.default".into(),
                "openid".into(),
                "profile".into(),
                "offline_access".into(),
            ],
            mail_scopes: vec!["https://graph.microsoft.com/Mail.Send".into()],
            listen_port: 3456,
            poll_interval: Duration::from_millis(5000),
            poll_max_attempts: 60,
            cookie_key: Key::generate(),
            secure_cookies: true,
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// # Required env vars
    /// - `REPORTDECK_CLIENT_ID`: Entra ID application (client) id
    /// - `REPORTDECK_CLIENT_SECRET`: client secret
    /// - `REPORTDECK_REDIRECT_URI`: OAuth2 callback URI (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `REPORTDECK_AUTHORITY`: authority base, e.g. `https://login.microsoftonline.com/<tenant>`
    /// - `REPORTDECK_USERINFO_URL`, `REPORTDECK_REPORTING_BASE`,
    ///   `REPORTDECK_PIPELINE_BASE`, `REPORTDECK_EMBED_BASE`,
    ///   `REPORTDECK_GRAPH_BASE`: endpoint overrides
    /// - `REPORTDECK_WORKSPACE_ID`, `REPORTDECK_REPORT_ID`,
    ///   `REPORTDECK_PIPELINE_ITEM_ID`: target identifiers
    /// - `REPORTDECK_RECIPIENT`: mail recipient for exported reports
    /// - `REPORTDECK_EXPORT_PAGE`, `REPORTDECK_EXPORT_VISUAL`: export target
    /// - `REPORTDECK_REPORTING_SCOPES`, `REPORTDECK_MAIL_SCOPES`: comma-separated scope lists
    /// - `REPORTDECK_PORT`: listen port (default 3456)
    /// - `REPORTDECK_POLL_INTERVAL_MS`: export poll interval (default 5000)
    /// - `REPORTDECK_POLL_MAX_ATTEMPTS`: export poll attempt cap (default 60)
    /// - `REPORTDECK_COOKIE_KEY`: cookie encryption key bytes (at least 64)
    /// - `REPORTDECK_INSECURE_COOKIES`: set to `1`/`true` to drop the Secure
    ///   cookie attribute for local development
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required vars are missing or any value is
    /// invalid.
    pub fn from_env() -> Result<Self, Error> {
        let client_id = require_env("REPORTDECK_CLIENT_ID")?;
        let client_secret = require_env("REPORTDECK_CLIENT_SECRET")?;
        let redirect_uri = parse_url(&require_env("REPORTDECK_REDIRECT_URI")?, "REPORTDECK_REDIRECT_URI")?;

        let mut config = Self::new(client_id, client_secret, redirect_uri);

        if let Ok(v) = std::env::var("REPORTDECK_AUTHORITY") {
            config.authority = parse_url(&v, "REPORTDECK_AUTHORITY")?;
        }
        if let Ok(v) = std::env::var("REPORTDECK_USERINFO_URL") {
            config.userinfo_url = parse_url(&v, "REPORTDECK_USERINFO_URL")?;
        }
        if let Ok(v) = std::env::var("REPORTDECK_REPORTING_BASE") {
            config.reporting_base = parse_url(&v, "REPORTDECK_REPORTING_BASE")?;
        }
        if let Ok(v) = std::env::var("REPORTDECK_PIPELINE_BASE") {
            config.pipeline_base = parse_url(&v, "REPORTDECK_PIPELINE_BASE")?;
        }
        if let Ok(v) = std::env::var("REPORTDECK_EMBED_BASE") {
            config.embed_base = parse_url(&v, "REPORTDECK_EMBED_BASE")?;
        }
        if let Ok(v) = std::env::var("REPORTDECK_GRAPH_BASE") {
            config.graph_base = parse_url(&v, "REPORTDECK_GRAPH_BASE")?;
        }
        if let Ok(v) = std::env::var("REPORTDECK_WORKSPACE_ID") {
            config.workspace_id = v;
        }
        if let Ok(v) = std::env::var("REPORTDECK_REPORT_ID") {
            config.report_id = v;
        }
        if let Ok(v) = std::env::var("REPORTDECK_PIPELINE_ITEM_ID") {
            config.pipeline_item_id = v;
        }
        if let Ok(v) = std::env::var("REPORTDECK_RECIPIENT") {
            config.report_recipient = v;
        }
        if let Ok(v) = std::env::var("REPORTDECK_EXPORT_PAGE") {
            config.export_page = v;
        }
        if let Ok(v) = std::env::var("REPORTDECK_EXPORT_VISUAL") {
            config.export_visual = v;
        }
        if let Ok(v) = std::env::var("REPORTDECK_REPORTING_SCOPES") {
            config.reporting_scopes = split_scopes(&v);
        }
        if let Ok(v) = std::env::var("REPORTDECK_MAIL_SCOPES") {
            config.mail_scopes = split_scopes(&v);
        }
        if let Ok(v) = std::env::var("REPORTDECK_PORT") {
            config.listen_port = v
                .parse()
                .map_err(|e| Error::Config(format!("REPORTDECK_PORT: {e}")))?;
        }
        if let Ok(v) = std::env::var("REPORTDECK_POLL_INTERVAL_MS") {
            let ms: u64 = v
                .parse()
                .map_err(|e| Error::Config(format!("REPORTDECK_POLL_INTERVAL_MS: {e}")))?;
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Ok(v) = std::env::var("REPORTDECK_POLL_MAX_ATTEMPTS") {
            config.poll_max_attempts = v
                .parse()
                .map_err(|e| Error::Config(format!("REPORTDECK_POLL_MAX_ATTEMPTS: {e}")))?;
        }
        if let Ok(k) = std::env::var("REPORTDECK_COOKIE_KEY") {
            config.cookie_key = Key::try_from(k.as_bytes()).map_err(|_| {
                Error::Config(
                    "REPORTDECK_COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?;
        }
        if matches!(
            std::env::var("REPORTDECK_INSECURE_COOKIES").as_deref(),
            Ok("1") | Ok("true")
        ) {
            config.secure_cookies = false;
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_authority(mut self, url: Url) -> Self {
        self.authority = url;
        self
    }

    #[must_use]
    pub fn with_userinfo_url(mut self, url: Url) -> Self {
        self.userinfo_url = url;
        self
    }

    #[must_use]
    pub fn with_reporting_base(mut self, url: Url) -> Self {
        self.reporting_base = url;
        self
    }

    #[must_use]
    pub fn with_pipeline_base(mut self, url: Url) -> Self {
        self.pipeline_base = url;
        self
    }

    #[must_use]
    pub fn with_embed_base(mut self, url: Url) -> Self {
        self.embed_base = url;
        self
    }

    #[must_use]
    pub fn with_graph_base(mut self, url: Url) -> Self {
        self.graph_base = url;
        self
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.report_recipient = recipient.into();
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_poll_max_attempts(mut self, attempts: u32) -> Self {
        self.poll_max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Target workspace identifier.
    #[must_use]
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Target report identifier.
    #[must_use]
    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    /// Listen port for the HTTP server.
    #[must_use]
    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }
}

fn require_env(name: &'static str) -> Result<String, Error> {
    std::env::var(name).map_err(|_| Error::Config(format!("{name} is required")))
}

fn parse_url(value: &str, name: &'static str) -> Result<Url, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{name}: {e}")))
}

fn split_scopes(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig::new(
            "test-client",
            "test-secret",
            "http://localhost:3456/redirect".parse().unwrap(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = test_config();

        assert_eq!(
            config.authority.as_str(),
            "https://login.microsoftonline.com/common"
        );
        assert_eq!(config.listen_port, 3456);
        assert_eq!(config.poll_interval, Duration::from_millis(5000));
        assert_eq!(config.poll_max_attempts, 60);
        assert!(config.secure_cookies);
        assert!(config
            .reporting_scopes
            .iter()
            .any(|s| s.contains("powerbi")));
        assert!(config.mail_scopes.iter().any(|s| s.contains("Mail.Send")));
    }

    #[test]
    fn test_with_overrides() {
        let config = test_config()
            .with_authority("https://login.example.com/tenant".parse().unwrap())
            .with_poll_max_attempts(3)
            .with_secure_cookies(false);

        assert_eq!(config.authority.as_str(), "https://login.example.com/tenant");
        assert_eq!(config.poll_max_attempts, 3);
        assert!(!config.secure_cookies);
    }

    #[test]
    fn test_split_scopes() {
        assert_eq!(
            split_scopes("openid, profile,offline_access"),
            vec!["openid", "profile", "offline_access"]
        );
        assert!(split_scopes("").is_empty());
    }
}
