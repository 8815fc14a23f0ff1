use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use url::Url;

use crate::config::AppConfig;
use crate::error::{error_for_status, Error};

/// Confidential OAuth2 client for the Entra ID v2.0 endpoints.
///
/// Owns the authorization-code flow (with `state` and S256 PKCE), the OIDC
/// userinfo lookup, and the silent path: refresh tokens captured at sign-in
/// are cached per account so a later caller can acquire a token for a
/// different scope set without user interaction.
pub struct IdentityClient {
    client_id: String,
    client_secret: String,
    authority: Url,
    redirect_uri: Url,
    userinfo_url: Url,
    http: reqwest::Client,
    /// Account id (OIDC `sub`) → refresh token.
    accounts: RwLock<HashMap<String, String>>,
}

/// Authorization URL with the PKCE parameters the callback will need.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

/// Token response from the authority token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Claims from the OIDC userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl IdentityClient {
    #[must_use]
    pub fn new(config: &AppConfig, http: reqwest::Client) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            authority: config.authority.clone(),
            redirect_uri: config.redirect_uri.clone(),
            userinfo_url: config.userinfo_url.clone(),
            http,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    fn authorize_endpoint(&self) -> String {
        format!(
            "{}/oauth2/v2.0/authorize",
            self.authority.as_str().trim_end_matches('/')
        )
    }

    fn token_endpoint(&self) -> String {
        format!(
            "{}/oauth2/v2.0/token",
            self.authority.as_str().trim_end_matches('/')
        )
    }

    /// Generate an authorization URL with `state` and PKCE parameters.
    ///
    /// # Panics
    ///
    /// Panics if the configured authority is not a valid URL base, which
    /// configuration validation rules out.
    #[must_use]
    pub fn authorization_url(&self, scopes: &[String]) -> AuthorizationRequest {
        let state = generate_state();
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        let scope = scopes.join(" ");

        let mut url: Url = self
            .authorize_endpoint()
            .parse()
            .expect("authority validated at startup");
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("response_mode", "query")
            .append_pair("state", &state)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("scope", &scope);

        AuthorizationRequest {
            url: url.into(),
            state,
            code_verifier,
        }
    }

    /// Complete a sign-in: exchange the authorization code, fetch userinfo,
    /// and cache the account for later silent acquisition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// token or userinfo endpoint rejects the request. On any error the
    /// caller must assume no token was produced.
    pub async fn sign_in(
        &self,
        code: &str,
        code_verifier: &str,
        scopes: &[String],
    ) -> Result<(TokenResponse, UserInfo), Error> {
        let token = self.exchange_code(code, code_verifier, scopes).await?;
        let user_info = self.fetch_user_info(&token.access_token).await?;

        if let Some(refresh_token) = &token.refresh_token {
            self.accounts
                .write()
                .await
                .insert(user_info.sub.clone(), refresh_token.clone());
        } else {
            tracing::warn!(
                account_id = %user_info.sub,
                "token response carried no refresh token; silent acquisition will fail"
            );
        }

        Ok((token, user_info))
    }

    /// Acquire a token for `scopes` using the cached refresh token of a
    /// previously signed-in account, without user interaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCachedAccount`] if the account never signed in
    /// here, [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// authority rejects the grant.
    pub async fn acquire_token_silent(
        &self,
        account_id: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, Error> {
        let refresh_token = self
            .accounts
            .read()
            .await
            .get(account_id)
            .cloned()
            .ok_or_else(|| Error::NoCachedAccount {
                account_id: account_id.to_string(),
            })?;

        let scope = scopes.join(" ");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http
            .post(self.token_endpoint())
            .form(&params)
            .send()
            .await?;

        let response = error_for_status(response, "silent token acquisition").await?;
        let token: TokenResponse = response.json().await?;

        // The authority may rotate the refresh token on every grant.
        if let Some(rotated) = &token.refresh_token {
            self.accounts
                .write()
                .await
                .insert(account_id.to_string(), rotated.clone());
        }

        Ok(token)
    }

    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, Error> {
        let scope = scopes.join(" ");
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code_verifier", code_verifier),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http
            .post(self.token_endpoint())
            .form(&params)
            .send()
            .await?;

        let response = error_for_status(response, "token exchange").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Fetch userinfo claims for an access token.
    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, Error> {
        let response = self
            .http
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = error_for_status(response, "userinfo request").await?;
        response.json::<UserInfo>().await.map_err(Into::into)
    }
}

// ── PKCE ───────────────────────────────────────────────────────────

/// Generates a cryptographically random code verifier.
///
/// Returns a 64-character URL-safe string (RFC 7636 compliant, 43-128 chars).
fn generate_code_verifier() -> String {
    let random_bytes: [u8; 48] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Computes the S256 code challenge: `BASE64URL(SHA256(verifier))`.
fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generates a cryptographically random `state` parameter.
fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
