//! OAuth2 integration for Google sign-in

use std::time::Duration;

use anyhow::{Context, Result};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
    reqwest::async_http_client,
};
use serde::{Deserialize, Serialize};
use tracing::info;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Scopes requested on every sign-in
pub const GOOGLE_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// OAuth2 provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    /// Get the provider name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
        }
    }
}

/// OAuth2 configuration for a provider
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl OAuthConfig {
    /// Create a new OAuthConfig from environment variables
    ///
    /// # Environment Variables
    /// - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REDIRECT_URL` (required)
    /// - `GOOGLE_AUTH_URL`, `GOOGLE_TOKEN_URL`, `GOOGLE_USERINFO_URL` (default: Google endpoints)
    pub fn google_from_env() -> Result<Self> {
        let required = |name: &str| {
            std::env::var(name).with_context(|| format!("{} environment variable not set", name))
        };
        let optional =
            |name: &str, default: &str| std::env::var(name).unwrap_or_else(|_| default.to_string());

        Ok(Self {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            redirect_url: required("GOOGLE_REDIRECT_URL")?,
            auth_url: optional("GOOGLE_AUTH_URL", GOOGLE_AUTH_URL),
            token_url: optional("GOOGLE_TOKEN_URL", GOOGLE_TOKEN_URL),
            userinfo_url: optional("GOOGLE_USERINFO_URL", GOOGLE_USERINFO_URL),
        })
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("redirect_url", &self.redirect_url)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish_non_exhaustive()
    }
}

/// OAuth2 client wrapper
#[derive(Clone)]
pub struct OAuthClient {
    provider: OAuthProvider,
    client: BasicClient,
    http: reqwest::Client,
    userinfo_url: String,
}

impl OAuthClient {
    /// Create a new OAuth2 client for Google
    pub fn new_google(config: OAuthConfig) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id),
            Some(ClientSecret::new(config.client_secret)),
            AuthUrl::new(config.auth_url)?,
            Some(TokenUrl::new(config.token_url)?),
        )
        .set_redirect_uri(RedirectUrl::new(config.redirect_url)?);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            provider: OAuthProvider::Google,
            client,
            http,
            userinfo_url: config.userinfo_url,
        })
    }

    /// Generate authorization URL with PKCE
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge);

        for scope in GOOGLE_SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let (auth_url, csrf_token) = request.url();

        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchange authorization code for an access token
    pub async fn exchange_code(&self, code: String, pkce_verifier: PkceCodeVerifier) -> Result<String> {
        info!("Exchanging authorization code with {}", self.provider.as_str());

        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .context("Authorization code exchange failed")?;

        Ok(token_response.access_token().secret().clone())
    }

    /// Get user profile information from the provider
    pub async fn fetch_profile(&self, access_token: &str) -> Result<OAuthUserProfile> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to get Google user profile: {}", response.status());
        }

        let google_user: GoogleUser = response.json().await?;

        Ok(OAuthUserProfile {
            id: google_user.id,
            email: google_user.email,
            name: google_user.name,
            picture: google_user.picture,
            verified_email: google_user.verified_email,
            provider: self.provider,
        })
    }

    /// Get the provider
    pub fn provider(&self) -> OAuthProvider {
        self.provider
    }
}

/// Google user profile response
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    verified_email: bool,
    name: Option<String>,
    picture: Option<String>,
}

/// OAuth user profile information
#[derive(Debug, Clone)]
pub struct OAuthUserProfile {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub verified_email: bool,
    pub provider: OAuthProvider,
}

/// Pending sign-in stored between the redirect and the callback
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthSession {
    pub csrf_token: String,
    pub pkce_verifier: String,
    pub provider: OAuthProvider,
    pub created_at: u64,
}

impl OAuthSession {
    /// Create a new OAuth session
    pub fn new(
        csrf_token: String,
        pkce_verifier: String,
        provider: OAuthProvider,
        created_at: u64,
    ) -> Self {
        Self {
            csrf_token,
            pkce_verifier,
            provider,
            created_at,
        }
    }
}
