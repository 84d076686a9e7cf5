use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::auth::Principal;
use crate::config;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("registration rejected: {0}")]
    Rejected(String),

    #[error("identity provider unreachable: {0}")]
    Upstream(String),

    #[error("unexpected identity provider response: {0}")]
    Decode(String),
}

/// A session issued by the identity provider at login/registration. The access
/// token is an opaque, time-limited capability; it is never persisted
/// server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: Principal,
}

#[derive(Debug, Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Client for the identity provider boundary: one operation to resolve a token
/// into a principal, one to issue tokens from credentials. Both are opaque
/// remote calls; their failures are normalized into [`IdentityError`].
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    http: reqwest::Client,
    base_url: Url,
}

impl IdentityProvider {
    pub fn new(mut base_url: Url) -> Result<Self, IdentityError> {
        // Url::join replaces the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        let timeout = config::config().identity.request_timeout_secs;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| IdentityError::Upstream(format!("http client init: {}", e)))?;
        Ok(Self { http, base_url })
    }

    /// Build from the IDENTITY_URL env var.
    pub fn from_env() -> Result<Self, IdentityError> {
        let raw = std::env::var("IDENTITY_URL")
            .map_err(|_| IdentityError::Upstream("IDENTITY_URL is not set".to_string()))?;
        let base_url = Url::parse(&raw)
            .map_err(|e| IdentityError::Upstream(format!("invalid IDENTITY_URL: {}", e)))?;
        Self::new(base_url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.base_url
            .join(path)
            .map_err(|e| IdentityError::Upstream(e.to_string()))
    }

    /// Exchange a bearer token for the principal it authenticates.
    ///
    /// Fails closed: anything other than a well-formed 2xx response with a
    /// principal body is an error. Each request revalidates independently; no
    /// caching across requests.
    pub async fn resolve(&self, token: &str) -> Result<Principal, IdentityError> {
        let url = self.endpoint("user")?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| IdentityError::Upstream(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::InvalidToken),
            status if status.is_success() => response
                .json::<Principal>()
                .await
                .map_err(|e| IdentityError::Decode(e.to_string())),
            status => Err(IdentityError::Upstream(format!(
                "unexpected status {}",
                status
            ))),
        }
    }

    /// Issue a session from login credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let url = self.endpoint("token?grant_type=password")?;
        self.session_request(url, email, password, true).await
    }

    /// Register a new identity and issue its first session.
    pub async fn register(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let url = self.endpoint("signup")?;
        self.session_request(url, email, password, false).await
    }

    async fn session_request(
        &self,
        url: Url,
        email: &str,
        password: &str,
        login: bool,
    ) -> Result<Session, IdentityError> {
        let response = self
            .http
            .post(url)
            .json(&CredentialsBody { email, password })
            .send()
            .await
            .map_err(|e| IdentityError::Upstream(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Session>()
                .await
                .map_err(|e| IdentityError::Decode(e.to_string()));
        }
        // 4xx on login means the credentials were wrong; on signup it means the
        // request was rejected (duplicate email, weak password)
        if status.is_client_error() && login {
            return Err(IdentityError::InvalidCredentials);
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected(body));
        }
        Err(IdentityError::Upstream(format!("unexpected status {}", status)))
    }
}
