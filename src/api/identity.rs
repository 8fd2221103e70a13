//! Identity provider adapters used by the edge gate.
//!
//! Token issuance and verification belong to the external provider. This
//! module only forwards the caller's session token and maps the answer onto
//! a [`Session`]. A missing token, or a provider answer that means "no
//! session", resolves to an anonymous session rather than an error.

use crate::access::Session;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{future::Future, pin::Pin, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_SESSION_COOKIE: &str = "__session";

pub type ResolveFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Session, IdentityError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("identity provider returned unexpected status {0}")]
    Status(StatusCode),
    #[error("invalid identity provider url: {0}")]
    Url(#[from] url::ParseError),
}

/// Resolves the session for an incoming request.
pub trait IdentityProvider: Send + Sync {
    fn resolve<'a>(&'a self, headers: &'a HeaderMap) -> ResolveFuture<'a>;
}

/// Always answers with the same session. Useful for local development.
#[derive(Clone, Debug)]
pub struct StaticIdentityProvider {
    session: Session,
}

impl StaticIdentityProvider {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn resolve<'a>(&'a self, _headers: &'a HeaderMap) -> ResolveFuture<'a> {
        let session = self.session.clone();
        Box::pin(async move { Ok(session) })
    }
}

/// Settings for [`RemoteIdentityProvider`].
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    endpoint: String,
    secret_key: Option<SecretString>,
    session_cookie: String,
    timeout: Duration,
}

impl IdentityConfig {
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            secret_key: None,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_secret_key(mut self, secret_key: Option<SecretString>) -> Self {
        self.secret_key = secret_key;
        self
    }

    #[must_use]
    pub fn with_session_cookie(mut self, session_cookie: String) -> Self {
        self.session_cookie = session_cookie;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }
}

/// Providers name the active organization `org_id` or `organization_id`;
/// `org_id` wins when both are sent.
#[derive(Debug, Deserialize)]
struct SessionClaims {
    user_id: String,
    #[serde(default)]
    org_id: Option<String>,
    #[serde(default)]
    organization_id: Option<String>,
}

impl SessionClaims {
    fn into_session(self) -> Session {
        let organization = self
            .org_id
            .filter(|id| !id.trim().is_empty())
            .or(self.organization_id);
        Session::signed_in(self.user_id, organization)
    }
}

/// Verifies session tokens against the provider's session endpoint.
///
/// `POST {endpoint}` with `{"token": "<session token>"}`; the secret key, if
/// any, is sent as a bearer token. `200` carries the claims, `204`/`401`/
/// `403`/`404` mean there is no valid session.
#[derive(Debug)]
pub struct RemoteIdentityProvider {
    client: reqwest::Client,
    endpoint: Url,
    secret_key: Option<SecretString>,
    session_cookie: String,
}

impl RemoteIdentityProvider {
    /// Build the provider and its HTTP client.
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a valid URL or the client cannot be built.
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let endpoint = Url::parse(&config.endpoint)?;
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            secret_key: config.secret_key,
            session_cookie: config.session_cookie,
        })
    }

    #[instrument(skip_all)]
    async fn verify(&self, token: String) -> Result<Session, IdentityError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({ "token": token }));

        if let Some(secret_key) = &self.secret_key {
            request = request.bearer_auth(secret_key.expose_secret());
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::OK => {
                let claims: SessionClaims = response.json().await?;
                let session = claims.into_session();
                debug!(
                    user_id = ?session.user_id,
                    org_id = ?session.organization_id,
                    "session verified"
                );
                Ok(session)
            }
            StatusCode::NO_CONTENT
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::NOT_FOUND => Ok(Session::anonymous()),
            status => Err(IdentityError::Status(status)),
        }
    }
}

impl IdentityProvider for RemoteIdentityProvider {
    fn resolve<'a>(&'a self, headers: &'a HeaderMap) -> ResolveFuture<'a> {
        let token = extract_session_token(headers, &self.session_cookie);
        Box::pin(async move {
            match token {
                Some(token) => self.verify(token).await,
                None => Ok(Session::anonymous()),
            }
        })
    }
}

/// Session token from `Authorization: Bearer` or the named cookie.
#[must_use]
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == cookie_name && !val.trim().is_empty()).then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
