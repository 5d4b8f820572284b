//! Supabase auth: sessions, the email/password client and session sources
//! the sync engine reads from.

mod session;

use std::fmt;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{compact_text, is_http_url, unix_timestamp_now};

pub use session::{SessionHandle, SessionProvider};

const EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    /// Expired, or about to within the refresh skew.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }

    /// Identifier remote rows are scoped to.
    pub fn owner_id(&self) -> &str {
        &self.user.id
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Supabase auth is not configured; run `finmanager config init`.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where a signed-in session survives between runs.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Email/password client for the Supabase auth API.
///
/// Every session change is persisted and published to the attached
/// [`SessionHandle`], which is what gates sync drains.
#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
    handle: SessionHandle,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
            store,
            handle: SessionHandle::new(),
        })
    }

    /// Publish session changes to `handle` instead of a private one.
    #[must_use]
    pub fn with_handle(mut self, handle: SessionHandle) -> Self {
        self.handle = handle;
        self
    }

    pub const fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Load the persisted session, refreshing it when expired.
    ///
    /// A session the auth service refuses to refresh is cleared.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.store.load_session()? else {
            self.handle.clear();
            return Ok(None);
        };

        if !stored.is_expired() {
            self.handle.set(stored.clone());
            return Ok(Some(stored));
        }

        match self.refresh_session(&stored.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            // Offline: the session stays persisted for a later refresh; the expired
            // token is not published
            Err(AuthError::Http(error)) => {
                tracing::debug!("Could not reach auth service to refresh session: {}", error);
                self.handle.clear();
                Ok(None)
            }
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                self.handle.clear();
                Ok(None)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&payload),
        );

        let session = self
            .send_auth_request(request)
            .await?
            .into_session("Sign-in")?;
        self.accept_session(&session)?;
        tracing::info!(
            "Signed in as {}",
            session.user.email.as_deref().unwrap_or(session.owner_id())
        );
        Ok(session)
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({
            "refresh_token": refresh_token,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );

        let session = self
            .send_auth_request(request)
            .await?
            .into_session("Refresh")?;
        self.accept_session(&session)?;
        Ok(session)
    }

    /// Revoke the persisted session remotely and forget it locally.
    ///
    /// The local copy is cleared even when the token was already invalid.
    pub async fn sign_out(&self) -> AuthResult<()> {
        if let Some(session) = self.store.load_session()? {
            let response = self
                .client
                .post(format!("{}/logout", self.auth_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await?;

            let status = response.status();
            if !(status.is_success() || status == StatusCode::UNAUTHORIZED) {
                let body = response.text().await.unwrap_or_default();
                return Err(AuthError::Api(parse_api_error(status, &body)));
            }
        }

        self.store.clear_session()?;
        self.handle.clear();
        Ok(())
    }

    fn accept_session(&self, session: &AuthSession) -> AuthResult<()> {
        self.store.save_session(session)?;
        self.handle.set(session.clone());
        Ok(())
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> AuthResult<SupabaseAuthResponse> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<SupabaseAuthResponse>().await?)
    }
}

pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !is_http_url(trimmed) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    if trimmed.ends_with("/auth/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/auth/v1"))
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::Api("Email is required".to_string()));
    }
    if password.trim().is_empty() {
        return Err(AuthError::Api("Password is required".to_string()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
    session: Option<SupabaseAuthResponseSession>,
}

impl SupabaseAuthResponse {
    /// Tokens may arrive flat or nested under `session`.
    fn into_session(self, context: &str) -> AuthResult<AuthSession> {
        let nested = self.session;
        let access_token = self
            .access_token
            .or_else(|| nested.as_ref().and_then(|session| session.access_token.clone()));
        let refresh_token = self
            .refresh_token
            .or_else(|| nested.as_ref().and_then(|session| session.refresh_token.clone()));
        let expires_at = self
            .expires_at
            .or_else(|| nested.as_ref().and_then(|session| session.expires_at))
            .or_else(|| {
                self.expires_in
                    .or_else(|| nested.as_ref().and_then(|session| session.expires_in))
                    .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
            });
        let user = self
            .user
            .or_else(|| nested.and_then(|session| session.user))
            .map(AuthUser::from);

        match (access_token, refresh_token, expires_at, user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                })
            }
            _ => Err(AuthError::Api(format!(
                "{context} response did not include an active session"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponseSession {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
}

impl From<SupabaseUser> for AuthUser {
    fn from(value: SupabaseUser) -> Self {
        Self {
            id: value.id,
            email: value.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<SupabaseErrorResponse>(body) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
