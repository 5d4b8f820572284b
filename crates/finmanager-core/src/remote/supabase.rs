//! PostgREST client for a Supabase project.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::{DeleteRequest, RemoteError, RemoteResult, RemoteService, UpsertRequest};
use crate::auth::AuthSession;
use crate::error::{Error, Result};
use crate::util::{compact_text, is_http_url};

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Writes rows through the project's REST endpoint under the user's token, so
/// row-level security sees the same `owner_id` the row carries.
#[derive(Clone)]
pub struct SupabaseRemote {
    rest_url: String,
    anon_key: String,
    client: Client,
}

impl SupabaseRemote {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> Result<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(Error::InvalidInput(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|error| Error::InvalidInput(format!("HTTP client setup failed: {error}")))?;

        Ok(Self {
            rest_url,
            anon_key,
            client,
        })
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    /// Whether the REST endpoint answers at all. Any HTTP status counts.
    pub async fn probe(&self) -> bool {
        let request = self
            .client
            .get(format!("{}/", self.rest_url))
            .header("apikey", &self.anon_key)
            .timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS));

        match request.send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("Remote probe failed: {}", error);
                false
            }
        }
    }

    fn authorized(&self, request: RequestBuilder, session: &AuthSession) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .header("Accept", "application/json")
    }

    async fn send(request: RequestBuilder) -> RemoteResult<()> {
        let response = request.send().await.map_err(map_transport_error)?;
        check_status(response).await
    }
}

impl RemoteService for SupabaseRemote {
    async fn upsert(&self, session: &AuthSession, request: &UpsertRequest) -> RemoteResult<()> {
        let url = format!(
            "{}/{}?on_conflict=id",
            self.rest_url,
            request.collection.as_str()
        );
        let http = self
            .authorized(self.client.post(url), session)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&request.body());

        Self::send(http).await
    }

    async fn delete(&self, session: &AuthSession, request: &DeleteRequest) -> RemoteResult<()> {
        let url = format!(
            "{}/{}?id=eq.{}&owner_id=eq.{}",
            self.rest_url,
            request.collection.as_str(),
            request.id,
            urlencoding::encode(&request.owner_id)
        );
        let http = self
            .authorized(self.client.delete(url), session)
            .header("Prefer", "return=minimal");

        Self::send(http).await
    }
}

pub fn normalize_rest_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "Supabase URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(trimmed) {
        return Err(Error::InvalidInput(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

fn map_transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_builder() {
        RemoteError::Rejected {
            status: None,
            message: error.to_string(),
        }
    } else {
        RemoteError::Unreachable(error.to_string())
    }
}

/// Gateway errors mean the project is down, not that the row was refused.
const fn is_gateway_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

async fn check_status(response: Response) -> RemoteResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

fn classify_failure(status: StatusCode, body: &str) -> RemoteError {
    let message = parse_api_error(status, body);
    if is_gateway_failure(status) {
        RemoteError::Unreachable(message)
    } else {
        RemoteError::Rejected {
            status: Some(status.as_u16()),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    code: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message.or(payload.details).or(payload.hint) {
            return match payload.code {
                Some(code) => format!("{} [{code}] ({})", message.trim(), status.as_u16()),
                None => format!("{} ({})", message.trim(), status.as_u16()),
            };
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
