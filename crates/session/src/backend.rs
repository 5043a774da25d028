//! Authentication endpoints of the hospital API.

use std::time::Duration;

use async_trait::async_trait;
use medgate_auth::Identity;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{INVALID_CREDENTIALS_MESSAGE, SessionError};
use crate::types::{FieldErrors, LoginRequest, LogoutRequest, RegisteredAccount, Registration, TokenPair};

/// The four authentication endpoints the session core consumes.
///
/// Implementations must not touch the credential store; the session manager
/// owns every state change.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `POST auth/register/`
    async fn register(&self, registration: &Registration) -> Result<RegisteredAccount, SessionError>;

    /// `POST auth/login/`
    async fn login(&self, username: &str, password: &str) -> Result<TokenPair, SessionError>;

    /// `POST auth/logout/`: invalidate `refresh` server-side.
    async fn logout(&self, access: &str, refresh: &str) -> Result<(), SessionError>;

    /// `GET auth/me/`: the authoritative identity behind `access`.
    async fn me(&self, access: &str) -> Result<Identity, SessionError>;
}

/// `reqwest` client for the backend's JSON API.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    client: reqwest::Client,
    api_url: String,
}

impl HttpAuthBackend {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::Network(e.to_string()))?;

        Ok(Self::with_client(client, api_url))
    }

    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn register(&self, registration: &Registration) -> Result<RegisteredAccount, SessionError> {
        let resp = self
            .client
            .post(self.url("auth/register/"))
            .json(registration)
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        parse_json(resp).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<TokenPair, SessionError> {
        let resp = self
            .client
            .post(self.url("auth/login/"))
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            let detail = detail_from_body(&body).unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_string());
            return Err(SessionError::InvalidCredentials { detail });
        }
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        parse_json(resp).await
    }

    async fn logout(&self, access: &str, refresh: &str) -> Result<(), SessionError> {
        let resp = self
            .client
            .post(self.url("auth/logout/"))
            .bearer_auth(access)
            .json(&LogoutRequest { refresh })
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        Ok(())
    }

    async fn me(&self, access: &str) -> Result<Identity, SessionError> {
        let resp = self
            .client
            .get(self.url("auth/me/"))
            .bearer_auth(access)
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        parse_json(resp).await
    }
}

async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, SessionError> {
    resp.json::<T>()
        .await
        .map_err(|e| SessionError::Parse(e.to_string()))
}

/// Map a non-success response to an error.
///
/// 400 with a field map becomes `Validation`; everything else is `Api`.
async fn rejection(resp: reqwest::Response) -> SessionError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();

    if status == 400 {
        if let Some(fields) = field_errors_from_body(&body) {
            return SessionError::Validation(fields);
        }
    }

    let detail = detail_from_body(&body).unwrap_or(body);
    SessionError::Api { status, detail }
}

fn detail_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("detail")?.as_str().map(str::to_string)
}

fn field_errors_from_body(body: &str) -> Option<FieldErrors> {
    let Value::Object(map) = serde_json::from_str::<Value>(body).ok()? else {
        return None;
    };
    if map.contains_key("detail") {
        return None;
    }

    let fields: FieldErrors = map
        .into_iter()
        .map(|(field, messages)| {
            let messages = match messages {
                Value::Array(items) => items
                    .into_iter()
                    .map(|m| match m {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
                Value::String(s) => vec![s],
                other => vec![other.to_string()],
            };
            (field, messages)
        })
        .collect();

    (!fields.is_empty()).then_some(fields)
}
