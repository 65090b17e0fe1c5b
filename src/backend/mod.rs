//! Turbo backend request executor.
//!
//! Each chat command maps to exactly one [`BackendRequest`] (two for
//! `showPermission`). The executor performs it and hands back the raw status
//! and body; deciding what a status means is left to [`crate::interpret`].

pub mod endpoints;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::BotKeyAuth;
use crate::config::BackendConfig;
use crate::error::{BackendError, CommandError};

/// HTTP verbs used by the Turbo API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound call.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    /// Path appended to the configured base URL, e.g. `/web/currentTickets`.
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
    /// Full `Authorization` header value. Absent only for bind.
    pub authorization: Option<SecretString>,
}

impl BackendRequest {
    pub fn get(path: &'static str) -> Self {
        Self {
            method: Method::Get,
            path,
            query: Vec::new(),
            body: None,
            authorization: None,
        }
    }

    pub fn post(path: &'static str) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(path)
        }
    }

    pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn authorized(mut self, auth: &BotKeyAuth) -> Self {
        self.authorization = Some(auth.header_value());
        self
    }

    /// Header value as sent on the wire. Test helper for fakes.
    pub fn authorization_header(&self) -> Option<&str> {
        self.authorization.as_ref().map(|s| s.expose_secret())
    }
}

/// Raw backend reply.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: u16,
    pub body: String,
}

impl BackendResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Decode the body as JSON. Shape mismatches are validation failures.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, CommandError> {
        serde_json::from_str(&self.body)
            .map_err(|e| CommandError::Validation(format!("无法解析响应数据：{e}")))
    }

    /// Plain-text body with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        self.body.trim()
    }

    /// `message` field of a JSON error body, if present.
    pub fn message_field(&self) -> Option<String> {
        let value: Value = serde_json::from_str(&self.body).ok()?;
        value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Executes backend calls.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn call(&self, request: BackendRequest) -> Result<BackendResponse, BackendError>;
}

/// `reqwest`-based executor. A fresh client is built per call.
pub struct HttpBackend {
    base_url: String,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            timeout: config.request_timeout,
        }
    }

    fn url_for(&self, path: &str) -> Result<url::Url, BackendError> {
        let raw = format!("{}{}", self.base_url, path);
        url::Url::parse(&raw).map_err(|e| BackendError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn call(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        let url = self.url_for(request.path)?;
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        let mut builder = match request.method {
            Method::Get => client.get(url.clone()),
            Method::Post => client.post(url.clone()),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(auth) = &request.authorization {
            builder = builder.header("Authorization", auth.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = ?request.method, path = request.path, "Calling Turbo backend");

        let timeout = self.timeout;
        let to_error = |e: reqwest::Error| {
            if e.is_timeout() {
                BackendError::Timeout {
                    url: url.to_string(),
                    timeout,
                }
            } else {
                BackendError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = builder.send().await.map_err(to_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(to_error)?;

        tracing::debug!(path = request.path, status, "Turbo backend responded");
        Ok(BackendResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    fn backend_for(server: &MockServer, timeout: Duration) -> HttpBackend {
        HttpBackend::new(&BackendConfig {
            api_base_url: server.base_url(),
            request_timeout: timeout,
        })
    }

    #[tokio::test]
    async fn sends_method_path_auth_and_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/web/setMaimaiName")
                    .header("Authorization", "BotKey k-1")
                    .json_body(json!({ "maimaiName": "SALT" }));
                then.status(200).body("ok");
            })
            .await;

        let auth = BotKeyAuth::new(SecretString::from("k-1".to_string()));
        let response = backend_for(&server, Duration::from_secs(5))
            .call(
                BackendRequest::post("/web/setMaimaiName")
                    .authorized(&auth)
                    .json(json!({ "maimaiName": "SALT" })),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");
    }

    #[tokio::test]
    async fn forwards_query_and_non_success_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/web/showFriends")
                    .query_param("page", "2");
                then.status(500).json_body(json!({ "message": "db down" }));
            })
            .await;

        let response = backend_for(&server, Duration::from_secs(5))
            .call(BackendRequest::get("/web/showFriends").query("page", "2"))
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(response.message_field().as_deref(), Some("db down"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/web/currentTickets");
                then.status(200).delay(Duration::from_millis(500)).body("{}");
            })
            .await;

        let err = backend_for(&server, Duration::from_millis(50))
            .call(BackendRequest::get("/web/currentTickets"))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_backend_is_request_error() {
        let backend = HttpBackend::new(&BackendConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(2),
        });
        let err = backend
            .call(BackendRequest::get("/web/showMaimaiName"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::Request { .. } | BackendError::Timeout { .. }
        ));
    }

    #[test]
    fn text_trims_but_keeps_quotes() {
        let response = BackendResponse::new(200, "  \"ADMIN\"\n");
        assert_eq!(response.text(), "\"ADMIN\"");
        assert!(response.message_field().is_none());
    }
}
