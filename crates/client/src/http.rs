use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ClientError, HttpError};
use crate::routing::HttpMethod;

/// A request ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

/// Sends requests. Implementations must carry session cookies.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// `reqwest` transport with a cookie store, so the session cookie set at
/// sign-in accompanies every call.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

/// The single entry point for backend calls: JSON in, JSON-or-nothing out,
/// non-2xx as [`HttpError`]. No retries.
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Returns `Ok(None)` for an empty body (e.g. 204).
    pub async fn request(
        &self,
        url: &str,
        method: HttpMethod,
        payload: Option<&Value>,
        headers: &[(String, String)],
    ) -> Result<Option<Value>, ClientError> {
        let mut all_headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        for (name, value) in headers {
            all_headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            all_headers.push((name.clone(), value.clone()));
        }

        tracing::debug!(%method, url, "backend request");
        let response = self
            .transport
            .send(HttpRequest {
                method,
                url: url.to_string(),
                headers: all_headers,
                body: payload.cloned(),
            })
            .await?;

        if !(200..300).contains(&response.status) {
            return Err(HttpError {
                status: response.status,
                status_text: response.status_text,
                body: response.body,
            }
            .into());
        }

        if response.body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&response.body)
            .map(Some)
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn get(&self, url: &str) -> Result<Option<Value>, ClientError> {
        self.request(url, HttpMethod::Get, None, &[]).await
    }
}
