//! JSON-over-HTTP client used by the API suite

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::traits::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A 2xx response with its body parsed as JSON
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The server answered with a non-2xx status
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: Value },

    /// No response was received (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::Network(_) => None,
        }
    }
}

/// Request/response transport the API suite runs against
#[async_trait]
pub trait HttpTransport: Session {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<HttpResponse, HttpError>;

    async fn get(&self, path: &str) -> std::result::Result<HttpResponse, HttpError> {
        self.request(Method::Get, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> std::result::Result<HttpResponse, HttpError> {
        self.request(Method::Post, path, Some(body)).await
    }

    async fn put(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<HttpResponse, HttpError> {
        self.request(Method::Put, path, body).await
    }

    async fn patch(&self, path: &str, body: &Value) -> std::result::Result<HttpResponse, HttpError> {
        self.request(Method::Patch, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> std::result::Result<HttpResponse, HttpError> {
        self.request(Method::Delete, path, None).await
    }
}

/// reqwest-backed transport bound to one base URL
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Session for HttpClient {}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<HttpResponse, HttpError> {
        let url = self.url(path);
        log::debug!("{} {}", method, url);

        let mut request = self.client.request(method.into(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;

        log::debug!("{} {} -> {}", method, url, status);
        classify(status, &text)
    }
}

/// Turn a raw status/body pair into a response or a status error
pub fn classify(status: u16, text: &str) -> std::result::Result<HttpResponse, HttpError> {
    let body = parse_body(text);
    if (200..300).contains(&status) {
        Ok(HttpResponse { status, body })
    } else {
        Err(HttpError::Status { status, body })
    }
}

/// Parse a response body: empty is `null`, non-JSON is kept as a string
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
