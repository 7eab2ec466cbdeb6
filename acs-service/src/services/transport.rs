//! Thin HTTP request/response wrapper shared by the REST-speaking adapters.
//!
//! The transport knows nothing about vendors: it sends a request and hands
//! back status, headers and raw body. Status interpretation is left to the
//! adapter.

use super::error::AcsError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use service_core::observability::inject_trace_context;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub use reqwest::Method;

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, AcsError> {
        let value = serde_json::to_value(body).map_err(|e| AcsError::Encoding(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Self {
            status,
            status_text,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Convert a non-2xx response into [`AcsError::Transport`].
    pub fn error_for_status(self) -> Result<Self, AcsError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(AcsError::Transport {
                status: self.status,
                status_text: self.status_text,
            })
        }
    }

    /// Decode the body as JSON. An empty body decodes as `{}`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AcsError> {
        let result = if self.body.trim().is_empty() {
            serde_json::from_value(serde_json::Value::Object(Default::default()))
        } else {
            serde_json::from_str(&self.body)
        };
        result.map_err(|e| AcsError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, AcsError>;
}

/// Production transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// `timeout` of `None` keeps reqwest's default (no overall timeout).
    pub fn new(timeout: Option<Duration>) -> Result<Self, AcsError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| AcsError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, AcsError> {
        let mut trace_headers = HeaderMap::new();
        inject_trace_context(&mut trace_headers);

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(trace_headers);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(
                method = %request.method,
                url = %request.url,
                error = %e,
                "ACS request failed before a response was received"
            );
            AcsError::Connection(format!("Failed to reach {}: {}", request.url, e))
        })?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| {
            AcsError::Connection(format!("Failed to read response from {}: {}", request.url, e))
        })?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            "ACS response received"
        );

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

/// Scripted transport for tests: replays queued responses in order and
/// records every request it was asked to send.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, AcsError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: TransportResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(response));
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push_response(TransportResponse::new(status, body.to_string()));
    }

    pub fn push_text(&self, status: u16, body: &str) {
        self.push_response(TransportResponse::new(status, body));
    }

    pub fn push_error(&self, error: AcsError) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests whose URL ends with `suffix`.
    pub fn requests_to(&self, suffix: &str) -> Vec<TransportRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url.ends_with(suffix))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, AcsError> {
        let description = format!("{} {}", request.method, request.url);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(AcsError::Connection(format!(
                    "no mock response queued for {}",
                    description
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_replaces_case_insensitively() {
        let request = TransportRequest::post("https://acs.example.com/provision")
            .bearer_auth("abc")
            .header("authorization", "Bearer override")
            .header("X-Site", "7");

        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.header_value("Authorization"), Some("Bearer override"));
    }

    #[test]
    fn test_status_text_and_error_for_status() {
        let response = TransportResponse::new(503, "");
        assert_eq!(response.status_text, "Service Unavailable");

        let err = response.error_for_status().unwrap_err();
        assert_eq!(err.to_string(), "ACS API returned 503: Service Unavailable");

        assert!(TransportResponse::new(201, "").error_for_status().is_ok());
    }

    #[test]
    fn test_empty_body_decodes_as_object() {
        let value: serde_json::Value = TransportResponse::new(204, "").json().unwrap();
        assert_eq!(value, json!({}));

        let err = TransportResponse::new(200, "<html>").json::<serde_json::Value>();
        assert!(matches!(err, Err(AcsError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_mock_transport_replays_in_order() {
        let transport = MockTransport::new();
        transport.push_text(200, "first");
        transport.push_error(AcsError::Connection("reset".to_string()));

        let first = transport
            .send(TransportRequest::get("https://a/one"))
            .await
            .unwrap();
        assert_eq!(first.body, "first");

        assert!(transport.send(TransportRequest::get("https://a/two")).await.is_err());
        assert!(transport.send(TransportRequest::get("https://a/three")).await.is_err());

        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.requests_to("/two").len(), 1);
    }
}
