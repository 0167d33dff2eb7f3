use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::NexusError;

pub mod reqwest;

/// Enumerates the HTTP methods used by the transport abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Minimal HTTP request representation shared across providers.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Builds a POST request with a JSON request body.
    ///
    /// The helper sets the `Content-Type` header to `application/json` and stores the
    /// provided buffer as the body, making it ideal for serialized payloads.
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_llm::http::{HttpMethod, HttpRequest};
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec());
    /// assert_eq!(request.method, HttpMethod::Post);
    /// assert_eq!(request.headers.get("Content-Type"), Some(&"application/json".to_string()));
    /// ```
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: Some(body),
            timeout: None,
        }
    }

    /// Builds a bodyless GET request, used when an adapter needs to fetch a
    /// remote attachment before inlining it.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Overrides the request headers after construction.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Minimal HTTP response representation.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Converts the body into a UTF-8 string.
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_llm::http::HttpResponse;
    ///
    /// let response = HttpResponse { status: 200, headers: Default::default(), body: b"ok".to_vec() };
    /// assert_eq!(response.into_string().unwrap(), "ok");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`NexusError::Transport`] when the body cannot be interpreted as UTF-8.
    pub fn into_string(self) -> Result<String, NexusError> {
        String::from_utf8(self.body).map_err(|err| NexusError::transport(err.to_string()))
    }
}

/// Transport abstraction used to decouple providers from the concrete HTTP client.
///
/// Implementations should map network failures to [`NexusError::Transport`];
/// provider-level error payloads travel back as ordinary responses and are
/// classified by each adapter.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves when the full response is available.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NexusError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

/// Sends a request unless the caller has already cancelled, and races the
/// in-flight call against the cancellation token.
///
/// An already-cancelled token aborts before the transport is touched, so no
/// network traffic is issued on behalf of a dead caller.
///
/// # Errors
///
/// Returns [`NexusError::Cancelled`] on cancellation, or whatever the
/// transport reports.
pub async fn send_cancellable(
    transport: &dyn HttpTransport,
    request: HttpRequest,
    cancel: &CancellationToken,
) -> Result<HttpResponse, NexusError> {
    if cancel.is_cancelled() {
        return Err(NexusError::cancelled(
            "request cancelled before dispatching to the provider",
        ));
    }

    tokio::select! {
        _ = cancel.cancelled() => Err(NexusError::cancelled(
            "request cancelled while awaiting the provider",
        )),
        response = transport.send(request) => response,
    }
}

/// Serializes a body to JSON, attaches headers, and issues a cancellable POST.
///
/// This helper centralizes JSON serialization so each provider can reuse the
/// same logic without duplicating header or error handling.
///
/// # Errors
///
/// Returns [`NexusError::Transport`] if serialization fails, forwards
/// transport failures, and [`NexusError::Cancelled`] on cancellation.
pub async fn post_json_with_headers<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    body: &T,
    cancel: &CancellationToken,
) -> Result<HttpResponse, NexusError> {
    let payload = serde_json::to_vec(body)
        .map_err(|err| NexusError::transport(format!("failed to serialize request: {err}")))?;
    let mut request = HttpRequest::post_json(url, payload);
    request.headers.extend(headers);
    send_cancellable(transport, request, cancel).await
}

/// Issues a cancellable GET request with the given headers.
pub async fn get_with_headers(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    cancel: &CancellationToken,
) -> Result<HttpResponse, NexusError> {
    let request = HttpRequest::get(url).with_headers(headers);
    send_cancellable(transport, request, cancel).await
}

/// Extracts a `Retry-After` hint (in seconds) from response headers.
///
/// Only the delta-seconds form is understood; HTTP-date values are ignored.
pub(crate) fn retry_after_from_headers(headers: &HashMap<String, String>) -> Option<Duration> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
