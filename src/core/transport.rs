//! HTTP Transport
//!
//! HTTP client interface and implementations for Vault requests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::{NetworkError, ProtocolError, VaultDbError, VaultDbResult};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
}

impl HttpRequest {
    /// GET request without body.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// POST request with a JSON body.
    pub fn post_json(url: impl Into<String>, body: String) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers,
            body: Some(body),
        }
    }

    /// Add a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Build a response from a status code and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            status,
            status_text,
            body: body.into(),
        }
    }

    /// 5xx class.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> VaultDbResult<HttpResponse>;
}

/// Maximum redirects followed for one request.
const MAX_REDIRECTS: usize = 5;

/// Default reqwest-based HTTP transport.
///
/// Redirects are followed only within the origin of the original request,
/// so the `X-Vault-Token` header never leaves the Vault cluster address.
/// Standby nodes answer with a same-origin 307; anything else surfaces as
/// [`ProtocolError::UnexpectedRedirect`].
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    /// Create new transport with default settings.
    pub fn new() -> VaultDbResult<Self> {
        Self::with_options(Duration::from_secs(30), 1048576) // 1MB
    }

    /// Create transport with custom options.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> VaultDbResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(same_origin_redirects())
            .build()
            .map_err(|e| NetworkError::ClientBuild {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
            max_response_size,
        })
    }

    fn map_send_error(&self, error: reqwest::Error) -> NetworkError {
        if error.is_timeout() {
            NetworkError::Timeout {
                timeout: self.default_timeout,
            }
        } else {
            NetworkError::ConnectionFailed {
                message: error.to_string(),
            }
        }
    }

    /// Read the body chunk by chunk, failing as soon as the cap is crossed.
    async fn read_body(&self, mut response: reqwest::Response) -> VaultDbResult<String> {
        if let Some(len) = response.content_length() {
            if len > self.max_response_size as u64 {
                return Err(ProtocolError::ResponseTooLarge { size: len as usize }.into());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.map_send_error(e))?
        {
            if body.len() + chunk.len() > self.max_response_size {
                return Err(ProtocolError::ResponseTooLarge {
                    size: body.len() + chunk.len(),
                }
                .into());
            }
            body.extend_from_slice(&chunk);
        }

        String::from_utf8(body).map_err(|e| {
            ProtocolError::InvalidResponse {
                message: e.to_string(),
            }
            .into()
        })
    }
}

fn same_origin_redirects() -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(|attempt| {
        let same_origin = attempt
            .previous()
            .first()
            .map(|first| first.origin() == attempt.url().origin())
            .unwrap_or(false);

        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if same_origin {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> VaultDbResult<HttpResponse> {
        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        // Cross-origin redirects are stopped by the policy and land here.
        if response.status().is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            return Err(ProtocolError::UnexpectedRedirect { location }.into());
        }

        let body = self.read_body(response).await?;

        Ok(HttpResponse {
            status,
            status_text,
            body,
        })
    }
}

/// Mock HTTP transport for testing.
///
/// Scripted outcomes are consumed in order; once the queue is drained the
/// default response (if any) is returned.
#[derive(Default)]
pub struct MockHttpTransport {
    outcomes: std::sync::Mutex<VecDeque<Result<HttpResponse, NetworkError>>>,
    request_history: std::sync::Mutex<Vec<HttpRequest>>,
    default_response: std::sync::Mutex<Option<HttpResponse>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.outcomes.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response(&self, status: u16, body: &serde_json::Value) -> &Self {
        self.queue_response(HttpResponse::new(status, body.to_string()))
    }

    /// Queue a transport failure.
    pub fn queue_error(&self, error: NetworkError) -> &Self {
        self.outcomes.lock().unwrap().push_back(Err(error));
        self
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        *self.default_response.lock().unwrap() = Some(response);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().unwrap().clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.request_history.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> VaultDbResult<HttpResponse> {
        self.request_history.lock().unwrap().push(request);

        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(VaultDbError::Network(error)),
            None => self.default_response.lock().unwrap().clone().ok_or_else(|| {
                VaultDbError::Network(NetworkError::ConnectionFailed {
                    message: "No mock response available".to_string(),
                })
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_is_fifo() {
        let transport = MockHttpTransport::new();
        transport.queue_json_response(500, &serde_json::json!({"errors": []}));
        transport.queue_json_response(200, &serde_json::json!({"key": "value"}));

        let first = transport
            .send(HttpRequest::get("https://vault.test/a"))
            .await
            .unwrap();
        let second = transport
            .send(HttpRequest::get("https://vault.test/b"))
            .await
            .unwrap();

        assert_eq!(first.status, 500);
        assert_eq!(first.status_text, "Internal Server Error");
        assert_eq!(second.status, 200);
        assert!(second.body.contains("value"));

        let history = transport.get_requests();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].url, "https://vault.test/a");
    }

    #[tokio::test]
    async fn test_mock_transport_queued_error() {
        let transport = MockHttpTransport::new();
        transport.queue_error(NetworkError::ConnectionFailed {
            message: "connection reset".to_string(),
        });

        let result = transport.send(HttpRequest::get("https://vault.test")).await;
        assert!(matches!(result, Err(VaultDbError::Network(_))));

        // queue drained, no default
        let result = transport.send(HttpRequest::get("https://vault.test")).await;
        assert!(result.is_err());
        assert_eq!(transport.request_count(), 2);
    }

    /// One-shot HTTP server answering with a chunked body of `size` bytes.
    async fn chunked_server(size: usize) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let mut response =
                b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\nconnection: close\r\n\r\n"
                    .to_vec();
            for _ in 0..size / 8 {
                response.extend_from_slice(b"8\r\n{\"a\":1 }\r\n");
            }
            response.extend_from_slice(b"0\r\n\r\n");
            let _ = socket.write_all(&response).await;
        });
        format!("http://{}/v1/database/creds/app-role", addr)
    }

    #[tokio::test]
    async fn test_chunked_body_over_cap_is_rejected() {
        let url = chunked_server(64).await;
        let transport = ReqwestHttpTransport::with_options(Duration::from_secs(5), 16).unwrap();

        let err = transport.send(HttpRequest::get(url)).await.unwrap_err();
        assert!(matches!(
            err,
            VaultDbError::Protocol(ProtocolError::ResponseTooLarge { size }) if size > 16
        ));
    }

    #[tokio::test]
    async fn test_chunked_body_under_cap_is_read() {
        let url = chunked_server(16).await;
        let transport = ReqwestHttpTransport::with_options(Duration::from_secs(5), 1024).unwrap();

        let response = transport.send(HttpRequest::get(url)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "{\"a\":1 }{\"a\":1 }");
    }

    #[test]
    fn test_request_builders() {
        let request = HttpRequest::post_json("https://vault.test/login", "{}".to_string())
            .header("x-vault-request", "true");
        assert_eq!(request.method.as_str(), "POST");
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.headers.len(), 2);

        assert!(HttpResponse::new(503, "").is_server_error());
        assert!(!HttpResponse::new(403, "").is_server_error());
    }
}
