use std::time::Duration;

use async_trait::async_trait;
use gridfeed_core::FetchError;
use url::Url;

/// A GET request issued by a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Fully built URL, query string included.
    pub url: Url,
    /// Extra request headers.
    pub headers: Vec<(&'static str, String)>,
}

impl HttpRequest {
    /// A request without extra headers.
    #[must_use]
    pub const fn get(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Add `Authorization: Bearer <token>`.
    #[must_use]
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("authorization", format!("Bearer {token}"))
    }
}

/// Raw response as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body decoded as text.
    pub body: String,
    /// `Retry-After` header in seconds, when present and numeric.
    pub retry_after_secs: Option<u64>,
}

impl HttpResponse {
    /// A 200 response with the given body.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            retry_after_secs: None,
        }
    }

    /// A bodyless response with the given status.
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            retry_after_secs: None,
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The body of a successful response, or the classified failure.
    ///
    /// # Errors
    /// Returns `Auth` for 401/403, `RateLimit` for 429 (carrying `Retry-After`),
    /// `Network` for 5xx and `Provider` for any other non-2xx status.
    pub fn into_body(self, provider: &str) -> Result<String, FetchError> {
        if self.is_success() {
            return Ok(self.body);
        }
        if self.status == 429 {
            let retry_ms = self.retry_after_secs.map(|s| s.saturating_mul(1000));
            return Err(FetchError::rate_limit(provider, retry_ms));
        }
        Err(FetchError::from_status(provider, self.status, &self.body))
    }
}

/// HTTP abstraction (so tests can inject canned responses).
///
/// Implementations return `Ok` for any response that arrived, whatever its
/// status; only transport failures become errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a GET request on behalf of `provider`.
    async fn get(&self, provider: &str, request: HttpRequest) -> Result<HttpResponse, FetchError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Transport with the crate's user agent and a per-request timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gridfeed/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            timeout: Some(timeout),
        }
    }

    /// Transport over a preconfigured client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    fn classify(&self, provider: &str, e: &reqwest::Error, context: &str) -> FetchError {
        if e.is_timeout() {
            FetchError::timeout(provider, self.timeout.unwrap_or_default())
        } else if e.is_connect() {
            FetchError::network(provider, format!("connection failed: {e}"))
        } else {
            FetchError::network(provider, format!("{context}: {e}"))
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, provider: &str, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = self.client.get(request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| self.classify(provider, &e, "request failed"))?;
        let status = response.status().as_u16();
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| self.classify(provider, &e, "failed to read body"))?;
        Ok(HttpResponse {
            status,
            body,
            retry_after_secs,
        })
    }
}
