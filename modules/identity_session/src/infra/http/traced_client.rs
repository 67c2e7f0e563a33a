//! HTTP client that wraps every outgoing request in a span and propagates trace context.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use tracing::{field, Instrument, Level};
use url::Url;

use super::trace_context::inject_trace_context;

#[derive(Clone)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Client with a per-request timeout.
    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(inner))
    }

    /// Execute a built request inside an `outgoing_http` span, injecting `traceparent`.
    pub async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::span!(
            Level::INFO, "outgoing_http",
            http.method = %req.method(),
            http.url = %req.url(),
            http.status_code = field::Empty,
            error = field::Empty,
            otel.kind = "client",
        );

        inject_trace_context(req.headers_mut(), &span);

        let response = self.inner.execute(req).instrument(span.clone()).await?;

        let status = response.status();
        span.record("http.status_code", status.as_u16());
        if status.is_client_error() || status.is_server_error() {
            span.record("error", true);
        }
        Ok(response)
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner.request(method, url)
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

impl From<reqwest::Client> for TracedClient {
    fn from(c: reqwest::Client) -> Self {
        Self::new(c)
    }
}

impl Default for TracedClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}
