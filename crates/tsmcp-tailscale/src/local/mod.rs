//! Local API client for communicating with tailscaled.
//!
//! Each call opens a fresh connection over a [`LocalTransport`], performs an
//! HTTP/1.1 handshake and sends one request under `/localapi/v0`.

pub mod transport;

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode, header};
use hyper_util::rt::TokioIo;
use tracing::{debug, info};

use crate::error::{Result, TailscaleError};
use crate::serve::ServeConfig;
use crate::status::Status;

pub use transport::LocalTransport;
#[cfg(any(unix, windows))]
pub use transport::{DefaultTransport, default_transport_at};

/// Host header `tailscaled` expects on local API requests.
pub const LOCAL_API_HOST: &str = "local-tailscaled.sock";

/// Path prefix of every local API endpoint.
pub const LOCAL_API_PREFIX: &str = "/localapi/v0";

/// Default bound on establishing the transport connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw local API response.
#[derive(Debug, Clone)]
pub struct LocalResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// `ETag` header, if the daemon sent one.
    pub etag: Option<String>,
    /// Response body.
    pub body: Bytes,
}

impl LocalResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Convert a non-2xx response into an error naming `operation`.
    ///
    /// # Errors
    ///
    /// Returns `TailscaleError::ApiError` unless the status is 2xx.
    pub fn error_for_status(self, operation: &str) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let message = String::from_utf8_lossy(&self.body).trim().to_string();
        let message = if message.is_empty() {
            self.status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            message
        };
        Err(TailscaleError::api_error(format!(
            "{operation} failed with status {}: {message}",
            self.status.as_u16()
        )))
    }
}

/// Client for the Tailscale local API.
#[derive(Debug, Clone)]
pub struct LocalClient<T> {
    transport: T,
    connect_timeout: Duration,
}

#[cfg(any(unix, windows))]
impl LocalClient<DefaultTransport> {
    /// Create a client on the platform's default socket or pipe.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transport(DefaultTransport::default())
    }

    /// Create a client on a custom socket path or pipe name.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<std::path::PathBuf>) -> Self {
        Self::with_transport(default_transport_at(endpoint))
    }
}

#[cfg(any(unix, windows))]
impl Default for LocalClient<DefaultTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: LocalTransport> LocalClient<T> {
    /// Create a client on an arbitrary transport.
    #[must_use]
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request to `/localapi/v0{path}`.
    ///
    /// # Errors
    ///
    /// - `TailscaleError::Timeout` if connecting exceeds the connect timeout
    /// - `TailscaleError::SocketNotFound` if the endpoint does not exist
    /// - `TailscaleError::ApiError` on handshake or protocol failures
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        headers: &[(&str, &str)],
    ) -> Result<LocalResponse> {
        let stream = tokio::time::timeout(self.connect_timeout, self.transport.connect())
            .await
            .map_err(|_| {
                TailscaleError::timeout("local API connect", self.connect_timeout.as_secs())
            })?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    TailscaleError::socket_not_found(self.transport.endpoint())
                }
                _ => TailscaleError::Io(e),
            })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake::<_, Full<Bytes>>(
            TokioIo::new(stream),
        )
        .await
        .map_err(|e| TailscaleError::api_error(format!("handshake failed: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "local API connection closed with error");
            }
        });

        let uri = format!("{LOCAL_API_PREFIX}{path}");
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(&uri)
            .header(header::HOST, LOCAL_API_HOST);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| TailscaleError::api_error(format!("invalid request: {e}")))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| TailscaleError::api_error(format!("{method} {uri} failed: {e}")))?;

        let status = response.status();
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TailscaleError::api_error(format!("failed to read response: {e}")))?
            .to_bytes();

        debug!(%method, %uri, status = status.as_u16(), bytes = body.len(), "local API call");
        Ok(LocalResponse { status, etag, body })
    }

    /// Get the current Tailscale status.
    ///
    /// # Errors
    ///
    /// Returns error if tailscaled is unreachable, answers non-2xx, or the
    /// body is not a status document.
    pub async fn get_status(&self) -> Result<Status> {
        let response = self
            .call(Method::GET, "/status", None, &[])
            .await?
            .error_for_status("status")?;

        serde_json::from_slice(&response.body)
            .map_err(|e| TailscaleError::json_parse(format!("failed to parse status: {e}")))
    }

    /// Get the current serve configuration.
    ///
    /// # Errors
    ///
    /// Returns error if tailscaled is unreachable, answers non-2xx, or the
    /// body is not a serve configuration.
    pub async fn get_serve_config(&self) -> Result<ServeConfig> {
        let response = self
            .call(Method::GET, "/serve-config", None, &[])
            .await?
            .error_for_status("get serve config")?;

        // An unconfigured node answers with `null` or an empty body.
        let mut config = if response.body.iter().all(u8::is_ascii_whitespace) {
            ServeConfig::default()
        } else {
            serde_json::from_slice::<Option<ServeConfig>>(&response.body)
                .map_err(|e| {
                    TailscaleError::json_parse(format!("failed to parse serve config: {e}"))
                })?
                .unwrap_or_default()
        };
        config.etag = response.etag.unwrap_or_default();
        Ok(config)
    }

    /// Replace the serve configuration.
    ///
    /// An empty configuration retracts everything previously published.
    ///
    /// # Errors
    ///
    /// Returns error if tailscaled is unreachable or rejects the config.
    pub async fn set_serve_config(&self, config: &ServeConfig) -> Result<()> {
        let body = serde_json::to_vec(config).map_err(|e| {
            TailscaleError::json_parse(format!("failed to encode serve config: {e}"))
        })?;

        self.call(
            Method::POST,
            "/serve-config",
            Some(body),
            &[("content-type", "application/json")],
        )
        .await?
        .error_for_status("set serve config")?;

        info!(
            web_hosts = config.web.len(),
            funnel = config.allow_funnel.len(),
            "serve config updated"
        );
        Ok(())
    }
}
