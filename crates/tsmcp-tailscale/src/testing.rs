//! In-memory `tailscaled` double.
//!
//! [`MockDaemon`] is a [`LocalTransport`] whose connections are served by an
//! HTTP/1.1 server running over `tokio::io::duplex`. It answers the local API
//! endpoints this crate uses and records every request it receives.

use std::convert::Infallible;
use std::io;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, header};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tracing::debug;

use crate::local::LocalTransport;

/// A request received by the [`MockDaemon`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// `Host` header.
    pub host: Option<String>,
    /// `Content-Type` header.
    pub content_type: Option<String>,
    /// Request body.
    pub body: Bytes,
}

#[derive(Debug)]
struct DaemonState {
    status_body: String,
    serve_config: Option<Value>,
    requests: Vec<RecordedRequest>,
}

/// Scriptable local API double.
#[derive(Debug, Clone)]
pub struct MockDaemon {
    state: Arc<Mutex<DaemonState>>,
    fail_status: Option<u16>,
    stall: bool,
}

impl Default for MockDaemon {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDaemon {
    /// A healthy daemon answering `/status` with [`status_fixture`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DaemonState {
                status_body: status_fixture().to_string(),
                serve_config: None,
                requests: Vec::new(),
            })),
            fail_status: None,
            stall: false,
        }
    }

    /// Answer `/status` with `status`.
    #[must_use]
    pub fn with_status(self, status: &Value) -> Self {
        self.with_status_body(&status.to_string())
    }

    /// Answer `/status` with a raw body.
    #[must_use]
    pub fn with_status_body(self, body: &str) -> Self {
        self.state.lock().status_body = body.to_string();
        self
    }

    /// Answer every request with `status` and a plain-text error.
    #[must_use]
    pub fn fail_with(mut self, status: u16) -> Self {
        self.fail_status = Some(status);
        self
    }

    /// Never complete `connect`.
    #[must_use]
    pub fn stall_connect(mut self) -> Self {
        self.stall = true;
        self
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// The last serve configuration posted, as JSON.
    #[must_use]
    pub fn last_serve_config(&self) -> Option<Value> {
        self.state.lock().serve_config.clone()
    }

    /// Serve HTTP/1.1 on `io` until the peer hangs up.
    pub async fn serve_connection<S>(&self, io: S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let daemon = self.clone();
        let service = service_fn(move |request: Request<Incoming>| {
            let daemon = daemon.clone();
            async move { Ok::<_, Infallible>(daemon.handle(request).await) }
        });

        if let Err(e) = http1::Builder::new()
            .serve_connection(TokioIo::new(io), service)
            .await
        {
            debug!(error = %e, "mock daemon connection ended with error");
        }
    }

    async fn handle(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        let (method, path, host, content_type) = {
            let headers = request.headers();
            let header_value = |name: header::HeaderName| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            (
                request.method().to_string(),
                request.uri().path().to_string(),
                header_value(header::HOST),
                header_value(header::CONTENT_TYPE),
            )
        };

        let body = match request.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => return respond(StatusCode::BAD_REQUEST, e.to_string()),
        };

        self.route(RecordedRequest {
            method,
            path,
            host,
            content_type,
            body,
        })
    }

    fn route(&self, request: RecordedRequest) -> Response<Full<Bytes>> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        if let Some(code) = self.fail_status {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return respond(status, "daemon unavailable\n");
        }

        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/localapi/v0/status") => respond(StatusCode::OK, state.status_body.clone()),
            ("GET", "/localapi/v0/serve-config") => {
                let body = state
                    .serve_config
                    .as_ref()
                    .map_or_else(|| "null".to_string(), Value::to_string);
                respond(StatusCode::OK, body)
            }
            ("POST", "/localapi/v0/serve-config") => {
                match serde_json::from_slice::<Value>(&request.body) {
                    Ok(config) => {
                        state.serve_config = Some(config);
                        respond(StatusCode::OK, "")
                    }
                    Err(e) => respond(StatusCode::BAD_REQUEST, e.to_string()),
                }
            }
            _ => respond(StatusCode::NOT_FOUND, "404 page not found\n"),
        }
    }
}

fn respond(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

impl LocalTransport for MockDaemon {
    type Stream = DuplexStream;

    async fn connect(&self) -> io::Result<Self::Stream> {
        if self.stall {
            std::future::pending::<()>().await;
        }

        let (client, server) = tokio::io::duplex(64 * 1024);
        let daemon = self.clone();
        tokio::spawn(async move { daemon.serve_connection(server).await });
        Ok(client)
    }

    fn endpoint(&self) -> &Path {
        Path::new("mock-tailscaled")
    }
}

/// A status document shaped like a running `tailscaled` answer.
#[must_use]
pub fn status_fixture() -> Value {
    json!({
        "Version": "1.80.2-t1234abcd",
        "TUN": true,
        "BackendState": "Running",
        "HaveNodeKey": true,
        "AuthURL": "",
        "TailscaleIPs": ["100.101.102.103", "fd7a:115c:a1e0::1"],
        "Self": {
            "ID": "nSELF1CNTRL",
            "PublicKey": "nodekey:0123456789abcdef",
            "HostName": "host",
            "DNSName": "host.example.ts.net.",
            "OS": "linux",
            "UserID": 1234,
            "TailscaleIPs": ["100.101.102.103", "fd7a:115c:a1e0::1"],
            "AllowedIPs": null,
            "Addrs": ["192.0.2.10:41641"],
            "CurAddr": "",
            "Relay": "fra",
            "RxBytes": 0,
            "TxBytes": 0,
            "Created": "2024-11-02T10:00:00Z",
            "LastWrite": "0001-01-01T00:00:00Z",
            "LastSeen": "0001-01-01T00:00:00Z",
            "LastHandshake": "0001-01-01T00:00:00Z",
            "Online": true,
            "ExitNode": false,
            "ExitNodeOption": false,
            "Active": false,
            "PeerAPIURL": ["http://100.101.102.103:34567"],
            "Capabilities": ["https://tailscale.com/cap/funnel"],
            "CapMap": {
                "https://tailscale.com/cap/funnel": null,
                "funnel-ports?ports=443,8443,10000": null
            },
            "InNetworkMap": true,
            "InMagicSock": false,
            "InEngine": false,
            "KeyExpiry": "2025-05-01T10:00:00Z"
        },
        "Health": null,
        "MagicDNSSuffix": "example.ts.net",
        "CurrentTailnet": {
            "Name": "user@example.com",
            "MagicDNSSuffix": "example.ts.net",
            "MagicDNSEnabled": true
        },
        "CertDomains": ["host.example.ts.net"],
        "Peer": {
            "nodekey:aaaa": {
                "ID": "nPEER1CNTRL",
                "HostName": "laptop",
                "DNSName": "laptop.example.ts.net.",
                "OS": "macOS",
                "TailscaleIPs": ["100.64.0.2"],
                "Online": true,
                "sshHostKeys": null
            },
            "nodekey:bbbb": {
                "ID": "nPEER2CNTRL",
                "HostName": "phone",
                "DNSName": "phone.example.ts.net.",
                "OS": "iOS",
                "TailscaleIPs": ["100.64.0.3"],
                "Online": false
            }
        },
        "User": {
            "1234": {
                "ID": 1234,
                "LoginName": "user@example.com",
                "DisplayName": "Example User",
                "ProfilePicURL": "",
                "Roles": []
            }
        },
        "ClientVersion": {"RunningLatest": true}
    })
}
