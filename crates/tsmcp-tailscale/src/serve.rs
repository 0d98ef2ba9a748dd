//! Serve and Funnel configuration.
//!
//! These types mirror the JSON `tailscaled` accepts on
//! `POST /localapi/v0/serve-config`. Posting a configuration replaces the
//! previous one wholesale; posting an empty [`ServeConfig`] retracts
//! everything that was published.
//!
//! # Example
//!
//! ```rust
//! use tsmcp_tailscale::serve::{build_publish_config, Exposure};
//!
//! let config = build_publish_config(
//!     "host.example.ts.net",
//!     443,
//!     "http://localhost:3000",
//!     Exposure::Funnel,
//! );
//! assert!(config.is_funnel_allowed("host.example.ts.net:443"));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::null_as_default;

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

/// A `host:port` key in the `Web` and `AllowFunnel` maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostPort(String);

impl HostPort {
    /// Join a DNS name and a port.
    #[must_use]
    pub fn new(dns_name: &str, port: u16) -> Self {
        Self(format!("{dns_name}:{port}"))
    }

    /// The raw `host:port` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostPort {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// How a published port is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exposure {
    /// Reachable from the public internet through Funnel.
    #[default]
    Funnel,
    /// Reachable only from devices in the tailnet.
    Tailnet,
}

impl Exposure {
    /// Whether Funnel is enabled for this exposure.
    #[must_use]
    pub fn is_public(self) -> bool {
        matches!(self, Self::Funnel)
    }
}

/// Handler for a TCP port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TcpPortHandler {
    /// Terminate TLS and serve HTTPS from the `Web` map.
    #[serde(rename = "HTTPS", skip_serializing_if = "is_false")]
    pub https: bool,
    /// Serve plain HTTP from the `Web` map.
    #[serde(rename = "HTTP", skip_serializing_if = "is_false")]
    pub http: bool,
    /// Forward raw TCP to this `host:port`.
    #[serde(rename = "TCPForward", skip_serializing_if = "String::is_empty")]
    pub tcp_forward: String,
    /// SNI name to terminate TLS for when forwarding TCP.
    #[serde(rename = "TerminateTLS", skip_serializing_if = "String::is_empty")]
    pub terminate_tls: String,
}

/// Handler for a mount point on a web host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HttpHandler {
    /// Serve files from this absolute path.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Reverse-proxy to this URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub proxy: String,
    /// Respond with this static text.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl HttpHandler {
    /// A reverse-proxy handler.
    #[must_use]
    pub fn proxy(target: impl Into<String>) -> Self {
        Self {
            proxy: target.into(),
            ..Self::default()
        }
    }
}

/// Web server configuration for one `host:port`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WebServerConfig {
    /// Handlers keyed by mount point (e.g. `/`).
    #[serde(deserialize_with = "null_as_default")]
    pub handlers: BTreeMap<String, HttpHandler>,
}

/// Configuration for a Tailscale Service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceConfig {
    /// TCP port handlers.
    #[serde(rename = "TCP", skip_serializing_if = "BTreeMap::is_empty")]
    pub tcp: BTreeMap<u16, TcpPortHandler>,
    /// Web handlers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub web: BTreeMap<HostPort, WebServerConfig>,
    /// Whether the service is in TUN mode.
    #[serde(skip_serializing_if = "is_false")]
    pub tun: bool,
}

/// Full serve configuration of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServeConfig {
    /// TCP port handlers.
    #[serde(rename = "TCP", skip_serializing_if = "BTreeMap::is_empty")]
    pub tcp: BTreeMap<u16, TcpPortHandler>,
    /// Web handlers keyed by `host:port`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub web: BTreeMap<HostPort, WebServerConfig>,
    /// Tailscale Services keyed by service name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, ServiceConfig>,
    /// `host:port` entries exposed through Funnel.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub allow_funnel: BTreeMap<HostPort, bool>,
    /// Foreground (session-scoped) configurations.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub foreground: BTreeMap<String, ServeConfig>,
    /// Entity tag of the stored configuration; never sent on the wire.
    #[serde(skip)]
    pub etag: String,
}

impl ServeConfig {
    /// Whether nothing is served.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tcp.is_empty()
            && self.web.is_empty()
            && self.services.is_empty()
            && self.allow_funnel.is_empty()
            && self.foreground.is_empty()
    }

    /// Whether Funnel is enabled for `host_port`.
    #[must_use]
    pub fn is_funnel_allowed(&self, host_port: &str) -> bool {
        self.allow_funnel
            .get(&HostPort::from(host_port))
            .copied()
            .unwrap_or(false)
    }

    /// Reverse-proxy targets, as `(host:port, mount, target)`.
    pub fn proxies(&self) -> impl Iterator<Item = (&HostPort, &str, &str)> {
        self.web.iter().flat_map(|(host_port, web)| {
            web.handlers
                .iter()
                .filter(|(_, handler)| !handler.proxy.is_empty())
                .map(move |(mount, handler)| (host_port, mount.as_str(), handler.proxy.as_str()))
        })
    }
}

/// Build a configuration that serves HTTPS on `port` for `dns_name` and
/// reverse-proxies `/` to `target_url`.
///
/// With [`Exposure::Funnel`] the `host:port` is also opened to the public
/// internet. Neither `port` nor `target_url` is validated.
#[must_use]
pub fn build_publish_config(
    dns_name: &str,
    port: u16,
    target_url: &str,
    exposure: Exposure,
) -> ServeConfig {
    let host_port = HostPort::new(dns_name, port);

    let mut config = ServeConfig::default();
    config.tcp.insert(
        port,
        TcpPortHandler {
            https: true,
            ..TcpPortHandler::default()
        },
    );
    config.web.insert(
        host_port.clone(),
        WebServerConfig {
            handlers: BTreeMap::from([("/".to_string(), HttpHandler::proxy(target_url))]),
        },
    );
    if exposure.is_public() {
        config.allow_funnel.insert(host_port, true);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publish_config_shape() {
        let config = build_publish_config(
            "host.example.ts.net",
            443,
            "http://localhost:3000",
            Exposure::Funnel,
        );

        assert_eq!(config.tcp.len(), 1);
        assert!(config.tcp[&443].https);
        assert!(!config.tcp[&443].http);

        assert_eq!(config.web.len(), 1);
        let web = &config.web[&HostPort::from("host.example.ts.net:443")];
        assert_eq!(web.handlers.len(), 1);
        assert_eq!(web.handlers["/"].proxy, "http://localhost:3000");

        assert_eq!(config.allow_funnel.len(), 1);
        assert!(config.is_funnel_allowed("host.example.ts.net:443"));
    }

    #[test]
    fn test_publish_config_wire_format() {
        let config = build_publish_config(
            "host.example.ts.net",
            443,
            "http://localhost:3000",
            Exposure::Funnel,
        );

        let value = serde_json::to_value(&config).expect("serialize");
        assert_eq!(
            value,
            json!({
                "TCP": { "443": { "HTTPS": true } },
                "Web": {
                    "host.example.ts.net:443": {
                        "Handlers": { "/": { "Proxy": "http://localhost:3000" } }
                    }
                },
                "AllowFunnel": { "host.example.ts.net:443": true }
            })
        );
    }

    #[test]
    fn test_tailnet_exposure_skips_funnel() {
        let config = build_publish_config(
            "host.example.ts.net",
            443,
            "http://localhost:3000",
            Exposure::Tailnet,
        );
        assert!(config.allow_funnel.is_empty());
        assert!(!config.is_funnel_allowed("host.example.ts.net:443"));
        assert_eq!(config.web.len(), 1);
    }

    #[test]
    fn test_empty_config_serializes_to_empty_object() {
        let config = ServeConfig {
            etag: "W/\"abc\"".into(),
            ..ServeConfig::default()
        };
        assert!(config.is_empty());
        assert_eq!(serde_json::to_string(&config).expect("serialize"), "{}");
    }

    #[test]
    fn test_daemon_config_round_trip() {
        let json = r#"{
            "TCP": {"443": {"HTTPS": true}, "8443": {"TCPForward": "127.0.0.1:5432"}},
            "Web": {"host.example.ts.net:443": {"Handlers": {"/": {"Proxy": "http://127.0.0.1:3000"}, "/hello": {"Text": "hi"}}}},
            "AllowFunnel": {"host.example.ts.net:443": true}
        }"#;

        let config: ServeConfig = serde_json::from_str(json).expect("should parse");
        assert_eq!(config.tcp[&8443].tcp_forward, "127.0.0.1:5432");
        assert!(config.is_funnel_allowed("host.example.ts.net:443"));

        let proxies: Vec<_> = config.proxies().collect();
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].1, "/");
        assert_eq!(proxies[0].2, "http://127.0.0.1:3000");
    }

    #[test]
    fn test_exposure_serde() {
        assert_eq!(
            serde_json::to_string(&Exposure::Tailnet).expect("serialize"),
            "\"tailnet\""
        );
        assert_eq!(Exposure::default(), Exposure::Funnel);
    }

    #[test]
    fn test_null_handlers_decode_as_empty() {
        let json = r#"{
            "TCP": {"443": {"HTTPS": true}},
            "Web": {"host.example.ts.net:443": {"Handlers": null}}
        }"#;
        let config: ServeConfig = serde_json::from_str(json).expect("should parse");
        let web = config
            .web
            .get(&HostPort::from("host.example.ts.net:443"))
            .expect("web entry");
        assert!(web.handlers.is_empty());
        assert_eq!(config.proxies().count(), 0);
    }
}
