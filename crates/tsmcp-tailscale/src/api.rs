//! Control-plane API client.
//!
//! Talks to the Tailscale management API (`api.tailscale.com`) with a bearer
//! token obtained from [`TokenManager`](crate::oauth::TokenManager).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TailscaleError};

/// Default control-plane API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.tailscale.com/api/v2";

/// Tailnet name that resolves to the tailnet owning the OAuth client.
pub const DEFAULT_TAILNET: &str = "-";

/// Default request timeout for control-plane calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Control-plane connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// Tailnet to operate on.
    pub tailnet: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            tailnet: DEFAULT_TAILNET.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// A device in the tailnet as reported by the control-plane API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    /// Tailscale IP addresses.
    pub addresses: Vec<String>,
    /// Whether the device is authorized to join the tailnet.
    pub authorized: bool,
    /// Whether the device refuses incoming connections.
    pub blocks_incoming_connections: bool,
    /// Client version string.
    pub client_version: String,
    /// Creation timestamp.
    pub created: String,
    /// Key expiry timestamp.
    pub expires: String,
    /// Machine hostname.
    pub hostname: String,
    /// Legacy device ID.
    pub id: String,
    /// Whether the device is shared in from another tailnet.
    pub is_external: bool,
    /// Whether key expiry is disabled.
    pub key_expiry_disabled: bool,
    /// Last time the device was seen by the control plane.
    pub last_seen: String,
    /// Machine key.
    pub machine_key: String,
    /// MagicDNS name.
    pub name: String,
    /// Stable node ID.
    pub node_id: String,
    /// Node key.
    pub node_key: String,
    /// Operating system.
    pub os: String,
    /// Tailnet lock error, if any.
    pub tailnet_lock_error: String,
    /// Tailnet lock key.
    pub tailnet_lock_key: String,
    /// Whether a client update is available.
    pub update_available: bool,
    /// Owning user login.
    pub user: String,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default)]
    devices: Vec<Device>,
}

/// Client for the Tailscale control-plane API.
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ControlPlaneClient {
    /// Create a client for the given settings.
    ///
    /// # Errors
    ///
    /// Returns `TailscaleError::Config` if the HTTP client cannot be built.
    pub fn new(mut config: ApiConfig) -> Result<Self> {
        while config.base_url.ends_with('/') {
            config.base_url.pop();
        }
        if config.base_url.is_empty() {
            return Err(TailscaleError::config("API base URL is empty"));
        }
        if config.tailnet.trim().is_empty() {
            config.tailnet = DEFAULT_TAILNET.to_string();
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("tailscale-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TailscaleError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Tailnet this client operates on.
    #[must_use]
    pub fn tailnet(&self) -> &str {
        &self.config.tailnet
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn devices_url(&self) -> String {
        self.url(&format!("/tailnet/{}/devices", self.config.tailnet))
    }

    /// List every device in the tailnet.
    ///
    /// # Errors
    ///
    /// - `TailscaleError::Http` if the API is unreachable
    /// - `TailscaleError::ApiStatus` on a non-200 response
    /// - `TailscaleError::JsonParse` if the body is not a device list
    pub async fn list_devices(&self, token: &str) -> Result<Vec<Device>> {
        let response = self
            .http
            .get(self.devices_url())
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(TailscaleError::api_status(status.as_u16(), body));
        }

        let body = response.bytes().await?;
        let list: DeviceList = serde_json::from_slice(&body)
            .map_err(|e| TailscaleError::json_parse(format!("failed to parse device list: {e}")))?;

        debug!(tailnet = %self.config.tailnet, count = list.devices.len(), "listed devices");
        Ok(list.devices)
    }

    /// Check whether the control plane accepts `token`.
    ///
    /// Any transport failure or non-200 answer counts as rejection.
    pub async fn is_token_valid(&self, token: &str) -> bool {
        match self
            .http
            .get(self.devices_url())
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) if response.status() == reqwest::StatusCode::OK => true,
            Ok(response) => {
                debug!(status = %response.status(), "token validation rejected");
                false
            }
            Err(e) => {
                debug!(error = %e, "token validation request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, DEFAULT_API_BASE);
        assert_eq!(config.tailnet, "-");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ControlPlaneClient::new(ApiConfig {
            base_url: "https://example.test/api/v2//".into(),
            ..ApiConfig::default()
        })
        .expect("client");
        assert_eq!(
            client.devices_url(),
            "https://example.test/api/v2/tailnet/-/devices"
        );
    }

    #[test]
    fn test_blank_tailnet_falls_back_to_default() {
        let client = ControlPlaneClient::new(ApiConfig {
            tailnet: "  ".into(),
            ..ApiConfig::default()
        })
        .expect("client");
        assert_eq!(client.tailnet(), DEFAULT_TAILNET);
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let err = ControlPlaneClient::new(ApiConfig {
            base_url: "/".into(),
            ..ApiConfig::default()
        })
        .expect_err("empty base");
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_device_deserialization() {
        let json = r#"{
            "addresses": ["100.64.0.1", "fd7a:115c:a1e0::1"],
            "authorized": true,
            "clientVersion": "1.80.0",
            "hostname": "laptop",
            "id": "12345",
            "name": "laptop.example.ts.net",
            "nodeId": "nABC123CNTRL",
            "os": "macOS",
            "lastSeen": "2025-01-01T00:00:00Z",
            "user": "user@example.com",
            "updateAvailable": false
        }"#;

        let device: Device = serde_json::from_str(json).expect("should parse");
        assert_eq!(device.hostname, "laptop");
        assert_eq!(device.node_id, "nABC123CNTRL");
        assert_eq!(device.addresses.len(), 2);
        assert!(device.authorized);
        assert!(!device.is_external);
        assert!(device.machine_key.is_empty());
    }

    #[test]
    fn test_device_list_missing_devices_is_empty() {
        let list: DeviceList = serde_json::from_str("{}").expect("should parse");
        assert!(list.devices.is_empty());
    }
}
