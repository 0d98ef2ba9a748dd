//! Local API status snapshot (`GET /localapi/v0/status`).
//!
//! `tailscaled` encodes nil slices and maps as `null`, so collection fields
//! accept `null` as empty.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tailscale status information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Status {
    /// Daemon version.
    pub version: String,
    /// Whether a TUN device is in use.
    #[serde(rename = "TUN")]
    pub tun: bool,
    /// Backend state (e.g., "Running", "`NeedsLogin`").
    pub backend_state: String,
    /// Whether the node has a node key.
    pub have_node_key: bool,
    /// Interactive login URL, when one is pending.
    #[serde(rename = "AuthURL")]
    pub auth_url: String,
    /// This node's Tailscale IPs.
    #[serde(rename = "TailscaleIPs", deserialize_with = "null_as_default")]
    pub tailscale_ips: Vec<String>,
    /// This node.
    #[serde(rename = "Self")]
    pub self_node: Option<Node>,
    /// Health warnings.
    #[serde(deserialize_with = "null_as_default")]
    pub health: Vec<String>,
    /// MagicDNS suffix of the tailnet.
    #[serde(rename = "MagicDNSSuffix")]
    pub magic_dns_suffix: String,
    /// Current tailnet.
    pub current_tailnet: Option<Tailnet>,
    /// Domains this node can obtain certificates for.
    pub cert_domains: Option<Vec<String>>,
    /// Peers keyed by node public key.
    #[serde(deserialize_with = "null_as_default")]
    pub peer: HashMap<String, Node>,
    /// Users keyed by user ID.
    #[serde(deserialize_with = "null_as_default")]
    pub user: HashMap<String, User>,
    /// Client update information.
    pub client_version: Option<ClientVersion>,
}

impl Status {
    /// This node's MagicDNS name without the trailing dot.
    ///
    /// Returns `None` when the daemon reports no self node or an empty name.
    #[must_use]
    pub fn self_dns_name(&self) -> Option<String> {
        self.self_node
            .as_ref()
            .map(|node| trim_dns_name(&node.dns_name).to_string())
            .filter(|name| !name.is_empty())
    }

    /// Number of peers currently online.
    #[must_use]
    pub fn online_peers(&self) -> usize {
        self.peer.values().filter(|p| p.online).count()
    }
}

/// Strip the trailing root dot from a fully-qualified DNS name.
#[must_use]
pub fn trim_dns_name(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// A node as seen by the local daemon (self or peer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Node {
    /// Stable node ID.
    #[serde(rename = "ID")]
    pub id: String,
    /// Node public key.
    pub public_key: String,
    /// Hostname.
    pub host_name: String,
    /// Fully-qualified MagicDNS name (with trailing dot).
    #[serde(rename = "DNSName")]
    pub dns_name: String,
    /// Operating system.
    #[serde(rename = "OS")]
    pub os: String,
    /// Owning user ID.
    #[serde(rename = "UserID")]
    pub user_id: i64,
    /// Tailscale IPs.
    #[serde(rename = "TailscaleIPs", deserialize_with = "null_as_default")]
    pub tailscale_ips: Vec<String>,
    /// Allowed IP prefixes.
    #[serde(rename = "AllowedIPs", deserialize_with = "null_as_default")]
    pub allowed_ips: Vec<String>,
    /// Known endpoints.
    #[serde(deserialize_with = "null_as_default")]
    pub addrs: Vec<String>,
    /// Current direct address, if any.
    pub cur_addr: String,
    /// Preferred DERP region.
    pub relay: String,
    /// Bytes received.
    pub rx_bytes: i64,
    /// Bytes sent.
    pub tx_bytes: i64,
    /// Creation timestamp.
    pub created: String,
    /// Last write timestamp.
    pub last_write: String,
    /// Last seen timestamp.
    pub last_seen: String,
    /// Last `WireGuard` handshake.
    pub last_handshake: String,
    /// Whether the node is online.
    pub online: bool,
    /// Whether this node is the active exit node.
    pub exit_node: bool,
    /// Whether this node can be used as an exit node.
    pub exit_node_option: bool,
    /// Whether there is recent traffic to the node.
    pub active: bool,
    /// Peer API URLs.
    #[serde(rename = "PeerAPIURL", deserialize_with = "null_as_default")]
    pub peer_api_url: Vec<String>,
    /// Legacy capability list.
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub capabilities: Vec<String>,
    /// Capability map.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "null_as_default")]
    pub cap_map: BTreeMap<String, serde_json::Value>,
    /// Whether the node is in the network map.
    pub in_network_map: bool,
    /// Whether the node is known to magicsock.
    pub in_magic_sock: bool,
    /// Whether the node is configured in the engine.
    pub in_engine: bool,
    /// Key expiry timestamp.
    pub key_expiry: String,
    /// SSH host keys.
    #[serde(
        rename = "sshHostKeys",
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub ssh_host_keys: Vec<String>,
}

/// Information about the current tailnet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Tailnet {
    /// Tailnet name.
    pub name: String,
    /// MagicDNS suffix.
    #[serde(rename = "MagicDNSSuffix")]
    pub magic_dns_suffix: String,
    /// Whether MagicDNS is enabled.
    #[serde(rename = "MagicDNSEnabled")]
    pub magic_dns_enabled: bool,
}

/// A user profile known to the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct User {
    /// User ID.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Login name.
    pub login_name: String,
    /// Display name.
    pub display_name: String,
    /// Avatar URL.
    #[serde(rename = "ProfilePicURL")]
    pub profile_pic_url: String,
    /// Roles.
    #[serde(deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
}

/// Client update status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClientVersion {
    /// Whether the running client is the latest release.
    pub running_latest: bool,
}
