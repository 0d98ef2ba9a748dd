//! Validated bridge configuration.

use std::path::PathBuf;

use tsmcp_tailscale::{ApiConfig, Credentials, Exposure};

/// Default port the serve rule listens on.
pub const DEFAULT_SERVE_PORT: u16 = 443;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Everything the bridge needs to start serving.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// OAuth client credentials.
    pub credentials: Credentials,
    /// Control-plane settings.
    pub api: ApiConfig,
    /// Local daemon socket or pipe, `None` for the platform default.
    pub socket: Option<PathBuf>,
    /// Who can reach published ports.
    pub exposure: Exposure,
    /// Port the serve rule listens on.
    pub serve_port: u16,
    /// Token acquisitions before giving up.
    pub max_token_attempts: u32,
    /// Log output format.
    pub log_format: LogFormat,
}
