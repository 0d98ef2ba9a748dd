//! Tool handlers
//!
//! Routes `tools/call` invocations to the Tailscale clients and renders the
//! outcome as text.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use tsmcp_tailscale::{
    ControlPlaneClient, DefaultTransport, Exposure, LocalClient, LocalTransport, TokenManager,
};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::protocol::CallToolResult;
use crate::tools;

pub mod devices;
pub mod exposure;
pub mod status;

/// Everything a tool invocation may touch.
#[derive(Debug)]
pub struct ToolContext<T> {
    tokens: TokenManager,
    local: LocalClient<T>,
    exposure: Exposure,
    serve_port: u16,
}

impl ToolContext<DefaultTransport> {
    /// Build the context described by `config`, talking to the platform daemon.
    pub fn from_config(config: &BridgeConfig) -> BridgeResult<Self> {
        let api = ControlPlaneClient::new(config.api.clone())
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        let tokens = TokenManager::new(api, config.credentials.clone())
            .with_max_attempts(config.max_token_attempts);
        let local = match &config.socket {
            Some(path) => LocalClient::with_endpoint(path),
            None => LocalClient::new(),
        };
        Ok(Self::new(tokens, local, config.exposure, config.serve_port))
    }
}

impl<T: LocalTransport> ToolContext<T> {
    /// Create a context from its parts.
    pub fn new(
        tokens: TokenManager,
        local: LocalClient<T>,
        exposure: Exposure,
        serve_port: u16,
    ) -> Self {
        Self {
            tokens,
            local,
            exposure,
            serve_port,
        }
    }

    /// Token manager for the control plane.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Local daemon client.
    pub fn local(&self) -> &LocalClient<T> {
        &self.local
    }

    /// Who can reach published ports.
    pub fn exposure(&self) -> Exposure {
        self.exposure
    }

    /// Port the published endpoint listens on.
    pub fn serve_port(&self) -> u16 {
        self.serve_port
    }

    /// Invoke tool `name`.
    ///
    /// Tailscale failures are returned as an `isError` result. Unknown tools
    /// and malformed arguments are returned as errors.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> BridgeResult<CallToolResult> {
        debug!(tool = name, "calling tool");

        let outcome = match name {
            tools::LIST_DEVICES => devices::list(self).await,
            tools::EXPOSE_LOCAL_PORT => exposure::toggle(self, parse_params(arguments)?).await,
            tools::LOCAL_STATUS => status::summary(self).await,
            _ => return Err(BridgeError::ToolNotFound(name.to_string())),
        };

        match outcome {
            Ok(text) => Ok(CallToolResult::text(text)),
            Err(e) if e.is_tool_failure() => {
                warn!(tool = name, error = %e, "tool failed");
                Ok(CallToolResult::error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// Helper functions
// ─────────────────────────────────────────────────────────────

/// Parse params into a typed struct
///
/// A missing (`null`) params value is read as an empty object.
pub fn parse_params<T: for<'de> Deserialize<'de>>(params: Value) -> BridgeResult<T> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| BridgeError::InvalidParams(e.to_string()))
}
