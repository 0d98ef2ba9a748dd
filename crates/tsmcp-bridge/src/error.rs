//! Bridge error types

use thiserror::Error;
use tsmcp_tailscale::TailscaleError;

/// Bridge error type
#[derive(Debug, Error)]
pub enum BridgeError {
    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed JSON-RPC envelope
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Method not found
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Tool not registered
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A Tailscale operation failed
    #[error(transparent)]
    Tailscale(#[from] TailscaleError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Get the JSON-RPC error code for this error
    pub fn code(&self) -> i32 {
        use crate::protocol::{
            INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
            UNAVAILABLE,
        };
        match self {
            Self::Json(_) => PARSE_ERROR,
            Self::InvalidRequest(_) => INVALID_REQUEST,
            Self::MethodNotFound(_) => METHOD_NOT_FOUND,
            Self::ToolNotFound(_) | Self::InvalidParams(_) => INVALID_PARAMS,
            Self::Tailscale(_) => UNAVAILABLE,
            Self::Config(_) | Self::Internal(_) | Self::Io(_) => INTERNAL_ERROR,
        }
    }

    /// Whether this error belongs in a tool result rather than a protocol error.
    ///
    /// Failures of the operation itself are reported to the model as an
    /// `isError` result; malformed calls are reported to the host.
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Self::Tailscale(_))
    }
}

/// Bridge result type
pub type BridgeResult<T> = Result<T, BridgeError>;
