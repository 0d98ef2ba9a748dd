//! Error types for Tailscale operations.
//!
//! Covers the control-plane API (OAuth and device listing), the local API
//! spoken to `tailscaled` over its local transport, and response decoding.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Tailscale operations.
pub type Result<T> = std::result::Result<T, TailscaleError>;

/// Errors that can occur during Tailscale operations.
#[derive(Debug, Error)]
pub enum TailscaleError {
    /// Invalid or missing configuration (credentials, URLs).
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// OAuth token acquisition or validation failed.
    #[error("authentication failed: {reason}")]
    AuthFailed {
        /// Reason for the authentication failure.
        reason: String,
    },

    /// Transport failure talking to the control-plane API.
    #[error("http error: {message}")]
    Http {
        /// Description of the transport failure.
        message: String,
    },

    /// The control-plane API answered with a non-success status.
    #[error("control-plane API returned {status}: {body}")]
    ApiStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// Local API error (connection, handshake or non-success response).
    #[error("local API error: {message}")]
    ApiError {
        /// Description of the API error.
        message: String,
    },

    /// Socket path does not exist or is inaccessible.
    #[error("socket not found: {path}")]
    SocketNotFound {
        /// Path to the expected socket.
        path: PathBuf,
    },

    /// Timeout waiting for operation to complete.
    #[error("timeout: {operation} did not complete within {timeout_secs} seconds")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// Timeout duration in seconds.
        timeout_secs: u64,
    },

    /// JSON parsing error from API responses.
    #[error("json parse error: {message}")]
    JsonParse {
        /// Description of the parse error.
        message: String,
    },

    /// IO error on the local transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Longest response body kept in an `ApiStatus` error.
const MAX_ERROR_BODY: usize = 512;

impl TailscaleError {
    /// Creates a `Config` error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an `AuthFailed` error with a reason.
    #[must_use]
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    /// Creates an `Http` error with a message.
    #[must_use]
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Creates an `ApiStatus` error, truncating long bodies.
    #[must_use]
    pub fn api_status(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("...");
        }
        Self::ApiStatus { status, body }
    }

    /// Creates an `ApiError` with a message.
    #[must_use]
    pub fn api_error(message: impl Into<String>) -> Self {
        Self::ApiError {
            message: message.into(),
        }
    }

    /// Creates a `SocketNotFound` error with the path.
    #[must_use]
    pub fn socket_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SocketNotFound { path: path.into() }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_secs,
        }
    }

    /// Creates a `JsonParse` error with a message.
    #[must_use]
    pub fn json_parse(message: impl Into<String>) -> Self {
        Self::JsonParse {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } | Self::ApiError { .. } => true,
            Self::ApiStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates a configuration problem.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::SocketNotFound { .. })
    }

    /// Returns `true` if this error indicates an authentication problem.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::AuthFailed { .. } => true,
            Self::ApiStatus { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for TailscaleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::json_parse(err.to_string())
        } else {
            Self::http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_auth_failed_error_display() {
        let err = TailscaleError::auth_failed("token rejected after 3 attempts");
        assert_eq!(
            err.to_string(),
            "authentication failed: token rejected after 3 attempts"
        );
    }

    #[test]
    fn test_api_status_error_display() {
        let err = TailscaleError::api_status(500, "internal error");
        assert_eq!(
            err.to_string(),
            "control-plane API returned 500: internal error"
        );
    }

    #[test]
    fn test_api_status_truncates_long_body() {
        let err = TailscaleError::api_status(502, "x".repeat(4096));
        match err {
            TailscaleError::ApiStatus { body, .. } => {
                assert_eq!(body.len(), MAX_ERROR_BODY + 3);
                assert!(body.ends_with("..."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_status_truncation_respects_char_boundary() {
        let err = TailscaleError::api_status(500, "é".repeat(MAX_ERROR_BODY));
        assert!(matches!(err, TailscaleError::ApiStatus { .. }));
    }

    #[test]
    fn test_socket_not_found_error_display() {
        let err = TailscaleError::socket_not_found("/var/run/tailscale/tailscaled.sock");
        assert_eq!(
            err.to_string(),
            "socket not found: /var/run/tailscale/tailscaled.sock"
        );
    }

    #[test]
    fn test_timeout_error_display() {
        let err = TailscaleError::timeout("local API connect", 10);
        assert_eq!(
            err.to_string(),
            "timeout: local API connect did not complete within 10 seconds"
        );
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let ts_err: TailscaleError = io_err.into();
        assert!(matches!(ts_err, TailscaleError::Io(_)));
        assert!(ts_err.to_string().contains("pipe closed"));
    }

    #[test_case(TailscaleError::http("reset"), true ; "transport")]
    #[test_case(TailscaleError::timeout("connect", 10), true ; "timeout")]
    #[test_case(TailscaleError::api_status(503, ""), true ; "server error")]
    #[test_case(TailscaleError::api_status(429, ""), true ; "rate limited")]
    #[test_case(TailscaleError::api_status(404, ""), false ; "not found")]
    #[test_case(TailscaleError::auth_failed("nope"), false ; "auth")]
    #[test_case(TailscaleError::json_parse("eof"), false ; "decode")]
    fn test_is_recoverable(err: TailscaleError, expected: bool) {
        assert_eq!(err.is_recoverable(), expected);
    }

    #[test]
    fn test_is_auth_error() {
        assert!(TailscaleError::auth_failed("test").is_auth_error());
        assert!(TailscaleError::api_status(401, "").is_auth_error());
        assert!(TailscaleError::api_status(403, "").is_auth_error());

        assert!(!TailscaleError::api_status(500, "").is_auth_error());
        assert!(!TailscaleError::config("test").is_auth_error());
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(TailscaleError::config("missing client id").is_configuration_error());
        assert!(TailscaleError::socket_not_found("/path").is_configuration_error());

        assert!(!TailscaleError::auth_failed("test").is_configuration_error());
        assert!(!TailscaleError::api_error("test").is_configuration_error());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TailscaleError>();
    }
}
