//! Command-line argument parsing with clap.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tsmcp_tailscale::api::{DEFAULT_API_BASE, DEFAULT_TAILNET};
use tsmcp_tailscale::oauth::DEFAULT_MAX_ATTEMPTS;
use tsmcp_tailscale::{ApiConfig, Credentials, Exposure, TailscaleError};

use crate::config::{BridgeConfig, DEFAULT_SERVE_PORT, LogFormat};
use crate::error::{BridgeError, BridgeResult};

/// Tailscale tools for MCP hosts, served over stdio.
#[derive(Parser, Debug, Clone)]
#[command(name = "tailscale-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// OAuth client ID.
    #[arg(long, env = "TS_OAUTH_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// OAuth client secret.
    #[arg(long, env = "TS_OAUTH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Tailnet to query; `-` is the tailnet owning the OAuth client.
    #[arg(long, default_value = DEFAULT_TAILNET)]
    pub tailnet: String,

    /// Control-plane API base URL.
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Control-plane request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub request_timeout: u64,

    /// Path of the tailscaled socket (named pipe on Windows).
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Who can reach ports published by the mapper tool.
    #[arg(long, value_enum, default_value_t = ExposureArg::Funnel)]
    pub exposure: ExposureArg,

    /// Port the published HTTPS endpoint listens on.
    #[arg(long, default_value_t = DEFAULT_SERVE_PORT)]
    pub serve_port: u16,

    /// Token acquisitions before a tool call fails.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_token_attempts: u32,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

/// Exposure options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ExposureArg {
    /// Public internet through Funnel.
    #[default]
    Funnel,
    /// Tailnet members only.
    Tailnet,
}

impl From<ExposureArg> for Exposure {
    fn from(arg: ExposureArg) -> Self {
        match arg {
            ExposureArg::Funnel => Self::Funnel,
            ExposureArg::Tailnet => Self::Tailnet,
        }
    }
}

/// Log format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormatArg {
    /// Human-readable lines.
    #[default]
    Text,
    /// JSON lines.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Validate the arguments into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when credentials are missing or blank,
    /// or when the serve port, request timeout or attempt count is zero.
    pub fn into_config(self) -> BridgeResult<BridgeConfig> {
        let credentials = Credentials::new(
            self.client_id.unwrap_or_default(),
            self.client_secret.unwrap_or_default(),
        )
        .map_err(|e| match e {
            TailscaleError::Config { message } => BridgeError::Config(message),
            other => BridgeError::Config(other.to_string()),
        })?;

        if self.serve_port == 0 {
            return Err(BridgeError::Config("--serve-port must be non-zero".into()));
        }
        if self.request_timeout == 0 {
            return Err(BridgeError::Config(
                "--request-timeout must be at least 1 second".into(),
            ));
        }
        if self.max_token_attempts == 0 {
            return Err(BridgeError::Config(
                "--max-token-attempts must be at least 1".into(),
            ));
        }

        Ok(BridgeConfig {
            credentials,
            api: ApiConfig {
                base_url: self.api_base,
                tailnet: self.tailnet,
                timeout: Duration::from_secs(self.request_timeout),
            },
            socket: self.socket,
            exposure: self.exposure.into(),
            serve_port: self.serve_port,
            max_token_attempts: self.max_token_attempts,
            log_format: self.log_format.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const CREDS: [&str; 5] = [
        "tailscale-mcp",
        "--client-id",
        "id",
        "--client-secret",
        "secret",
    ];

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let config = Cli::parse_from(CREDS).into_config().expect("config");
        assert_eq!(config.credentials.client_id(), "id");
        assert_eq!(config.api.base_url, DEFAULT_API_BASE);
        assert_eq!(config.api.tailnet, "-");
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert_eq!(config.socket, None);
        assert_eq!(config.exposure, Exposure::Funnel);
        assert_eq!(config.serve_port, 443);
        assert_eq!(config.max_token_attempts, 3);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_overrides() {
        let args = CREDS.into_iter().chain([
            "--tailnet",
            "example.com",
            "--socket",
            "/tmp/ts.sock",
            "--exposure",
            "tailnet",
            "--serve-port",
            "8443",
            "--max-token-attempts",
            "5",
            "--log-format",
            "json",
        ]);
        let config = Cli::parse_from(args).into_config().expect("config");
        assert_eq!(config.api.tailnet, "example.com");
        assert_eq!(config.socket, Some(PathBuf::from("/tmp/ts.sock")));
        assert_eq!(config.exposure, Exposure::Tailnet);
        assert_eq!(config.serve_port, 8443);
        assert_eq!(config.max_token_attempts, 5);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_blank_secret_is_config_error() {
        let cli = Cli::parse_from(["tailscale-mcp", "--client-id", "id", "--client-secret", "  "]);
        let err = cli.into_config().expect_err("blank secret");
        assert!(matches!(err, BridgeError::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: client ID and secret are required"
        );
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let args = CREDS.into_iter().chain(["--max-token-attempts", "0"]);
        let err = Cli::parse_from(args).into_config().expect_err("zero");
        assert!(err.to_string().contains("max-token-attempts"));
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let args = CREDS.into_iter().chain(["--request-timeout", "0"]);
        let err = Cli::parse_from(args).into_config().expect_err("zero");
        assert!(matches!(err, BridgeError::Config(_)));
        assert!(err.to_string().contains("request-timeout"));
    }

    #[test]
    fn test_unknown_exposure_rejected() {
        let args = CREDS.into_iter().chain(["--exposure", "everyone"]);
        assert!(Cli::try_parse_from(args).is_err());
    }
}
