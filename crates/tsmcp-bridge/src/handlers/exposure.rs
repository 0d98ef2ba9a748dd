//! `local-address-to-public-mapper`
//!
//! Publishes `http://localhost:<PORT>` through Serve (and Funnel, when the
//! bridge is configured for public exposure), or retracts whatever is
//! published. Each call replaces the daemon's whole serve configuration.

use serde::Deserialize;
use tracing::info;
use tsmcp_tailscale::{
    Exposure, LocalTransport, ServeConfig, TailscaleError, build_publish_config,
};

use super::ToolContext;
use crate::error::{BridgeError, BridgeResult};

/// Arguments of the mapper tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ExposeParams {
    /// Publish when true, retract when false.
    pub active: bool,
    /// Local port to publish; required when `active`.
    #[serde(rename = "PORT", default)]
    pub port: Option<String>,
}

impl ExposeParams {
    /// The local port to publish.
    pub fn local_port(&self) -> BridgeResult<u16> {
        let raw = self
            .port
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                BridgeError::InvalidParams("PORT is required when active is true".into())
            })?;

        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid_port(raw));
        }
        match raw.parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(invalid_port(raw)),
        }
    }
}

fn invalid_port(raw: &str) -> BridgeError {
    BridgeError::InvalidParams(format!(
        "PORT must be a number between 1 and 65535, got '{raw}'"
    ))
}

/// Publish or retract, depending on `params.active`.
pub async fn toggle<T: LocalTransport>(
    ctx: &ToolContext<T>,
    params: ExposeParams,
) -> BridgeResult<String> {
    if params.active {
        let port = params.local_port()?;
        publish(ctx, port).await
    } else {
        retract(ctx).await
    }
}

async fn publish<T: LocalTransport>(ctx: &ToolContext<T>, local_port: u16) -> BridgeResult<String> {
    let status = ctx.local().get_status().await?;
    let dns_name = status.self_dns_name().ok_or_else(|| {
        TailscaleError::api_error("daemon reported no DNS name for this node")
    })?;

    let target = format!("http://localhost:{local_port}");
    let config = build_publish_config(&dns_name, ctx.serve_port(), &target, ctx.exposure());
    ctx.local().set_serve_config(&config).await?;

    let url = public_url(&dns_name, ctx.serve_port());
    info!(%target, %url, exposure = ?ctx.exposure(), "published local port");
    Ok(format!(
        "Server is now exposing {local_port} to {}, you can access it at {url}",
        audience(ctx.exposure())
    ))
}

async fn retract<T: LocalTransport>(ctx: &ToolContext<T>) -> BridgeResult<String> {
    ctx.local().set_serve_config(&ServeConfig::default()).await?;
    info!("retracted serve configuration");
    Ok(format!(
        "Server is no longer exposing to {}",
        audience(ctx.exposure())
    ))
}

fn audience(exposure: Exposure) -> &'static str {
    match exposure {
        Exposure::Funnel => "the public",
        Exposure::Tailnet => "your tailnet",
    }
}

/// HTTPS URL of a published node; the port is omitted when it is 443.
pub fn public_url(dns_name: &str, port: u16) -> String {
    if port == 443 {
        format!("https://{dns_name}")
    } else {
        format!("https://{dns_name}:{port}")
    }
}
