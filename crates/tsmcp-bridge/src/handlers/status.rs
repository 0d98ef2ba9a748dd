//! `local-status`

use std::fmt::Write as _;

use tracing::debug;
use tsmcp_tailscale::{LocalTransport, ServeConfig, Status};

use super::ToolContext;
use crate::error::BridgeResult;

/// Summarize the local daemon and what it currently serves.
pub async fn summary<T: LocalTransport>(ctx: &ToolContext<T>) -> BridgeResult<String> {
    let status = ctx.local().get_status().await?;

    // Older daemons and non-admin callers may refuse serve-config.
    let serve = match ctx.local().get_serve_config().await {
        Ok(config) => Some(config),
        Err(e) => {
            debug!(error = %e, "serve config unavailable");
            None
        }
    };

    Ok(format_summary(&status, serve.as_ref()))
}

/// Render the status summary.
pub fn format_summary(status: &Status, serve: Option<&ServeConfig>) -> String {
    let mut out = format!("Backend state: {}", status.backend_state);
    if !status.auth_url.is_empty() {
        let _ = write!(out, "\nLogin URL: {}", status.auth_url);
    }
    let _ = write!(
        out,
        "\nDNS name: {}",
        status.self_dns_name().as_deref().unwrap_or("unknown")
    );
    if let Some(tailnet) = &status.current_tailnet {
        let _ = write!(out, "\nTailnet: {}", tailnet.name);
    }
    let ips = if status.tailscale_ips.is_empty() {
        "none".to_string()
    } else {
        status.tailscale_ips.join(", ")
    };
    let _ = write!(out, "\nTailscale IPs: {ips}");
    let _ = write!(
        out,
        "\nOnline peers: {} of {}",
        status.online_peers(),
        status.peer.len()
    );
    for warning in &status.health {
        let _ = write!(out, "\nHealth: {warning}");
    }

    match serve {
        None => out.push_str("\nServe config: unknown"),
        Some(config) if config.is_empty() => out.push_str("\nServe config: none"),
        Some(config) => {
            out.push_str("\nServe config: active");
            for (host_port, mount, target) in config.proxies() {
                let scope = if config.is_funnel_allowed(host_port.as_str()) {
                    "public"
                } else {
                    "tailnet"
                };
                let _ = write!(out, "\n- https://{host_port}{mount} -> {target} ({scope})");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsmcp_tailscale::testing::status_fixture;
    use tsmcp_tailscale::{Exposure, build_publish_config};

    fn fixture() -> Status {
        serde_json::from_value(status_fixture()).expect("fixture")
    }

    #[test]
    fn test_summary_without_serve() {
        let text = format_summary(&fixture(), Some(&ServeConfig::default()));
        assert_eq!(
            text,
            "Backend state: Running\n\
             DNS name: host.example.ts.net\n\
             Tailnet: user@example.com\n\
             Tailscale IPs: 100.101.102.103, fd7a:115c:a1e0::1\n\
             Online peers: 1 of 2\n\
             Serve config: none"
        );
    }

    #[test]
    fn test_summary_lists_proxies() {
        let config = build_publish_config(
            "host.example.ts.net",
            443,
            "http://localhost:3000",
            Exposure::Funnel,
        );
        let text = format_summary(&fixture(), Some(&config));
        assert!(text.ends_with(
            "Serve config: active\n- https://host.example.ts.net:443/ -> http://localhost:3000 (public)"
        ));
    }

    #[test]
    fn test_summary_serve_unknown() {
        let status = Status {
            backend_state: "NeedsLogin".into(),
            auth_url: "https://login.tailscale.com/a/abc".into(),
            ..Status::default()
        };
        let text = format_summary(&status, None);
        assert!(text.contains("Login URL: https://login.tailscale.com/a/abc"));
        assert!(text.contains("DNS name: unknown"));
        assert!(text.contains("Tailscale IPs: none"));
        assert!(text.ends_with("Serve config: unknown"));
    }
}
