//! `list-devices`

use std::fmt::Write as _;

use tsmcp_tailscale::{Device, LocalTransport};

use super::ToolContext;
use crate::error::BridgeResult;

/// Fetch the tailnet's devices with a validated token.
pub async fn list<T: LocalTransport>(ctx: &ToolContext<T>) -> BridgeResult<String> {
    let token = ctx.tokens().get_token().await?;
    let api = ctx.tokens().api();
    let devices = api.list_devices(&token).await?;
    Ok(format_devices(api.tailnet(), &devices))
}

/// Render one line per device under a count header.
pub fn format_devices(tailnet: &str, devices: &[Device]) -> String {
    if devices.is_empty() {
        return format!("No devices found in tailnet '{tailnet}'");
    }

    let noun = if devices.len() == 1 { "device" } else { "devices" };
    let mut out = format!("Found {} {noun} in tailnet '{tailnet}':", devices.len());
    for device in devices {
        let name = if device.name.is_empty() {
            &device.hostname
        } else {
            &device.name
        };
        let addresses = if device.addresses.is_empty() {
            "no addresses".to_string()
        } else {
            device.addresses.join(", ")
        };
        let last_seen = if device.last_seen.is_empty() {
            "never"
        } else {
            &device.last_seen
        };
        let auth = if device.authorized {
            "authorized"
        } else {
            "unauthorized"
        };

        let _ = write!(
            out,
            "\n- {name} ({}) [{addresses}] last seen {last_seen}, {auth}",
            device.os
        );
        if device.update_available {
            out.push_str(", update available");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, os: &str, address: &str) -> Device {
        Device {
            name: name.to_string(),
            hostname: name.split('.').next().unwrap_or_default().to_string(),
            os: os.to_string(),
            addresses: vec![address.to_string()],
            authorized: true,
            ..Device::default()
        }
    }

    #[test]
    fn test_empty_tailnet() {
        assert_eq!(format_devices("-", &[]), "No devices found in tailnet '-'");
    }

    #[test]
    fn test_single_device() {
        let mut laptop = device("laptop.example.ts.net", "macOS", "100.64.0.1");
        laptop.last_seen = "2025-01-01T00:00:00Z".into();
        assert_eq!(
            format_devices("example.com", &[laptop]),
            "Found 1 device in tailnet 'example.com':\n\
             - laptop.example.ts.net (macOS) [100.64.0.1] last seen 2025-01-01T00:00:00Z, authorized"
        );
    }

    #[test]
    fn test_falls_back_to_hostname() {
        let mut unnamed = device("", "linux", "100.64.0.9");
        unnamed.hostname = "builder".into();
        unnamed.authorized = false;
        unnamed.update_available = true;
        let text = format_devices("-", &[unnamed, device("b.ts.net", "iOS", "100.64.0.2")]);
        assert!(text.starts_with("Found 2 devices"));
        assert!(text.contains(
            "- builder (linux) [100.64.0.9] last seen never, unauthorized, update available"
        ));
    }
}
