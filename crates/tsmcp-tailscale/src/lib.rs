//! Tailscale clients for tailscale-mcp.
//!
//! Two APIs are covered:
//!
//! - the **control-plane API** (`api.tailscale.com`), authenticated with an
//!   OAuth client-credentials token managed by [`TokenManager`];
//! - the **local API** of `tailscaled`, reached over a Unix socket or named
//!   pipe through [`LocalClient`].
//!
//! [`serve`] builds the Serve/Funnel configuration posted to the local API.
//!
//! # Example
//!
//! ```rust,no_run
//! use tsmcp_tailscale::{ApiConfig, ControlPlaneClient, Credentials, TokenManager};
//!
//! # async fn example() -> tsmcp_tailscale::Result<()> {
//! let api = ControlPlaneClient::new(ApiConfig::default())?;
//! let tokens = TokenManager::new(api.clone(), Credentials::new("client-id", "client-secret")?);
//!
//! let token = tokens.get_token().await?;
//! for device in api.list_devices(&token).await? {
//!     println!("{} {:?}", device.name, device.addresses);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod error;
pub mod local;
pub mod oauth;
pub mod serve;
pub mod status;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use api::{ApiConfig, ControlPlaneClient, Device};
pub use error::{Result, TailscaleError};
pub use local::{LocalClient, LocalResponse, LocalTransport};
#[cfg(any(unix, windows))]
pub use local::DefaultTransport;
pub use oauth::{Credentials, OAuthToken, TokenManager};
pub use serve::{Exposure, ServeConfig, build_publish_config};
pub use status::Status;
