//! Tailscale MCP bridge
//!
//! Serves Tailscale tools to an MCP host over stdio. The host writes one
//! JSON-RPC 2.0 message per line to stdin; the bridge answers on stdout.
//!
//! ## Protocol
//!
//! Request:
//! ```json
//! {"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "list-devices", "arguments": {}}}
//! ```
//!
//! Response:
//! ```json
//! {"jsonrpc": "2.0", "id": 1, "result": {"content": [{"type": "text", "text": "..."}], "isError": false}}
//! ```
//!
//! Error:
//! ```json
//! {"jsonrpc": "2.0", "id": 1, "error": {"code": -32602, "message": "..."}}
//! ```
//!
//! ## Tools
//!
//! - `list-devices`: devices in the tailnet, via the control-plane API
//! - `local-address-to-public-mapper`: publish or retract a local port through Serve/Funnel
//! - `local-status`: summary of the local daemon

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;

pub use config::{BridgeConfig, LogFormat};
pub use error::{BridgeError, BridgeResult};
pub use handlers::ToolContext;
pub use protocol::{ErrorResponse, Request, Response};
pub use server::Server;
