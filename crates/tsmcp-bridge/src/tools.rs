//! Tool registry
//!
//! Names, descriptions and argument schemas advertised by `tools/list`.

use serde_json::json;

use crate::protocol::ToolDefinition;

/// Lists every device in the tailnet.
pub const LIST_DEVICES: &str = "list-devices";

/// Publishes or retracts a local port through Serve/Funnel.
pub const EXPOSE_LOCAL_PORT: &str = "local-address-to-public-mapper";

/// Summarizes the local daemon state.
pub const LOCAL_STATUS: &str = "local-status";

/// All registered tools, in advertised order.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: LIST_DEVICES.to_string(),
            description: "List All Devices on Your Tailnet".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: EXPOSE_LOCAL_PORT.to_string(),
            description: "Expose your local address to the public".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "active": {
                        "type": "boolean",
                        "description": "Select Whether to Expose your local address to the public or not"
                    },
                    "PORT": {
                        "type": "string",
                        "description": "Enter the local address to expose to the public Example Input 3000 , 4000 , 5000"
                    }
                },
                "required": ["active"]
            }),
        },
        ToolDefinition {
            name: LOCAL_STATUS.to_string(),
            description: "Show the state of the local Tailscale daemon".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

/// Whether `name` is a registered tool.
pub fn is_registered(name: &str) -> bool {
    matches!(name, LIST_DEVICES | EXPOSE_LOCAL_PORT | LOCAL_STATUS)
}
