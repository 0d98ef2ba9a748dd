//! Stdio request loop
//!
//! Reads one JSON-RPC message per line and writes one response per line.
//! Notifications and stray responses from the host are never answered.

use std::io;

use serde::Serialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use tsmcp_tailscale::LocalTransport;

use crate::error::{BridgeError, BridgeResult};
use crate::handlers::{ToolContext, parse_params};
use crate::protocol::{
    CallToolParams, INVALID_REQUEST, InitializeResult, JSONRPC_VERSION, ListToolsResult,
    PARSE_ERROR, Request, Response,
};
use crate::tools;

/// MCP server over a [`ToolContext`].
#[derive(Debug)]
pub struct Server<T> {
    tools: ToolContext<T>,
}

impl<T: LocalTransport> Server<T> {
    /// Create a server dispatching to `tools`.
    pub fn new(tools: ToolContext<T>) -> Self {
        Self { tools }
    }

    /// The tool context.
    pub fn tools(&self) -> &ToolContext<T> {
        &self.tools
    }

    /// Serve until `reader` reaches end of input.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("tailscale-mcp serving on stdio");

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line).await,
                Err(e) => {
                    warn!(error = %e, "message is not valid UTF-8");
                    Some(Response::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}")))
                }
            };
            let Some(response) = response else {
                continue;
            };

            let mut encoded = serde_json::to_vec(&response).map_err(io::Error::other)?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await?;
            writer.flush().await?;
        }

        info!("input closed, shutting down");
        Ok(())
    }

    /// Handle one line of input, returning the response to write, if any.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unparseable message");
                return Some(Response::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}")));
            }
        };

        let Some(object) = value.as_object() else {
            return Some(Response::error(
                Value::Null,
                INVALID_REQUEST,
                "Invalid request: expected a JSON object",
            ));
        };

        // A response to something we never sent.
        if !object.contains_key("method")
            && (object.contains_key("result") || object.contains_key("error"))
        {
            debug!("ignoring response message from host");
            return None;
        }

        let id = object.get("id").cloned().unwrap_or(Value::Null);
        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(Response::error(id, INVALID_REQUEST, format!("Invalid request: {e}")));
            }
        };

        match request.jsonrpc.as_deref() {
            None | Some(JSONRPC_VERSION) => {}
            Some(version) => {
                return Some(Response::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: unsupported jsonrpc version '{version}'"),
                ));
            }
        }

        let Some(id) = request.id else {
            debug!(method = %request.method, "notification");
            return None;
        };

        debug!(%id, method = %request.method, "handling request");
        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => Response::success(id, result),
            Err(e) => {
                warn!(method = %request.method, error = %e, "request failed");
                Response::error(id, e.code(), e.to_string())
            }
        };
        Some(response)
    }

    async fn dispatch(&self, method: &str, params: Value) -> BridgeResult<Value> {
        match method {
            "initialize" => to_json(InitializeResult::default()),
            "ping" => Ok(json!({})),
            "tools/list" => to_json(ListToolsResult {
                tools: tools::definitions(),
            }),
            "tools/call" => {
                let call: CallToolParams = parse_params(params)?;
                let result = self.tools.call_tool(&call.name, call.arguments).await?;
                to_json(result)
            }
            _ => Err(BridgeError::MethodNotFound(method.to_string())),
        }
    }
}

/// Convert a result to JSON value
fn to_json<T: Serialize>(value: T) -> BridgeResult<Value> {
    serde_json::to_value(value).map_err(BridgeError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{INVALID_PARAMS, METHOD_NOT_FOUND};
    use tsmcp_tailscale::testing::MockDaemon;
    use tsmcp_tailscale::{
        ApiConfig, ControlPlaneClient, Credentials, Exposure, LocalClient, TokenManager,
    };

    fn server(daemon: &MockDaemon) -> Server<MockDaemon> {
        let api = ControlPlaneClient::new(ApiConfig {
            // Nothing listens here; these tests never reach the control plane.
            base_url: "http://127.0.0.1:9".into(),
            ..ApiConfig::default()
        })
        .expect("api");
        let tokens = TokenManager::new(api, Credentials::new("id", "secret").expect("creds"));
        Server::new(ToolContext::new(
            tokens,
            LocalClient::with_transport(daemon.clone()),
            Exposure::Funnel,
            443,
        ))
    }

    async fn call(server: &Server<MockDaemon>, line: &str) -> Value {
        let response = server.handle_line(line).await.expect("response");
        serde_json::to_value(response).expect("serialize")
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = server(&MockDaemon::new());
        let resp = call(
            &server,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"0"}}}"#,
        )
        .await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(resp["result"]["serverInfo"]["name"], "tailscale-mcp");
    }

    #[tokio::test]
    async fn test_ping() {
        let server = server(&MockDaemon::new());
        let resp = call(&server, r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#).await;
        assert_eq!(resp, json!({"jsonrpc": "2.0", "id": "p", "result": {}}));
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = server(&MockDaemon::new());
        let resp = call(&server, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        let names: Vec<&str> = resp["result"]["tools"]
            .as_array()
            .expect("tools")
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(
            names,
            ["list-devices", "local-address-to-public-mapper", "local-status"]
        );
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = server(&MockDaemon::new());
        let resp = call(&server, r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#).await;
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let server = server(&MockDaemon::new());
        let resp = call(&server, r#"{"jsonrpc":"2.0","id":4,"method":"#).await;
        assert_eq!(resp["id"], Value::Null);
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let server = server(&MockDaemon::new());
        let resp = call(&server, "[1, 2]").await;
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);

        let resp = call(&server, r#"{"jsonrpc":"2.0","id":5,"method":7}"#).await;
        assert_eq!(resp["id"], 5);
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);

        let resp = call(&server, r#"{"jsonrpc":"1.0","id":6,"method":"ping"}"#).await;
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_notifications_and_responses_are_silent() {
        let daemon = MockDaemon::new();
        let server = server(&daemon);
        assert!(
            server
                .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .await
                .is_none()
        );
        let silent_call =
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"local-status"}}"#;
        assert!(server.handle_line(silent_call).await.is_none());
        assert!(server.handle_line(r#"{"jsonrpc":"2.0","id":9,"result":{}}"#).await.is_none());
        assert!(server.handle_line("   ").await.is_none());
        assert!(daemon.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let server = server(&MockDaemon::new());
        let resp = call(
            &server,
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"rm-rf"}}"#,
        )
        .await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert!(resp["error"]["message"].as_str().expect("message").contains("rm-rf"));
    }

    #[tokio::test]
    async fn test_mapper_argument_errors() {
        let daemon = MockDaemon::new();
        let server = server(&daemon);
        for args in [
            r#"{"active":"yes","PORT":"3000"}"#,
            r#"{"PORT":"3000"}"#,
            r#"{"active":true}"#,
            r#"{"active":true,"PORT":3000}"#,
            r#"{"active":true,"PORT":"99999"}"#,
        ] {
            let line = format!(
                r#"{{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{{"name":"local-address-to-public-mapper","arguments":{args}}}}}"#
            );
            let resp = call(&server, &line).await;
            assert_eq!(resp["error"]["code"], INVALID_PARAMS, "arguments {args}");
        }
        assert!(daemon.requests().is_empty());
    }

    #[tokio::test]
    async fn test_daemon_failure_is_tool_error() {
        let server = server(&MockDaemon::new().fail_with(503));
        let resp = call(
            &server,
            r#"{"jsonrpc":"2.0","id":10,"method":"tools/call","params":{"name":"local-status","arguments":{}}}"#,
        )
        .await;
        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().expect("text");
        assert!(text.contains("503"), "{text}");
    }

    #[tokio::test]
    async fn test_serve_writes_one_line_per_response() {
        let server = server(&MockDaemon::new());
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();
        server
            .serve(input.as_bytes(), &mut output)
            .await
            .expect("serve");

        let output = String::from_utf8(output).expect("utf8");
        let lines: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8() {
        let server = server(&MockDaemon::new());
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        // Final line has no trailing newline.
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);

        let mut output = Vec::new();
        server
            .serve(input.as_slice(), &mut output)
            .await
            .expect("serve");

        let output = String::from_utf8(output).expect("utf8");
        let lines: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["result"], json!({}));
        assert_eq!(lines[1]["id"], Value::Null);
        assert_eq!(lines[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(lines[2]["id"], 2);
        assert_eq!(lines[2]["result"], json!({}));
    }
}
