mod jsonrpc;
mod phase;
mod tools;

pub use jsonrpc::*;
pub use phase::*;

use anyhow::Result;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::app::App;
use crate::context;
use crate::errors::InstallerError;

/// The MCP server: JSON-RPC 2.0 over STDIO with newline-delimited
/// framing. Requests are handled one at a time and responses are written
/// in request order, so tool calls on one connection serialize naturally.
pub struct McpServer {
    pub(crate) app: App,
    pub(crate) image: String,
}

impl McpServer {
    /// The deployment job image must be known at server start; without it
    /// the deploy tool could never operate.
    pub fn new(app: App, image_override: Option<String>) -> Result<Self> {
        let image = image_override
            .or_else(|| app.ctx.mcp_image.clone())
            .ok_or(InstallerError::ImageNotConfigured)?;
        Ok(Self { app, image })
    }

    pub async fn run(&self) -> Result<()> {
        info!(app = %self.app.ctx.name, "MCP server listening on stdio");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let mut payload = serde_json::to_vec(&response)?;
            payload.push(b'\n');
            stdout.write_all(&payload).await?;
            stdout.flush().await?;
        }
        info!("stdin closed, MCP server exiting");
        Ok(())
    }

    async fn handle_line(&self, line: &str) -> Option<Response> {
        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                return Some(Response::error(
                    serde_json::Value::Null,
                    PARSE_ERROR,
                    format!("invalid JSON-RPC request: {err}"),
                ));
            }
        };
        debug!(method = %request.method, "request");

        let id = request.id.clone()?;
        Some(match request.method.as_str() {
            "initialize" => Response::result(id, self.initialize_result()),
            "tools/list" => Response::result(id, json!({ "tools": tools::catalog(&self.app.ctx) })),
            "tools/call" => self.tools_call(id, &request.params).await,
            other => Response::error(
                id,
                METHOD_NOT_FOUND,
                format!("method {other} is not supported"),
            ),
        })
    }

    fn initialize_result(&self) -> serde_json::Value {
        let mut result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": self.app.ctx.name,
                "version": context::VERSION,
            },
        });
        if let Ok(instructions) = self.app.fs.read_to_string("instructions.md") {
            result["instructions"] = serde_json::Value::String(instructions);
        }
        result
    }

    async fn tools_call(&self, id: serde_json::Value, params: &serde_json::Value) -> Response {
        let Some(name) = params.get("name").and_then(serde_json::Value::as_str) else {
            return Response::error(
                id,
                INVALID_PARAMS,
                "tools/call requires a tool name".to_owned(),
            );
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        match self.call_tool(name, &arguments).await {
            Ok(text) => Response::result(id, call_tool_result(text, false)),
            Err(err) => Response::result(id, call_tool_result(format!("{err:#}"), true)),
        }
    }
}
