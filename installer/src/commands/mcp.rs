use anyhow::Result;
use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tracing::warn;

use crate::app::App;
use crate::mcp::McpServer;

/// Runs the MCP server until stdin closes or a termination signal
/// arrives.
pub async fn run(app: App, image: Option<String>) -> Result<()> {
    let server = McpServer::new(app, image)?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    select! {
        result = server.run() => result,
        _ = sigterm.recv() => {
            warn!("SIGTERM received, exiting");
            Ok(())
        }
        _ = sigint.recv() => {
            warn!("SIGINT received, exiting");
            Ok(())
        }
    }
}
