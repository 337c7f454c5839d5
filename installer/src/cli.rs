use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::context;

/// Global flags shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Verbose logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Skip hooks, tests and readiness checks; run helm in server-side
    /// dry-run
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Path to the kubeconfig file
    #[arg(long, global = true, env = "KUBECONFIG")]
    pub kube_config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Global deadline in seconds for all cluster operations
    #[arg(long, global = true, default_value = "900", value_parser = parse_seconds)]
    pub timeout: Duration,
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|err| format!("invalid timeout {raw:?}: {err}"))
}

#[derive(Debug, Parser)]
#[command(version = context::VERSION)]
pub struct Cli {
    #[command(flatten)]
    pub globals: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the installer configuration stored in-cluster
    Config(ConfigArgs),

    /// Deploy all charts in topology order, or a single chart
    Deploy {
        /// Deploy only this chart
        chart: Option<String>,
    },

    /// Print the resolved deployment topology
    Topology,

    /// Configure an external service integration
    Integration {
        #[command(subcommand)]
        integration: IntegrationCommand,
    },

    /// Start the MCP server on stdin/stdout
    McpServer {
        /// Container image for the delegated deployment job
        #[arg(long)]
        image: Option<String>,
    },

    /// Render a chart for inspection without installing anything
    Template {
        chart: String,

        /// Print the rendered global values
        #[arg(long)]
        show_values: bool,

        /// Print the rendered chart manifests
        #[arg(long)]
        show_manifests: bool,

        /// Override the target namespace
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Inspect or extract the embedded installer tarball
    Installer {
        /// List embedded file paths
        #[arg(long, conflicts_with = "extract")]
        list: bool,

        /// Extract the embedded tree into a directory
        #[arg(long, value_name = "DIR")]
        extract: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Create the configuration ConfigMap
    #[arg(long, conflicts_with_all = ["get", "delete"])]
    pub create: bool,

    /// Print the current configuration
    #[arg(long, conflicts_with = "delete")]
    pub get: bool,

    /// Remove the configuration ConfigMap
    #[arg(long)]
    pub delete: bool,

    /// Overwrite an existing configuration on create
    #[arg(long)]
    pub force: bool,

    /// Installer namespace override for validation and creation
    #[arg(long)]
    pub namespace: Option<String>,

    /// Configuration file to load instead of the embedded default
    pub path: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum IntegrationCommand {
    /// Configure a GitHub App integration
    Github(GithubArgs),

    /// Configure a GitLab integration
    Gitlab(GitlabArgs),

    /// Configure a Quay registry integration
    Quay(QuayArgs),
}

#[derive(Debug, Args)]
pub struct GithubArgs {
    /// GitHub App ID
    #[arg(long)]
    pub app_id: String,

    /// GitHub App client ID
    #[arg(long)]
    pub client_id: String,

    /// GitHub App client secret
    #[arg(long)]
    pub client_secret: String,

    /// GitHub App webhook secret
    #[arg(long)]
    pub webhook_secret: String,

    /// GitHub App private key, PEM-encoded
    #[arg(long)]
    pub private_key: String,

    /// GitHub host
    #[arg(long, default_value = "github.com")]
    pub host: String,

    /// Overwrite an existing integration secret
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct GitlabArgs {
    /// GitLab application token
    #[arg(long)]
    pub token: String,

    /// GitLab application ID
    #[arg(long)]
    pub app_id: String,

    /// GitLab application secret
    #[arg(long)]
    pub app_secret: String,

    /// GitLab host
    #[arg(long, default_value = "gitlab.com")]
    pub host: String,

    /// Overwrite an existing integration secret
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct QuayArgs {
    /// Quay API token
    #[arg(long)]
    pub token: String,

    /// Quay organization
    #[arg(long)]
    pub organization: String,

    /// Quay host
    #[arg(long, default_value = "quay.io")]
    pub host: String,

    /// Overwrite an existing integration secret
    #[arg(long)]
    pub force: bool,
}
