use anyhow::Result;
use clap::Parser;
use flotilla_installer::app::App;
use flotilla_installer::cli::{Cli, Command};
use flotilla_installer::commands;
use flotilla_installer::context::AppContext;
use flotilla_installer::telemetry;

static INSTALLER_TARBALL: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/installer.tar.gz"));

const MCP_IMAGE: &str = "quay.io/flotilla/flotilla";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.globals.log_level, cli.globals.debug)?;
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed installing default crypto provider");

    let ctx = AppContext::builder("flotilla")
        .annotation_prefix("flotilla.dev")
        .short_description("Compose Helm charts into one ordered deployment")
        .long_description(
            "Flotilla composes many Helm charts into a single ordered \
             deployment: configuration lives in-cluster, integration \
             prerequisites are enforced before anything installs, and the \
             deployment itself can be delegated to an in-cluster job \
             through the MCP server.",
        )
        .mcp_image(&format!(
            "{MCP_IMAGE}:{}",
            flotilla_installer::context::COMMIT
        ))
        .build();
    let timeout = cli.globals.timeout;
    let app = App::new(ctx, INSTALLER_TARBALL, cli.globals.clone())?;

    match cli.command {
        Command::Config(args) => commands::config::run(&app, &args).await,
        Command::Deploy { chart } => {
            tokio::time::timeout(timeout, commands::deploy::run(&app, chart.as_deref())).await?
        }
        Command::Topology => commands::topology::run(&app).await,
        Command::Integration { integration } => {
            commands::integration::run(&app, &integration).await
        }
        Command::McpServer { image } => commands::mcp::run(app, image).await,
        Command::Template {
            chart,
            show_values,
            show_manifests,
            namespace,
        } => {
            commands::template::run(
                &app,
                &chart,
                show_values,
                show_manifests,
                namespace.as_deref(),
            )
            .await
        }
        Command::Installer { list, extract } => {
            commands::installer::run(&app, list, extract.as_deref())
        }
    }
}
