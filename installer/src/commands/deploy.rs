use anyhow::Result;
use tracing::info;

use crate::app::App;
use crate::deploy::Orchestrator;
use crate::template::render_values;

/// Deploys the whole topology, or a single chart out of it.
pub async fn run(app: &App, chart: Option<&str>) -> Result<()> {
    let client = app.kube_client().await?;
    let config = app.load_config(&client).await?;
    let collection = app.collection()?;
    let topology = app.resolve_topology(&config, &collection)?;

    let mut integrations = app.integrations_state(&client).await?;
    integrations.inspect(&topology, &app.ctx.annotation_prefix)?;

    let values = render_values(&app.ctx, &app.fs, &config, Some(client.clone())).await?;
    let orchestrator = Orchestrator::new(
        &app.ctx,
        client,
        app.globals.kube_config.clone(),
        app.globals.dry_run,
        app.globals.timeout,
    );
    match chart {
        Some(chart) => orchestrator.run_single(&topology, chart, &values).await?,
        None => orchestrator.run(&topology, &values).await?,
    }
    info!("deployment finished");
    Ok(())
}
