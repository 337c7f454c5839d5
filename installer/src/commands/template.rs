use anyhow::{Context, Result};

use crate::app::App;
use crate::deploy::{Helm, materialize_chart};
use crate::template::render_values;

/// Renders the global values and, optionally, a chart's manifests for
/// inspection. Nothing is installed.
pub async fn run(
    app: &App,
    chart_name: &str,
    show_values: bool,
    show_manifests: bool,
    namespace: Option<&str>,
) -> Result<()> {
    let client = app.kube_client().await.ok();
    let config = match &client {
        Some(client) => app.load_config(client).await?,
        None => app.default_config()?,
    };
    let collection = app.collection()?;
    let topology = app.resolve_topology(&config, &collection)?;
    let dependency = topology
        .get(chart_name)
        .with_context(|| format!("chart {chart_name} is not part of the topology"))?;

    let values = render_values(&app.ctx, &app.fs, &config, client).await?;
    if show_values {
        print!("{}", serde_yaml::to_string(&values)?);
    }

    if show_manifests {
        let namespace = namespace.unwrap_or(dependency.namespace());
        let chart_dir = materialize_chart(dependency.chart())?;
        let values_dir = tempfile::tempdir()?;
        let values_file = values_dir.path().join("values.yaml");
        std::fs::write(&values_file, serde_yaml::to_string(&values)?)?;

        let helm = Helm::new(app.globals.kube_config.clone(), true);
        let manifests = helm
            .template(chart_dir.path(), chart_name, namespace, &values_file)
            .await?;
        print!("{manifests}");
    }
    Ok(())
}
