use anyhow::Result;
use flotilla_resolver::Topology;
use itertools::Itertools;

use crate::app::App;

pub async fn run(app: &App) -> Result<()> {
    let client = app.kube_client().await?;
    let config = app.load_config(&client).await?;
    let collection = app.collection()?;
    let topology = app.resolve_topology(&config, &collection)?;
    print!("{}", render_table(&topology, &app.ctx.annotation_prefix));
    Ok(())
}

/// Renders the topology as an aligned table of index, chart, namespace and
/// declared dependencies.
pub fn render_table(topology: &Topology, prefix: &str) -> String {
    let header = (
        "#".to_owned(),
        "CHART".to_owned(),
        "NAMESPACE".to_owned(),
        "DEPENDS-ON".to_owned(),
    );
    let rows: Vec<(String, String, String, String)> = std::iter::once(header)
        .chain(topology.iter().enumerate().map(|(index, dep)| {
            (
                index.to_string(),
                dep.name().to_owned(),
                dep.namespace().to_owned(),
                dep.chart().depends_on(prefix).iter().join(", "),
            )
        }))
        .collect();

    let width = |pick: fn(&(String, String, String, String)) -> &String| {
        rows.iter().map(|row| pick(row).len()).max().unwrap_or(0)
    };
    let (w0, w1, w2) = (width(|r| &r.0), width(|r| &r.1), width(|r| &r.2));

    let mut out = String::new();
    for (index, chart, namespace, depends_on) in &rows {
        out.push_str(&format!(
            "{index:<w0$}  {chart:<w1$}  {namespace:<w2$}  {depends_on}\n"
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use flotilla_chart_fs::{Chart, ChartManifest};
    use flotilla_resolver::Dependency;

    use super::*;

    #[test]
    fn table_lists_charts_in_topology_order() {
        let mut topology = Topology::new();
        for (name, namespace) in [("foundation", "sys"), ("registry", "registry")] {
            let manifest = ChartManifest {
                name: name.to_owned(),
                version: None,
                description: None,
                annotations: BTreeMap::new(),
            };
            let chart = Arc::new(Chart::new(
                manifest,
                format!("charts/{name}"),
                BTreeMap::new(),
            ));
            topology.append(Dependency::new(chart, namespace.to_owned()));
        }

        let table = render_table(&topology, "flotilla.dev");
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("#"));
        assert!(lines[1].contains("foundation"));
        assert!(lines[2].contains("registry"));
    }
}
