mod utils;

use anyhow::Result;
use flotilla_chart_fs::{ChartCollection, ChartFs, CollectionError, EmbeddedTarball};
use utils::{populate_local, tarball};

const PREFIX: &str = "flotilla.dev";

fn chart_yaml(name: &str, annotations: &[(&str, &str)]) -> String {
    let mut out = format!("apiVersion: v2\nname: {name}\nversion: 0.1.0\n");
    if !annotations.is_empty() {
        out.push_str("annotations:\n");
        for (key, value) in annotations {
            out.push_str(&format!("  {PREFIX}/{key}: \"{value}\"\n"));
        }
    }
    out
}

#[test]
fn walk_is_alphabetical_across_layers() -> Result<()> {
    let embedded = tarball(&[
        (
            "charts/zeta/Chart.yaml",
            &chart_yaml("zeta", &[("depends-on", "alpha")]),
        ),
        ("charts/alpha/Chart.yaml", &chart_yaml("alpha", &[])),
    ]);
    let local = tempfile::tempdir()?;
    populate_local(
        local.path(),
        &[("charts/mid/Chart.yaml", &chart_yaml("mid", &[]))],
    );

    let fs = ChartFs::new(EmbeddedTarball::from_bytes(embedded), local.path());
    let collection = ChartCollection::load(&fs, PREFIX)?;

    let names: Vec<&str> = collection.walk().map(|c| c.name()).collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    assert_eq!(
        collection.get("zeta").unwrap().depends_on(PREFIX),
        vec!["alpha"]
    );
    Ok(())
}

#[test]
fn product_index_is_unique() -> Result<()> {
    let embedded = tarball(&[
        (
            "charts/one/Chart.yaml",
            &chart_yaml("one", &[("product-name", "Widget")]),
        ),
        (
            "charts/two/Chart.yaml",
            &chart_yaml("two", &[("product-name", "Widget")]),
        ),
    ]);
    let local = tempfile::tempdir()?;

    let fs = ChartFs::new(EmbeddedTarball::from_bytes(embedded), local.path());
    let err = ChartCollection::load(&fs, PREFIX).unwrap_err();
    assert!(matches!(
        err,
        CollectionError::DuplicateProductChart { ref product, .. } if product == "Widget"
    ));
    Ok(())
}

#[test]
fn product_lookup_and_integration_provider() -> Result<()> {
    let embedded = tarball(&[
        (
            "charts/widget/Chart.yaml",
            &chart_yaml(
                "widget",
                &[("product-name", "Widget"), ("integrations-provided", "acs")],
            ),
        ),
        ("charts/base/Chart.yaml", &chart_yaml("base", &[])),
    ]);
    let local = tempfile::tempdir()?;

    let fs = ChartFs::new(EmbeddedTarball::from_bytes(embedded), local.path());
    let collection = ChartCollection::load(&fs, PREFIX)?;

    assert_eq!(collection.product_chart("Widget").unwrap().name(), "widget");
    assert_eq!(
        collection.product_providing_integration("acs"),
        Some("Widget")
    );
    assert_eq!(collection.product_providing_integration("quay"), None);
    Ok(())
}

#[test]
fn chart_files_include_hooks_and_scripts() -> Result<()> {
    let embedded = tarball(&[
        ("charts/app/Chart.yaml", &chart_yaml("app", &[])),
        ("charts/app/hooks/pre-deploy.sh", "#!/bin/bash\necho pre\n"),
        ("charts/app/scripts/seed.sql", "select 1;\n"),
        ("charts/app/templates/cm.yaml", "kind: ConfigMap\n"),
    ]);
    let local = tempfile::tempdir()?;

    let fs = ChartFs::new(EmbeddedTarball::from_bytes(embedded), local.path());
    let collection = ChartCollection::load(&fs, PREFIX)?;
    let chart = collection.get("app").unwrap();

    assert!(chart.pre_deploy_hook().is_some());
    assert!(chart.post_deploy_hook().is_none());
    assert!(chart.file("scripts/seed.sql").is_some());
    assert!(chart.file("templates/cm.yaml").is_some());
    Ok(())
}
