mod utils;

use anyhow::Result;
use flotilla_resolver::{Resolver, ResolverError, Topology};
use utils::{INSTALLER_NAMESPACE, chart, collection, config, empty_config};

fn entries(topology: &Topology) -> Vec<(String, String)> {
    topology
        .iter()
        .map(|dep| (dep.name().to_owned(), dep.namespace().to_owned()))
        .collect()
}

#[test]
fn linear_dependency_with_product_namespace() -> Result<()> {
    // Charts A, B (depends on A), C (depends on B, bound to product P).
    let charts = collection(vec![
        chart("a", &[]),
        chart("b", &[("depends-on", "a")]),
        chart("c", &[("depends-on", "b"), ("product-name", "P")]),
    ]);
    let cfg = config(
        "settings: {}\nproducts:\n- name: P\n  enabled: true\n  namespace: p-ns\n",
    );

    let topology = Resolver::new(&cfg, &charts, INSTALLER_NAMESPACE).resolve()?;
    assert_eq!(
        entries(&topology),
        vec![
            ("a".to_owned(), "sys".to_owned()),
            ("b".to_owned(), "sys".to_owned()),
            ("c".to_owned(), "p-ns".to_owned()),
        ]
    );
    Ok(())
}

#[test]
fn weight_orders_siblings_within_a_tier() -> Result<()> {
    let charts = collection(vec![
        chart("root", &[]),
        chart("x", &[("depends-on", "root"), ("weight", "100")]),
        chart("y", &[("depends-on", "root"), ("weight", "500")]),
        chart("z", &[("depends-on", "root"), ("weight", "-10")]),
    ]);
    let cfg = empty_config();

    let topology = Resolver::new(&cfg, &charts, INSTALLER_NAMESPACE).resolve()?;
    let names: Vec<&str> = topology.iter().map(|dep| dep.name()).collect();
    assert_eq!(names, vec!["root", "y", "x", "z"]);
    Ok(())
}

#[test]
fn products_resolve_in_declaration_order() -> Result<()> {
    let charts = collection(vec![
        chart("alpha", &[("product-name", "Second")]),
        chart("beta", &[("product-name", "First")]),
    ]);
    let cfg = config(
        "settings: {}\n\
         products:\n\
         - name: First\n  enabled: true\n  namespace: first\n\
         - name: Second\n  enabled: true\n  namespace: second\n",
    );

    let topology = Resolver::new(&cfg, &charts, INSTALLER_NAMESPACE).resolve()?;
    assert_eq!(
        entries(&topology),
        vec![
            ("beta".to_owned(), "first".to_owned()),
            ("alpha".to_owned(), "second".to_owned()),
        ]
    );
    Ok(())
}

#[test]
fn use_product_namespace_aliases_into_the_product() -> Result<()> {
    let charts = collection(vec![
        chart("widget", &[("product-name", "P")]),
        chart("sidecar", &[("use-product-namespace", "P")]),
    ]);
    let cfg = config(
        "settings: {}\nproducts:\n- name: P\n  enabled: true\n  namespace: p-ns\n",
    );

    let topology = Resolver::new(&cfg, &charts, INSTALLER_NAMESPACE).resolve()?;
    assert_eq!(topology.get("sidecar").unwrap().namespace(), "p-ns");
    Ok(())
}

#[test]
fn missing_dependency_names_the_referer() {
    let charts = collection(vec![chart("a", &[("depends-on", "ghost")])]);
    let cfg = empty_config();

    let err = Resolver::new(&cfg, &charts, INSTALLER_NAMESPACE)
        .resolve()
        .unwrap_err();
    assert!(matches!(
        err,
        ResolverError::ChartNotFound { ref name, ref referer } if name == "ghost" && referer == "a"
    ));
}

#[test]
fn cycles_are_reported_with_their_path() {
    let charts = collection(vec![
        chart("a", &[("depends-on", "b")]),
        chart("b", &[("depends-on", "a")]),
    ]);
    let cfg = empty_config();

    let err = Resolver::new(&cfg, &charts, INSTALLER_NAMESPACE)
        .resolve()
        .unwrap_err();
    match err {
        ResolverError::CircularDependency { path } => {
            assert_eq!(path.first(), path.last());
            assert!(path.len() >= 3);
        }
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

#[test]
fn enabled_product_without_chart_fails() {
    let charts = collection(vec![chart("a", &[])]);
    let cfg = config("settings: {}\nproducts:\n- name: Ghost\n  enabled: true\n");

    let err = Resolver::new(&cfg, &charts, INSTALLER_NAMESPACE)
        .resolve()
        .unwrap_err();
    assert!(matches!(
        err,
        ResolverError::ProductChartNotFound(name) if name == "Ghost"
    ));
}

#[test]
fn malformed_weight_names_the_value() {
    let charts = collection(vec![chart("a", &[("weight", "heavy")])]);
    let cfg = empty_config();

    let err = Resolver::new(&cfg, &charts, INSTALLER_NAMESPACE)
        .resolve()
        .unwrap_err();
    assert!(matches!(
        err,
        ResolverError::MalformedWeight { ref value, .. } if value == "heavy"
    ));
}

#[test]
fn negative_weights_are_accepted() -> Result<()> {
    let charts = collection(vec![
        chart("low", &[("weight", "-5")]),
        chart("high", &[("weight", "5")]),
    ]);
    let cfg = empty_config();

    let topology = Resolver::new(&cfg, &charts, INSTALLER_NAMESPACE).resolve()?;
    let names: Vec<&str> = topology.iter().map(|dep| dep.name()).collect();
    assert_eq!(names, vec!["high", "low"]);
    Ok(())
}

#[test]
fn resolution_is_reproducible() -> Result<()> {
    let charts = collection(vec![
        chart("a", &[]),
        chart("b", &[("depends-on", "a"), ("weight", "3")]),
        chart("c", &[("depends-on", "a"), ("weight", "3")]),
        chart("d", &[("depends-on", "c,b")]),
    ]);
    let cfg = empty_config();

    let resolver = Resolver::new(&cfg, &charts, INSTALLER_NAMESPACE);
    let first = entries(&resolver.resolve()?);
    let second = entries(&resolver.resolve()?);
    assert_eq!(first, second);

    // Every depends-on edge points to a lower index, and each chart
    // appears exactly once.
    let topology = resolver.resolve()?;
    assert_eq!(topology.len(), 4);
    assert!(topology.position("a") < topology.position("b"));
    assert!(topology.position("a") < topology.position("c"));
    assert!(topology.position("b") < topology.position("d"));
    assert!(topology.position("c") < topology.position("d"));
    Ok(())
}
