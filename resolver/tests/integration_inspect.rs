mod utils;

use anyhow::Result;
use flotilla_resolver::{IntegrationError, Integrations, Resolver, Topology};
use utils::{INSTALLER_NAMESPACE, PREFIX, chart, collection, empty_config};

fn resolve(charts: Vec<flotilla_chart_fs::Chart>) -> Topology {
    let cfg = empty_config();
    let collection = collection(charts);
    Resolver::new(&cfg, &collection, INSTALLER_NAMESPACE)
        .resolve()
        .unwrap()
}

#[test]
fn provider_in_topology_satisfies_consumer() -> Result<()> {
    // Chart p provides acs, chart q requires it and depends on p. Nothing
    // is configured in the cluster.
    let topology = resolve(vec![
        chart("p", &[("integrations-provided", "acs")]),
        chart(
            "q",
            &[("depends-on", "p"), ("integrations-required", "acs")],
        ),
    ]);

    let mut integrations = Integrations::new(["acs"], Vec::<String>::new());
    integrations.inspect(&topology, PREFIX)?;
    assert!(integrations.is_configured("acs"));
    Ok(())
}

#[test]
fn provider_later_in_topology_still_satisfies_consumer() -> Result<()> {
    // The consumer sits earlier in the topology than the provider; the
    // two-pass walk still accepts the requirement.
    let topology = resolve(vec![
        chart("a-consumer", &[("integrations-required", "acs")]),
        chart("z-provider", &[("integrations-provided", "acs")]),
    ]);
    assert!(topology.position("a-consumer") < topology.position("z-provider"));

    let mut integrations = Integrations::new(["acs"], Vec::<String>::new());
    integrations.inspect(&topology, PREFIX)?;
    Ok(())
}

#[test]
fn absent_provider_fails_with_the_missing_set() {
    let topology = resolve(vec![chart("q", &[("integrations-required", "acs")])]);

    let mut integrations = Integrations::new(["acs"], Vec::<String>::new());
    let err = integrations.inspect(&topology, PREFIX).unwrap_err();
    match err {
        IntegrationError::PrerequisiteIntegration {
            chart,
            missing,
            ..
        } => {
            assert_eq!(chart, "q");
            assert_eq!(missing, vec!["acs"]);
        }
        other => panic!("expected PrerequisiteIntegration, got {other:?}"),
    }
}

#[test]
fn boolean_combination_over_cluster_state() -> Result<()> {
    let charts = || {
        vec![chart(
            "r",
            &[("integrations-required", "(github || gitlab) && quay")],
        )]
    };
    let known = ["github", "gitlab", "quay"];

    // gitlab and quay configured: satisfied.
    let topology = resolve(charts());
    let mut integrations = Integrations::new(known, ["gitlab", "quay"]);
    integrations.inspect(&topology, PREFIX)?;

    // Only quay configured: both identifiers of the false alternation are
    // reported missing.
    let topology = resolve(charts());
    let mut integrations = Integrations::new(known, ["quay"]);
    let err = integrations.inspect(&topology, PREFIX).unwrap_err();
    match err {
        IntegrationError::PrerequisiteIntegration { missing, .. } => {
            assert_eq!(missing, vec!["github", "gitlab"]);
        }
        other => panic!("expected PrerequisiteIntegration, got {other:?}"),
    }
    Ok(())
}

#[test]
fn unknown_provided_integration_is_rejected() {
    let topology = resolve(vec![chart(
        "p",
        &[("integrations-provided", "bogus"), ("product-name", "P")],
    )]);

    let mut integrations = Integrations::new(["acs"], Vec::<String>::new());
    let err = integrations.inspect(&topology, PREFIX).unwrap_err();
    match err {
        IntegrationError::UnknownIntegration {
            name,
            chart,
            product,
        } => {
            assert_eq!(name, "bogus");
            assert_eq!(chart, "p");
            assert_eq!(product, "P");
        }
        other => panic!("expected UnknownIntegration, got {other:?}"),
    }
}

#[test]
fn invalid_expression_is_rejected() {
    let topology = resolve(vec![chart("r", &[("integrations-required", "acs &&")])]);

    let mut integrations = Integrations::new(["acs"], ["acs"]);
    let err = integrations.inspect(&topology, PREFIX).unwrap_err();
    assert!(matches!(
        err,
        IntegrationError::InvalidExpression { ref chart, .. } if chart == "r"
    ));
}

#[test]
fn provision_collection_is_idempotent() -> Result<()> {
    let topology = resolve(vec![
        chart("p", &[("integrations-provided", "acs")]),
        chart("q", &[("integrations-required", "acs")]),
    ]);

    let mut integrations = Integrations::new(["acs", "quay"], Vec::<String>::new());
    integrations.inspect(&topology, PREFIX)?;
    let after_first = integrations.configured().clone();
    integrations.inspect(&topology, PREFIX)?;
    assert_eq!(integrations.configured(), &after_first);
    Ok(())
}
