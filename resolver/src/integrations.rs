use std::collections::BTreeMap;

use tracing::debug;

use crate::error::IntegrationError;
use crate::expr::Expr;
use crate::topology::Topology;

/// Inspects the integrations provided and required by each chart in the
/// topology.
///
/// The state is a mapping from integration name to "configured". It is
/// seeded from two sources: every known integration name (initially
/// `false`) and every integration Secret observed in-cluster (`true`).
/// Inspection then runs in two passes so validation is independent of
/// topology position: provisions are collected first, requirements are
/// evaluated second against the complete state.
#[derive(Debug, Clone)]
pub struct Integrations {
    configured: BTreeMap<String, bool>,
}

impl Integrations {
    pub fn new<K, C>(known: K, cluster_configured: C) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let mut configured: BTreeMap<String, bool> = cluster_configured
            .into_iter()
            .map(|name| (name.into(), true))
            .collect();
        for name in known {
            configured.entry(name.into()).or_insert(false);
        }
        Self { configured }
    }

    pub fn is_configured(&self, name: &str) -> bool {
        self.configured.get(name).copied().unwrap_or(false)
    }

    pub fn configured(&self) -> &BTreeMap<String, bool> {
        &self.configured
    }

    /// Walks the topology twice: pass 1 collects provisions, pass 2
    /// evaluates requirements. Pass 1 only performs false-to-true
    /// transitions, so running inspect twice leaves the state unchanged.
    pub fn inspect(&mut self, topology: &Topology, prefix: &str) -> Result<(), IntegrationError> {
        self.collect_provisions(topology, prefix)?;
        self.evaluate_requirements(topology, prefix)
    }

    fn collect_provisions(
        &mut self,
        topology: &Topology,
        prefix: &str,
    ) -> Result<(), IntegrationError> {
        for dep in topology {
            let chart = dep.chart();
            for provided in chart.integrations_provided(prefix) {
                match self.configured.get_mut(provided) {
                    None => {
                        return Err(IntegrationError::UnknownIntegration {
                            name: provided.to_owned(),
                            chart: chart.name().to_owned(),
                            product: chart.product_name(prefix).unwrap_or_default().to_owned(),
                        });
                    }
                    Some(state) if *state => (),
                    Some(state) => {
                        debug!(integration = provided, chart = chart.name(), "provided");
                        *state = true;
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate_requirements(
        &self,
        topology: &Topology,
        prefix: &str,
    ) -> Result<(), IntegrationError> {
        for dep in topology {
            let chart = dep.chart();
            let Some(required) = chart.integrations_required(prefix) else {
                continue;
            };
            let expr =
                Expr::parse(required).map_err(|cause| IntegrationError::InvalidExpression {
                    chart: chart.name().to_owned(),
                    expr: required.to_owned(),
                    cause,
                })?;
            if expr.eval(&|name| self.is_configured(name)) {
                continue;
            }
            let missing = expr
                .identifiers()
                .into_iter()
                .filter(|name| !self.is_configured(name))
                .map(str::to_owned)
                .collect();
            return Err(IntegrationError::PrerequisiteIntegration {
                chart: chart.name().to_owned(),
                expr: required.to_owned(),
                missing,
            });
        }
        Ok(())
    }
}
